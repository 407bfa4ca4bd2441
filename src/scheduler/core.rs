//! # Scheduler: the single place notification actions queue and execute.
//!
//! The [`Scheduler`] owns the priority queue, the adaptive
//! [`BatchController`], and the once-per-cycle drain entry point. Writers on
//! any thread hand it actions; one designated drain context delivers them.
//!
//! ## High-level architecture
//! ```text
//! Producers (any thread):                Drain context (one, serial):
//!   Observable A ──┐
//!   Observable B ──┼─ enqueue(action) ─► [Mutex<PriorityQueue>]
//!   raw actions  ──┘        │                      │
//!                           │                      ▼  once per host cycle
//!                           │               drain_once():
//!                           │                 1. budget = BatchController.next(backlog)
//!                           │                 2. pop ≤ budget actions (lock held)
//!                           │                 3. invoke each, lock released,
//!                           │                    panics caught + logged
//!                           ▼
//!                 Err(Closed) after shutdown()
//!
//! Host low-memory signal ──► on_memory_pressure():
//!                              batch budget halved (floored) + reclaim hook
//! ```
//!
//! ## Rules
//! - **Enqueue never blocks on drain**: the queue lock is held only for the
//!   push or for the batch pop, never across action invocation.
//! - **Panic isolation**: a panicking action is logged and does not abort
//!   the rest of the batch.
//! - **Serial drains**: the host calls `drain_once` from one designated
//!   context, never concurrently with itself. A violating call is detected,
//!   logged, and returns 0 instead of corrupting the cycle.
//! - **Explicit teardown**: `shutdown()` clears the queue; later enqueues
//!   fail with [`SchedulerError::Closed`] rather than silently dropping.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SchedulerError;
use crate::queue::{Action, PriorityQueue};

use super::batch::BatchController;
use super::builder::SchedulerBuilder;
use super::config::Config;

/// Priority assigned to ordinary value-change notifications.
pub const PRIORITY_NORMAL: i32 = 0;

/// Priority assigned to urgent (`set_urgent`) notifications.
///
/// Higher keys drain first, so an urgent action enqueued after a normal one
/// in the same cycle is still delivered before it. That preemption is
/// intentional.
pub const PRIORITY_URGENT: i32 = 100;

/// Host callback invoked when a memory-pressure signal arrives.
pub type ReclaimHook = Box<dyn Fn() + Send + Sync + 'static>;

/// Lifetime counters plus live queue readings.
///
/// Counters are monotonic over the scheduler's lifetime; `backlog` and
/// `batch_size` are point-in-time readings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Actions accepted by `enqueue` (rejected actions are not counted).
    pub enqueued: u64,
    /// Actions invoked by drain cycles, including ones that panicked.
    pub delivered: u64,
    /// Actions that panicked during delivery.
    pub panicked: u64,
    /// Actions currently queued and not yet delivered.
    pub backlog: usize,
    /// Current per-cycle delivery budget.
    pub batch_size: usize,
}

/// Central notification scheduler.
///
/// Constructed explicitly via [`Scheduler::builder`] and shared as an
/// `Arc`; every [`Observable`](crate::Observable) holds a clone. There is
/// deliberately no process-global instance — the host application context
/// owns the scheduler and its lifecycle.
pub struct Scheduler {
    queue: Mutex<PriorityQueue>,
    batch: Mutex<BatchController>,
    draining: AtomicBool,
    closed: AtomicBool,
    reclaim: Option<ReclaimHook>,

    enqueued: AtomicU64,
    delivered: AtomicU64,
    panicked: AtomicU64,
}

impl Scheduler {
    /// Starts building a scheduler with the given configuration.
    pub fn builder(cfg: Config) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Creates a scheduler with default configuration and no hooks.
    pub fn with_defaults() -> Arc<Self> {
        Self::builder(Config::default()).build()
    }

    pub(super) fn new_internal(cfg: Config, reclaim: Option<ReclaimHook>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(PriorityQueue::new()),
            batch: Mutex::new(BatchController::new(&cfg)),
            draining: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            reclaim,
            enqueued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
        })
    }

    /// Queues an action at [`PRIORITY_NORMAL`].
    ///
    /// Thread-safe from any calling thread; never blocks on an in-flight
    /// drain beyond the brief queue push.
    pub fn enqueue<F>(&self, action: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_with(PRIORITY_NORMAL, action)
    }

    /// Queues an action at an explicit priority.
    ///
    /// Higher priorities drain first; FIFO within a priority. Fails with
    /// [`SchedulerError::Closed`] after [`Scheduler::shutdown`].
    pub fn enqueue_with<F>(&self, priority: i32, action: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(SchedulerError::Closed);
        }
        self.queue.lock().push(priority, Box::new(action));
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Delivers up to one batch of pending actions; returns how many ran.
    ///
    /// Intended to be invoked exactly once per host cycle from the single
    /// designated drain context. No-op on an empty queue.
    ///
    /// ### Per cycle
    /// 1. Recompute the delivery budget from the current backlog.
    /// 2. Pop up to that many actions in priority order (queue lock held).
    /// 3. Invoke them with the lock released; a panicking action is caught,
    ///    logged, and does not abort the remainder of the batch.
    ///
    /// ### Notes
    /// - Actions may call `enqueue` (directly or through `Observable::set`)
    ///   without deadlocking; their notifications land in a later cycle.
    /// - Actions must not call `drain_once` reentrantly. That is a caller
    ///   obligation; a violating call is logged and returns 0.
    pub fn drain_once(&self) -> usize {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("drain_once called while a drain is in flight; skipping");
            return 0;
        }

        let batch = self.take_batch();
        let mut ran = 0;
        for action in batch {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(action)) {
                self.panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    panic = %panic_message(&panic),
                    "notification action panicked during drain; continuing batch"
                );
            }
            ran += 1;
        }
        self.delivered.fetch_add(ran as u64, Ordering::Relaxed);

        self.draining.store(false, Ordering::Release);
        ran
    }

    /// Pops the current cycle's batch out of the queue.
    fn take_batch(&self) -> Vec<Action> {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            return Vec::new();
        }

        let budget = self.batch.lock().next(queue.len());
        let take = budget.min(queue.len());
        let mut batch = Vec::with_capacity(take);
        for _ in 0..take {
            match queue.pop_highest() {
                Ok(action) => batch.push(action),
                // len() bounds the loop, so the queue cannot run dry here.
                Err(_) => break,
            }
        }
        batch
    }

    /// Responds to a low-memory signal from the host environment.
    ///
    /// Halves the per-cycle delivery budget (floored at
    /// [`Config::pressure_floor`]) and invokes the reclaim hook if one was
    /// registered. A degradation lever, not a correctness mechanism:
    /// delivery slows down, nothing is lost.
    pub fn on_memory_pressure(&self) {
        let new_budget = self.batch.lock().on_pressure();
        tracing::warn!(batch_size = new_budget, "memory pressure: batch budget halved");
        if let Some(hook) = &self.reclaim {
            hook();
        }
    }

    /// Shuts the scheduler down: clears the queue and closes the intake.
    ///
    /// Idempotent. Pending undelivered actions are dropped (the process is
    /// tearing down); subsequent `enqueue` calls fail with
    /// [`SchedulerError::Closed`] rather than silently vanishing.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = {
            let mut queue = self.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            tracing::debug!(dropped, "scheduler shut down with undelivered actions");
        }
    }

    /// Returns `true` once [`Scheduler::shutdown`] has run.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of actions currently queued and not yet delivered.
    pub fn backlog(&self) -> usize {
        self.queue.lock().len()
    }

    /// The current per-cycle delivery budget.
    pub fn batch_size(&self) -> usize {
        self.batch.lock().current()
    }

    /// Lifetime counters plus live readings, for host dashboards and tests.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            backlog: self.backlog(),
            batch_size: self.batch_size(),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("backlog", &self.backlog())
            .field("batch_size", &self.batch_size())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
