//! # Tick driver: a host loop for standalone use.
//!
//! [`TickDriver`] runs the scheduler's drain cycle at a fixed period from a
//! single spawned task, for hosts that do not already have a per-frame
//! update to hook `drain_once` into. Embedding hosts (game loops, UI
//! frameworks) should keep calling [`Scheduler::drain_once`] from their own
//! designated thread and skip this type entirely.
//!
//! ## Architecture
//! ```text
//! TickDriver::spawn()
//!     └─► tokio task (the designated drain context)
//!           loop {
//!               select! {
//!                   token.cancelled() ─► final drain, exit
//!                   interval.tick()   ─► scheduler.drain_once()
//!               }
//!           }
//! ```
//!
//! ## Rules
//! - The spawned task is the **only** place `drain_once` runs; do not call
//!   it elsewhere while a driver is active.
//! - Missed ticks are delayed, not bursted: a long batch pushes the next
//!   tick out instead of queueing catch-up ticks.
//! - Cancellation performs one final drain so notifications already queued
//!   at shutdown are delivered, then the task exits.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use tickbus::{Observable, Scheduler, TickDriver};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let scheduler = Scheduler::with_defaults();
//!     let driver = TickDriver::new(&scheduler, Duration::from_millis(16));
//!     let token = driver.cancellation_token();
//!     let handle = driver.spawn();
//!
//!     let score = Observable::new(&scheduler, 0u32);
//!     score.set(10); // delivered on one of the next ticks
//!
//!     token.cancel();
//!     handle.await.unwrap();
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::scheduler::Scheduler;

/// Periodic drain loop for a [`Scheduler`].
pub struct TickDriver {
    scheduler: Arc<Scheduler>,
    period: Duration,
    token: CancellationToken,
}

impl TickDriver {
    /// Creates a driver ticking every `period`.
    ///
    /// The period is clamped to a minimum of 1ms — a zero interval would
    /// starve the runtime.
    pub fn new(scheduler: &Arc<Scheduler>, period: Duration) -> Self {
        Self {
            scheduler: Arc::clone(scheduler),
            period: period.max(Duration::from_millis(1)),
            token: CancellationToken::new(),
        }
    }

    /// Token that stops the driver when cancelled.
    ///
    /// Clone it into whatever owns shutdown; cancelling is idempotent.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns the drain loop onto the current tokio runtime.
    ///
    /// The returned handle resolves after cancellation, once the final
    /// drain has run.
    pub fn spawn(self) -> JoinHandle<()> {
        let Self {
            scheduler,
            period,
            token,
        } = self;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(period_ms = period.as_millis() as u64, "tick driver started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        scheduler.drain_once();
                    }
                }
            }

            // Deliver what was already queued at shutdown time.
            let remaining = scheduler.drain_once();
            tracing::debug!(remaining, "tick driver stopped");
        })
    }
}

impl std::fmt::Debug for TickDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickDriver")
            .field("period", &self.period)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{Observable, SubscriberKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_driver_delivers_and_stops_on_cancel() {
        let sched = Scheduler::with_defaults();
        let driver = TickDriver::new(&sched, Duration::from_millis(5));
        let token = driver.cancellation_token();
        let handle = driver.spawn();

        let prop = Observable::new(&sched, 0);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        prop.subscribe(SubscriberKey::next(), move |_: &i32| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        prop.set(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1, "driver drained the change");

        token.cancel();
        handle.await.expect("driver task panicked");
    }

    #[tokio::test]
    async fn test_final_drain_flushes_pending_on_cancel() {
        let sched = Scheduler::with_defaults();
        // A long period so the queued action cannot ride an ordinary tick.
        let driver = TickDriver::new(&sched, Duration::from_secs(3600));
        let token = driver.cancellation_token();
        let handle = driver.spawn();

        // Let the driver consume its immediate first tick.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        sched
            .enqueue(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .expect("open");

        token.cancel();
        handle.await.expect("driver task panicked");
        assert_eq!(hits.load(Ordering::SeqCst), 1, "final drain delivered it");
    }

    #[tokio::test]
    async fn test_zero_period_is_clamped() {
        let sched = Scheduler::with_defaults();
        let driver = TickDriver::new(&sched, Duration::ZERO);
        assert_eq!(driver.period, Duration::from_millis(1));

        let token = driver.cancellation_token();
        let handle = driver.spawn();
        token.cancel();
        handle.await.expect("driver task panicked");
    }
}
