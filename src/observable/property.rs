//! # Observable value cell with deferred, coalesced change notification.
//!
//! [`Observable<T>`] holds a value, a keyed [`SubscriberRegistry`], and an
//! ordered broadcast listener list. Writers on any thread swap the value;
//! delivery to subscribers happens later, on the drain thread, when the
//! scheduler's cycle runs.
//!
//! ## Architecture
//! ```text
//! writer thread:  set(v)
//!                   ├─ equality check ──────────► equal? no-op, nothing queued
//!                   ├─ swap value (guarded cell)
//!                   └─ pending bit clear? ──────► enqueue delivery action
//!                                                  (urgent writes enqueue at
//!                                                   PRIORITY_URGENT even when
//!                                                   one is already pending)
//!
//! drain thread:   delivery action
//!                   ├─ pending bit ──► already delivered? no-op
//!                   ├─ sample current value      (latest write wins)
//!                   ├─ registry.notify_all(&v)   (keyed subscribers)
//!                   └─ broadcast listeners, in registration order
//! ```
//!
//! ## Rules
//! - **Equality skip**: setting a value equal to the current one performs no
//!   mutation and queues nothing, for every `T`.
//! - **Coalescing**: any number of writes between two drains produces at
//!   most one delivered notification, carrying the latest value.
//! - **Deferred only**: delivery never happens synchronously inside `set`;
//!   it always waits for the next drain cycle.
//! - **Urgency is ordering, not immediacy**: an urgent write is delivered
//!   before same-cycle normal-priority peers, still never before the next
//!   drain.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::scheduler::{Scheduler, PRIORITY_NORMAL, PRIORITY_URGENT};

use super::registry::{Callback, SubscriberKey, SubscriberRegistry};

/// Shared state behind every handle to one observable value.
struct Shared<T> {
    cell: Mutex<T>,
    registry: SubscriberRegistry<T>,
    listeners: Mutex<Vec<Callback<T>>>,
    scheduler: Arc<Scheduler>,
    /// Set while a delivery action is queued and not yet run.
    notify_queued: AtomicBool,
    disposed: AtomicBool,
}

impl<T: Clone + Send + 'static> Shared<T> {
    /// Runs on the drain thread: clear the pending bit, sample the latest
    /// value, fan out.
    fn deliver(&self) {
        // A racing urgent write can queue a second action; whichever runs
        // first claims the bit, the other becomes a no-op.
        if !self.notify_queued.swap(false, Ordering::AcqRel) {
            return;
        }

        let value = self.cell.lock().clone();
        self.registry.notify_all(&value);

        let listeners: Vec<Callback<T>> = self.listeners.lock().iter().map(Arc::clone).collect();
        for listener in listeners {
            let guarded = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(&value);
            }));
            if guarded.is_err() {
                tracing::error!("broadcast listener panicked during delivery; continuing");
            }
        }
    }
}

/// A value holder that notifies subscribers through the scheduler when its
/// stored value changes.
///
/// Handles are cheap to clone and share one cell: a write through any
/// handle is visible to readers and subscribers of all of them. `T` needs
/// `Clone` (values are sampled out of the cell) and `PartialEq` (change
/// detection).
///
/// ### Equality
/// Two observables compare equal when their **held values** compare equal.
/// That is a call-site convenience only — the type deliberately implements
/// neither `Eq` nor `Hash`, so it cannot be used as a collection key.
///
/// ## Example
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use tickbus::{Observable, Scheduler, SubscriberKey};
///
/// let scheduler = Scheduler::with_defaults();
/// let health = Observable::new(&scheduler, 100u32);
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = Arc::clone(&seen);
/// health.subscribe(SubscriberKey::next(), move |v: &u32| {
///     log.lock().unwrap().push(*v);
/// });
///
/// health.set(80);
/// assert!(seen.lock().unwrap().is_empty()); // nothing until the drain
///
/// scheduler.drain_once();
/// assert_eq!(*seen.lock().unwrap(), vec![80]);
/// ```
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + PartialEq + Send + 'static> Observable<T> {
    /// Creates an observable holding `initial`, wired to `scheduler`.
    pub fn new(scheduler: &Arc<Scheduler>, initial: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                cell: Mutex::new(initial),
                registry: SubscriberRegistry::new(),
                listeners: Mutex::new(Vec::new()),
                scheduler: Arc::clone(scheduler),
                notify_queued: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Creates an observable holding `T::default()`.
    pub fn with_default(scheduler: &Arc<Scheduler>) -> Self
    where
        T: Default,
    {
        Self::new(scheduler, T::default())
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.shared.cell.lock().clone()
    }

    /// Stores `value` and queues a change notification at normal priority.
    ///
    /// No-op when `value` equals the current value.
    pub fn set(&self, value: T) {
        self.set_with(value, false);
    }

    /// Stores `value` and queues its notification at [`PRIORITY_URGENT`],
    /// ahead of same-cycle normal-priority notifications.
    ///
    /// No-op when `value` equals the current value. Urgency is an ordering
    /// hint: delivery still waits for the next drain cycle.
    pub fn set_urgent(&self, value: T) {
        self.set_with(value, true);
    }

    /// Stores `value`; `urgent` selects the notification priority.
    pub fn set_with(&self, value: T, urgent: bool) {
        {
            let mut cell = self.shared.cell.lock();
            if *cell == value {
                return;
            }
            *cell = value;
        }

        // One pending delivery is enough: it samples the cell at drain time,
        // so the latest write always wins. Urgent writes queue even when one
        // is pending to claim the earlier slot; the loser no-ops.
        let first = !self.shared.notify_queued.swap(true, Ordering::AcqRel);
        if !(first || urgent) {
            return;
        }

        let priority = if urgent { PRIORITY_URGENT } else { PRIORITY_NORMAL };
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        let enqueued = self.shared.scheduler.enqueue_with(priority, move || {
            if let Some(shared) = weak.upgrade() {
                shared.deliver();
            }
        });

        if let Err(err) = enqueued {
            self.shared.notify_queued.store(false, Ordering::Release);
            tracing::warn!(
                error = err.as_label(),
                "change notification rejected; value stored without delivery"
            );
        }
    }

    /// Registers `callback` under `key`; it receives every delivered change.
    ///
    /// Returns `true` if the key was newly inserted; re-subscribing an
    /// existing key warns and replaces the previous callback, returning
    /// `false`.
    pub fn subscribe<F>(&self, key: SubscriberKey, callback: F) -> bool
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(key, Arc::new(callback))
    }

    /// Removes the subscription under `key`.
    ///
    /// Safe to call speculatively; a missing key warns and returns `false`.
    pub fn unsubscribe(&self, key: SubscriberKey) -> bool {
        self.shared.registry.unsubscribe(key)
    }

    /// Appends a broadcast listener, invoked after keyed subscribers in
    /// registration order.
    ///
    /// ### Notes
    /// Listeners have no identity and cannot be removed individually (only
    /// [`Observable::dispose`] clears them), and every delivery walks the
    /// whole list. Prefer keyed subscriptions for anything dynamic.
    pub fn listen<F>(&self, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.shared.listeners.lock().push(Arc::new(callback));
    }

    /// Clears all keyed subscriptions and broadcast listeners.
    ///
    /// Idempotent; the value itself stays readable and writable, but nobody
    /// is left to notify.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.registry.clear();
        self.shared.listeners.lock().clear();
    }

    /// Returns `true` once [`Observable::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Number of keyed subscriptions currently registered.
    pub fn subscriber_count(&self) -> usize {
        self.shared.registry.len()
    }
}

impl<T> Clone for Observable<T> {
    /// Returns a new handle to the **same** cell, registry, and listeners.
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + PartialEq + Send + 'static> PartialEq for Observable<T> {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            return true;
        }
        // Lock order by address so two handles comparing against each other
        // from two threads cannot deadlock.
        let (first, second) = if (Arc::as_ptr(&self.shared) as usize)
            <= (Arc::as_ptr(&other.shared) as usize)
        {
            (&self.shared, &other.shared)
        } else {
            (&other.shared, &self.shared)
        };
        let a = first.cell.lock();
        let b = second.cell.lock();
        *a == *b
    }
}

impl<T: Clone + PartialEq + Send + fmt::Debug + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.get())
            .field("subscribers", &self.subscriber_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Config;
    use std::sync::atomic::AtomicUsize;

    fn recording(log: &Arc<Mutex<Vec<i32>>>) -> impl Fn(&i32) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |v: &i32| log.lock().push(*v)
    }

    #[test]
    fn test_end_to_end_set_then_drain() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 100);
        let log = Arc::new(Mutex::new(Vec::new()));
        prop.subscribe(SubscriberKey::next(), recording(&log));

        prop.set(80);
        assert!(log.lock().is_empty(), "delivery must wait for the drain");
        assert_eq!(prop.get(), 80, "value is visible immediately");

        sched.drain_once();
        assert_eq!(*log.lock(), vec![80]);
    }

    #[test]
    fn test_equal_value_is_complete_noop() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 42);
        let log = Arc::new(Mutex::new(Vec::new()));
        prop.subscribe(SubscriberKey::next(), recording(&log));

        prop.set(42);
        assert_eq!(sched.backlog(), 0, "equal write must not enqueue");
        sched.drain_once();
        assert!(log.lock().is_empty());

        // Same rule for urgent writes.
        prop.set_urgent(42);
        assert_eq!(sched.backlog(), 0);
    }

    #[test]
    fn test_writes_between_drains_coalesce_to_latest() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        let log = Arc::new(Mutex::new(Vec::new()));
        prop.subscribe(SubscriberKey::next(), recording(&log));

        prop.set(1);
        prop.set(2);
        prop.set(3);
        assert_eq!(sched.backlog(), 1, "one pending delivery for many writes");

        sched.drain_once();
        assert_eq!(*log.lock(), vec![3], "latest value wins");
    }

    #[test]
    fn test_urgent_write_preempts_normal_peer() {
        let sched = Scheduler::with_defaults();
        let slow = Observable::new(&sched, 0);
        let fast = Observable::new(&sched, 0);
        let log = Arc::new(Mutex::new(Vec::new()));

        let order = Arc::clone(&log);
        slow.subscribe(SubscriberKey::next(), move |_: &i32| {
            order.lock().push("slow")
        });
        let order = Arc::clone(&log);
        fast.subscribe(SubscriberKey::next(), move |_: &i32| {
            order.lock().push("fast")
        });

        slow.set(1);
        fast.set_urgent(1);
        sched.drain_once();
        assert_eq!(*log.lock(), vec!["fast", "slow"]);
    }

    #[test]
    fn test_urgent_after_pending_normal_delivers_once() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        let deliveries = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&deliveries);
        prop.subscribe(SubscriberKey::next(), move |_: &i32| {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        prop.set(1);
        prop.set_urgent(2);
        assert_eq!(sched.backlog(), 2, "urgent write claims an earlier slot");

        sched.drain_once();
        assert_eq!(
            deliveries.load(Ordering::SeqCst),
            1,
            "second action must no-op after the first delivered"
        );
        assert_eq!(prop.get(), 2);
    }

    #[test]
    fn test_concurrent_writers_one_delivery_with_last_value() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, -1);
        let log = Arc::new(Mutex::new(Vec::new()));
        prop.subscribe(SubscriberKey::next(), recording(&log));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let prop = prop.clone();
                std::thread::spawn(move || prop.set(i))
            })
            .collect();
        for w in writers {
            w.join().expect("writer panicked");
        }

        let final_value = prop.get();
        assert!((0..8).contains(&final_value), "stored value is one write");

        sched.drain_once();
        let delivered = log.lock().clone();
        assert_eq!(delivered.len(), 1, "coalesced to exactly one notification");
        assert_eq!(delivered[0], final_value, "delivery carries the last value");
    }

    #[test]
    fn test_broadcast_listeners_run_after_keyed_in_order() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let l = Arc::clone(&log);
        prop.subscribe(SubscriberKey::next(), move |_: &i32| l.lock().push("keyed"));
        let l = Arc::clone(&log);
        prop.listen(move |_: &i32| l.lock().push("first"));
        let l = Arc::clone(&log);
        prop.listen(move |_: &i32| l.lock().push("second"));

        prop.set(1);
        sched.drain_once();
        assert_eq!(*log.lock(), vec!["keyed", "first", "second"]);
    }

    #[test]
    fn test_panicking_listener_does_not_block_peers() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        let hits = Arc::new(AtomicUsize::new(0));

        prop.listen(|_: &i32| panic!("bad listener"));
        let h = Arc::clone(&hits);
        prop.listen(move |_: &i32| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        prop.set(1);
        sched.drain_once();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_self_healing_subscriber_through_property() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        let hits = Arc::new(AtomicUsize::new(0));

        prop.subscribe(SubscriberKey::next(), |_: &i32| panic!("dead"));
        let h = Arc::clone(&hits);
        prop.subscribe(SubscriberKey::next(), move |_: &i32| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        prop.set(1);
        sched.drain_once();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(prop.subscriber_count(), 1, "panicking subscriber removed");

        prop.set(2);
        sched.drain_once();
        assert_eq!(hits.load(Ordering::SeqCst), 2, "no further panics, no loss");
    }

    #[test]
    fn test_dispose_is_idempotent_and_clears() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        prop.subscribe(SubscriberKey::next(), move |_: &i32| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        prop.listen(|_: &i32| {});

        prop.dispose();
        prop.dispose();
        assert!(prop.is_disposed());
        assert_eq!(prop.subscriber_count(), 0);

        prop.set(5);
        sched.drain_once();
        assert_eq!(hits.load(Ordering::SeqCst), 0, "nobody left to notify");
        assert_eq!(prop.get(), 5, "the cell itself still works");
    }

    #[test]
    fn test_dropped_observable_delivers_nothing() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        prop.set(1);
        drop(prop);

        // The queued action's weak handle fails to upgrade; the drain must
        // not panic.
        assert_eq!(sched.drain_once(), 1);
    }

    #[test]
    fn test_set_after_scheduler_shutdown_keeps_value() {
        let sched = Scheduler::with_defaults();
        let prop = Observable::new(&sched, 0);
        sched.shutdown();

        prop.set(9);
        assert_eq!(prop.get(), 9, "the write itself still lands");
        assert_eq!(sched.backlog(), 0);

        // The pending bit was rolled back, so a future scheduler (none
        // here) would not be blocked; repeated sets stay harmless.
        prop.set(10);
        assert_eq!(prop.get(), 10);
    }

    #[test]
    fn test_value_equality_between_observables() {
        let sched = Scheduler::with_defaults();
        let a = Observable::new(&sched, 3);
        let b = Observable::new(&sched, 3);
        let c = Observable::new(&sched, 4);

        assert_eq!(a, b, "equal held values compare equal");
        assert_ne!(a, c);
        assert_eq!(a, a.clone(), "handles to the same cell compare equal");
    }

    #[test]
    fn test_with_default_and_default_config_scheduler() {
        let sched = Scheduler::builder(Config::default()).build();
        let prop: Observable<u64> = Observable::with_default(&sched);
        assert_eq!(prop.get(), 0);
    }

    #[test]
    fn test_clone_shares_the_cell() {
        let sched = Scheduler::with_defaults();
        let a = Observable::new(&sched, 0);
        let b = a.clone();
        let log = Arc::new(Mutex::new(Vec::new()));
        b.subscribe(SubscriberKey::next(), recording(&log));

        a.set(7);
        sched.drain_once();
        assert_eq!(b.get(), 7);
        assert_eq!(*log.lock(), vec![7]);
    }
}
