//! # tickbus
//!
//! **tickbus** decouples "a value changed" from "subscribers are notified":
//! writers on any thread mutate [`Observable`] values, and one shared
//! [`Scheduler`] delivers the resulting notifications later, in adaptively
//! sized, priority-ordered batches, once per host cycle on a single
//! designated thread.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  writer threads (any):                          drain thread (one):
//!    Observable<A>.set(v) ──┐
//!    Observable<B>.set(v) ──┼─► equality check
//!    Observable<C>.set(v) ──┘        │ changed?
//!                                    ▼
//!                         one delivery action per
//!                         property per cycle (coalesced)
//!                                    │ enqueue(priority)
//!                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - PriorityQueue (buckets by key, FIFO within, highest first)     │
//! │  - BatchController (adaptive per-cycle budget)                    │
//! │  - lifetime stats (enqueued / delivered / panicked)               │
//! └──────────────────────────────────┬────────────────────────────────┘
//!                                    │ drain_once(), once per host cycle
//!                                    ▼
//!                        pop ≤ batch actions, invoke each
//!                        (panics caught, batch continues)
//!                                    │
//!                      ┌─────────────┴─────────────┐
//!                      ▼                           ▼
//!            SubscriberRegistry             broadcast listeners
//!            (keyed, self-healing)          (registration order)
//! ```
//!
//! ### Delivery lifecycle
//! ```text
//! set(v) ──► equal? ──► yes: no-op (nothing stored, nothing queued)
//!              │ no
//!              ▼
//!       swap value in guarded cell
//!              ▼
//!       delivery already pending? ──► yes: done (latest value wins at drain)
//!              │ no (or urgent)
//!              ▼
//!       enqueue delivery action
//!              ▼                      … later, next drain cycle …
//!       drain_once():
//!         ├─► budget = BatchController.next(backlog)
//!         │     - backlog > max_pending  → take the whole backlog
//!         │     - otherwise             → decay by shrink_step to the floor
//!         ├─► invoke ≤ budget actions in priority order
//!         └─► each action: sample latest value → notify_all → listeners
//! ```
//!
//! ## Features
//! | Area             | Description                                              | Key types                                 |
//! |------------------|----------------------------------------------------------|-------------------------------------------|
//! | **Observables**  | Thread-safe value cells with change detection.           | [`Observable`]                            |
//! | **Subscriptions**| Keyed callbacks with self-healing delivery.              | [`SubscriberKey`], [`SubscriberRegistry`] |
//! | **Scheduling**   | Priority-batched, once-per-cycle delivery.               | [`Scheduler`], [`PriorityQueue`]          |
//! | **Adaptivity**   | Burst drain-all, decay to floor, pressure halving.       | [`BatchController`], [`Config`]           |
//! | **Errors**       | Explicit contract failures, contained delivery failures. | [`SchedulerError`], [`QueueError`]        |
//! | **Driving**      | Optional periodic drain task (`driver` feature).         | [`TickDriver`]                            |
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use tickbus::{Observable, Scheduler, SubscriberKey};
//!
//! // The host owns the scheduler and calls drain_once from its loop.
//! let scheduler = Scheduler::with_defaults();
//!
//! let health = Observable::new(&scheduler, 100u32);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = Arc::clone(&seen);
//! health.subscribe(SubscriberKey::next(), move |v: &u32| {
//!     log.lock().unwrap().push(*v);
//! });
//!
//! health.set(80);             // stored immediately, delivered later
//! health.set(60);             // coalesces with the pending delivery
//! scheduler.drain_once();     // the host's per-cycle call
//!
//! assert_eq!(*seen.lock().unwrap(), vec![60]);
//! ```
//!
//! ## Threading rules
//! - `set` / `get` / `subscribe` / `unsubscribe` / `enqueue`: any thread.
//! - `drain_once`: exactly one designated context, serially; callbacks run
//!   inside it and must not block or re-enter the drain.
//! - Delivery is always deferred — never synchronous inside `set`.

mod error;
mod observable;
mod queue;
mod scheduler;

// ---- Public re-exports ----

pub use error::{QueueError, SchedulerError};
pub use observable::{Callback, Observable, SubscriberKey, SubscriberRegistry};
pub use queue::{Action, PriorityQueue};
pub use scheduler::{
    BatchController, Config, ReclaimHook, Scheduler, SchedulerBuilder, StatsSnapshot,
    PRIORITY_NORMAL, PRIORITY_URGENT,
};

// Optional: periodic drain loop for hosts without their own tick.
// Enable with: `--features driver` (on by default).
#[cfg(feature = "driver")]
mod driver;
#[cfg(feature = "driver")]
pub use driver::TickDriver;
