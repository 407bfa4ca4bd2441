//! Pending-notification storage: the priority multi-queue.
//!
//! This module holds the **data structure** the scheduler drains once per
//! cycle: a bucketed queue of boxed notification actions, ordered by an
//! integer priority key and FIFO within each bucket.
//!
//! ## Contents
//! - [`Action`] boxed one-shot notification closure
//! - [`PriorityQueue`] bucketed multi-queue with exact length bookkeeping
//!
//! ## Quick reference
//! - **Producer**: [`Scheduler::enqueue`](crate::Scheduler::enqueue) (any
//!   thread, under the scheduler's lock).
//! - **Consumer**: [`Scheduler::drain_once`](crate::Scheduler::drain_once)
//!   (designated drain thread only).
//!
//! The queue itself carries **no** synchronization; the scheduler owns it
//! behind a mutex and is the only component that touches it.

mod priority;

pub use priority::{Action, PriorityQueue};
