//! Error types used by the tickbus scheduler and queue.
//!
//! This module defines two error enums:
//!
//! - [`SchedulerError`] — errors surfaced by the notification scheduler API.
//! - [`QueueError`] — errors raised by the priority queue primitive.
//!
//! Both types provide an `as_label` helper for logging/metrics.
//!
//! Delivery-time failures (a subscriber or listener panicking while being
//! notified) are deliberately **not** part of this taxonomy: they are caught
//! at the delivery site, logged, and contained there. By the time delivery
//! happens the writer that triggered it has long returned, so no error can
//! meaningfully propagate back to it.

use thiserror::Error;

/// # Errors produced by the notification scheduler.
///
/// These are caller-facing contract failures on the scheduler API,
/// surfaced synchronously at the call site.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler has been shut down; the action was rejected, not
    /// silently dropped.
    #[error("scheduler is shut down; action rejected")]
    Closed,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickbus::SchedulerError;
    ///
    /// assert_eq!(SchedulerError::Closed.as_label(), "scheduler_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::Closed => "scheduler_closed",
        }
    }
}

/// # Errors produced by the priority queue.
///
/// The queue is an internal primitive; [`Scheduler::drain_once`] checks
/// emptiness before popping, so this error never crosses the public drain
/// path. It is still part of the queue's own contract and is observable by
/// anyone driving a [`PriorityQueue`](crate::PriorityQueue) directly.
///
/// [`Scheduler::drain_once`]: crate::Scheduler::drain_once
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// `pop_highest` was called on an empty queue.
    #[error("queue is empty")]
    Empty,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Empty => "queue_empty",
        }
    }
}
