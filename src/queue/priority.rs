//! # Bucketed priority queue for pending notification actions.
//!
//! [`PriorityQueue`] stores one-shot closures in FIFO buckets keyed by an
//! integer priority. Draining pops from the **highest** key first; within a
//! bucket, strict insertion order. For a fixed sequence of pushes the drain
//! order is fully deterministic.
//!
//! ## Architecture
//! ```text
//! push(100, e) ──► ┌─ bucket 100 ─┐   pop_highest() ─► e   (highest key first)
//! push(0, a)   ──► │  [e]         │   pop_highest() ─► a   (then FIFO at key 0)
//! push(0, b)   ──► ├─ bucket 0 ───┤   pop_highest() ─► b
//!                  │  [a, b]      │   pop_highest() ─► Err(Empty)
//!                  └──────────────┘
//! ```
//!
//! ## Rules
//! - **Higher key = more urgent**: drained first.
//! - **FIFO within a bucket**: ties break by insertion order.
//! - **No empty buckets**: a bucket is removed the moment its deque empties.
//! - **Exact length**: `len` is the sum of all bucket lengths, adjusted with
//!   every push/pop; when it reaches 0 the bucket map is empty.
//! - **No internal locking**: the owner synchronizes access.

use std::collections::{BTreeMap, VecDeque};

use crate::error::QueueError;

/// A pending notification: a boxed one-shot closure, invoked at most once
/// on the drain thread, then dropped.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Priority-ordered multi-queue of pending notification actions.
///
/// Buckets are keyed by `i32` priority; [`PriorityQueue::pop_highest`]
/// returns the head of the highest-key bucket. Not synchronized — the
/// scheduler owns one of these behind its lock.
#[derive(Default)]
pub struct PriorityQueue {
    buckets: BTreeMap<i32, VecDeque<Action>>,
    len: usize,
}

impl PriorityQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action to the tail of the given priority bucket.
    ///
    /// O(log B) in the number of distinct priority keys present.
    pub fn push(&mut self, priority: i32, action: Action) {
        self.buckets.entry(priority).or_default().push_back(action);
        self.len += 1;
    }

    /// Removes and returns the head of the highest-priority bucket.
    ///
    /// Ties within a bucket break by strict FIFO insertion order. A bucket
    /// whose deque empties is removed immediately.
    pub fn pop_highest(&mut self) -> Result<Action, QueueError> {
        if self.len == 0 {
            return Err(QueueError::Empty);
        }

        // Keys iterate ascending; the last entry is the most urgent bucket.
        let key = *self.buckets.keys().next_back().ok_or(QueueError::Empty)?;
        let bucket = self.buckets.get_mut(&key).ok_or(QueueError::Empty)?;
        let action = bucket.pop_front().ok_or(QueueError::Empty)?;

        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        self.len -= 1;
        if self.len == 0 {
            debug_assert!(self.buckets.is_empty(), "len is 0 but buckets remain");
        }
        Ok(action)
    }

    /// Removes all buckets and resets the length to 0.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    /// Number of actions currently queued across all buckets.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no actions are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for PriorityQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut per_bucket: Vec<(i32, usize)> =
            self.buckets.iter().map(|(k, v)| (*k, v.len())).collect();
        per_bucket.reverse();
        f.debug_struct("PriorityQueue")
            .field("len", &self.len)
            .field("buckets", &per_bucket)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn recorder(log: &Arc<parking_lot::Mutex<Vec<&'static str>>>, tag: &'static str) -> Action {
        let log = Arc::clone(log);
        Box::new(move || log.lock().push(tag))
    }

    #[test]
    fn test_fifo_within_one_priority() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut q = PriorityQueue::new();
        q.push(0, recorder(&log, "a"));
        q.push(0, recorder(&log, "b"));
        q.push(0, recorder(&log, "c"));

        while let Ok(action) = q.pop_highest() {
            action();
        }
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_higher_priority_drains_first() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut q = PriorityQueue::new();
        q.push(0, recorder(&log, "normal"));
        q.push(100, recorder(&log, "urgent"));

        while let Ok(action) = q.pop_highest() {
            action();
        }
        assert_eq!(*log.lock(), vec!["urgent", "normal"]);
    }

    #[test]
    fn test_deterministic_drain_order_across_buckets() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut q = PriorityQueue::new();
        q.push(5, recorder(&log, "m1"));
        q.push(0, recorder(&log, "l1"));
        q.push(10, recorder(&log, "h1"));
        q.push(5, recorder(&log, "m2"));
        q.push(10, recorder(&log, "h2"));
        q.push(0, recorder(&log, "l2"));

        while let Ok(action) = q.pop_highest() {
            action();
        }
        assert_eq!(*log.lock(), vec!["h1", "h2", "m1", "m2", "l1", "l2"]);
    }

    #[test]
    fn test_pop_on_empty_fails() {
        let mut q = PriorityQueue::new();
        assert!(matches!(q.pop_highest(), Err(QueueError::Empty)));
    }

    #[test]
    fn test_len_tracks_push_and_pop_exactly() {
        let mut q = PriorityQueue::new();
        assert_eq!(q.len(), 0);
        assert!(q.is_empty());

        for i in 0..5 {
            q.push(i % 2, Box::new(|| {}));
            assert_eq!(q.len(), (i + 1) as usize);
        }
        for i in (0..5).rev() {
            q.pop_highest().expect("queue should not be empty");
            assert_eq!(q.len(), i as usize);
        }
        assert!(q.is_empty());
        assert!(matches!(q.pop_highest(), Err(QueueError::Empty)));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut q = PriorityQueue::new();
        q.push(1, Box::new(|| {}));
        q.push(2, Box::new(|| {}));
        q.clear();
        assert_eq!(q.len(), 0);
        assert!(matches!(q.pop_highest(), Err(QueueError::Empty)));

        // The queue is reusable after clear.
        q.push(0, Box::new(|| {}));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_negative_priorities_drain_last() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut q = PriorityQueue::new();
        q.push(-10, recorder(&log, "background"));
        q.push(0, recorder(&log, "normal"));

        while let Ok(action) = q.pop_highest() {
            action();
        }
        assert_eq!(*log.lock(), vec!["normal", "background"]);
    }

    #[test]
    fn test_actions_are_invoked_at_most_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut q = PriorityQueue::new();
        let h = Arc::clone(&hits);
        q.push(0, Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        let action = q.pop_highest().expect("one action queued");
        action();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(q.is_empty());
    }
}
