//! # Keyed subscriber registry with self-healing delivery.
//!
//! [`SubscriberRegistry`] maps a [`SubscriberKey`] to a callback and fans a
//! value out to every current entry. It is safe to add and remove entries
//! from any thread, including while a delivery is in flight on the drain
//! thread.
//!
//! ## Rules
//! - **Snapshot delivery**: `notify_all` copies the current entries under
//!   the lock, releases it, then invokes callbacks. Mutating the registry
//!   from inside a callback cannot deadlock and takes effect next delivery.
//! - **Self-healing**: a callback that panics is logged and its key is
//!   removed **after** the iteration completes; remaining subscribers in
//!   the same delivery still run.
//! - **Warn, don't throw**: duplicate subscription replaces the previous
//!   callback with a warning; unsubscribing a missing key warns and
//!   no-ops. Both report through the return value.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Callback signature shared by keyed subscribers and broadcast listeners.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Global allocator for auto-generated subscriber keys.
static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity handle for a keyed subscription.
///
/// Either allocated fresh via [`SubscriberKey::next`] or derived from a
/// caller-managed identity via [`SubscriberKey::from_raw`] (useful when the
/// subscribing component already has a stable id). Keys are compared by
/// value; uniqueness within one registry is the caller's concern for
/// `from_raw` keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberKey(u64);

impl SubscriberKey {
    /// Allocates a process-unique key.
    pub fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a caller-managed identity.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identity value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

impl From<u64> for SubscriberKey {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

/// Keyed callback registry for one observable value.
pub struct SubscriberRegistry<T> {
    entries: Mutex<HashMap<SubscriberKey, Callback<T>>>,
}

impl<T> Default for SubscriberRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriberRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `callback` under `key`.
    ///
    /// Returns `true` if the key was newly inserted. A duplicate key logs a
    /// warning and **replaces** the previous callback (re-subscribe
    /// semantics), returning `false`.
    pub fn subscribe(&self, key: SubscriberKey, callback: Callback<T>) -> bool {
        let replaced = self.entries.lock().insert(key, callback).is_some();
        if replaced {
            tracing::warn!(%key, "duplicate subscription; previous callback replaced");
        }
        !replaced
    }

    /// Removes the subscription under `key`.
    ///
    /// Safe to call speculatively: a missing key logs a warning and returns
    /// `false` instead of failing.
    pub fn unsubscribe(&self, key: SubscriberKey) -> bool {
        let removed = self.entries.lock().remove(&key).is_some();
        if !removed {
            tracing::warn!(%key, "unsubscribe for unknown key; ignoring");
        }
        removed
    }

    /// Delivers `value` to every current subscriber.
    ///
    /// Runs on the drain thread. Panicking callbacks are caught, logged,
    /// and their keys removed once the iteration has finished — one dead
    /// subscriber never blocks delivery to the rest, and it will not be
    /// invoked again.
    pub fn notify_all(&self, value: &T) {
        let snapshot: Vec<(SubscriberKey, Callback<T>)> = self
            .entries
            .lock()
            .iter()
            .map(|(k, cb)| (*k, Arc::clone(cb)))
            .collect();

        let mut dead: Vec<(SubscriberKey, Callback<T>)> = Vec::new();
        for (key, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                tracing::error!(%key, "subscriber panicked during delivery; removing");
                dead.push((key, callback));
            }
        }

        if !dead.is_empty() {
            let mut entries = self.entries.lock();
            for (key, callback) in dead {
                // Don't drop a callback that was re-registered mid-delivery.
                if let Some(current) = entries.get(&key) {
                    if Arc::ptr_eq(current, &callback) {
                        entries.remove(&key);
                    }
                }
            }
        }
    }

    /// Number of current subscriptions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<T> fmt::Debug for SubscriberRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}
