//! # Scheduler configuration.
//!
//! Provides [`Config`] — the knobs for the adaptive batch controller and the
//! memory-pressure degradation lever.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::builder(config).build()`
//! 2. **Batch controller seeding**: `BatchController::new(&config)`
//!
//! ## Field semantics
//! - `initial_batch`: per-cycle delivery budget under normal load, and the
//!   floor the batch size decays back to after a burst (min 1; clamped)
//! - `max_pending`: backlog high-water mark; above it the next drain takes
//!   the whole backlog in one cycle
//! - `shrink_step`: fixed decrement applied to the batch size each cycle
//!   while the backlog is at or below `max_pending`
//! - `pressure_floor`: lowest the batch size can be halved to by
//!   memory-pressure signals (min 1; clamped)

/// Configuration for the notification scheduler.
///
/// Defines:
/// - **Steady-state throughput**: `initial_batch` actions per drain cycle
/// - **Burst handling**: drain-all once the backlog exceeds `max_pending`
/// - **Recovery**: `shrink_step` decay back toward `initial_batch`
/// - **Degradation**: `pressure_floor` bound for memory-pressure halving
///
/// ## Notes
/// All fields are public for flexibility. Prefer the clamping accessors to
/// avoid sprinkling `max(1)` checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Per-cycle delivery budget under normal load.
    ///
    /// Also the floor the adaptive controller decays back to after a
    /// drain-all cycle. Keeping this bounded keeps per-cycle cost
    /// predictable on the drain thread.
    pub initial_batch: usize,

    /// Backlog high-water mark.
    ///
    /// When the queued backlog exceeds this count, the next drain processes
    /// the **entire** backlog in one cycle: one long cycle instead of
    /// unbounded queue growth.
    pub max_pending: usize,

    /// Fixed decrement applied to the batch size on every drain while the
    /// backlog is at or below `max_pending`, never shrinking below
    /// `initial_batch`.
    pub shrink_step: usize,

    /// Minimum batch size reachable through memory-pressure halving.
    ///
    /// Pressure halving may push the batch below `initial_batch`; the next
    /// ordinary drain cycle recovers it (latency traded for headroom, one
    /// cycle at a time).
    pub pressure_floor: usize,
}

impl Config {
    /// Returns the initial batch size clamped to a minimum of 1.
    #[inline]
    pub fn initial_batch_clamped(&self) -> usize {
        self.initial_batch.max(1)
    }

    /// Returns the pressure floor clamped to a minimum of 1.
    #[inline]
    pub fn pressure_floor_clamped(&self) -> usize {
        self.pressure_floor.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `initial_batch = 500` (bounded per-cycle cost)
    /// - `max_pending = 10_000` (burst threshold for drain-all)
    /// - `shrink_step = 50` (decay rate back to the floor)
    /// - `pressure_floor = 50` (lowest the pressure lever can push)
    fn default() -> Self {
        Self {
            initial_batch: 500,
            max_pending: 10_000,
            shrink_step: 50,
            pressure_floor: 50,
        }
    }
}
