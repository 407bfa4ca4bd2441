//! # Adaptive batch-size controller.
//!
//! [`BatchController`] decides how many pending actions a drain cycle may
//! deliver. It is parameterized by [`Config`]:
//! - [`Config::initial_batch`] the steady-state budget and decay floor;
//! - [`Config::max_pending`] the backlog high-water mark;
//! - [`Config::shrink_step`] the per-cycle decay decrement;
//! - [`Config::pressure_floor`] the memory-pressure lower bound.
//!
//! The controller biases toward small, predictable per-cycle cost under
//! normal load and toward aggressive catch-up under burst load: once the
//! backlog exceeds the high-water mark, a single cycle takes the whole
//! backlog, then the budget decays back down by a fixed step per cycle.
//!
//! The controller is deterministic — drain behavior for a fixed sequence of
//! enqueues is reproducible, which the queue-ordering tests rely on.
//!
//! # Example
//! ```rust
//! use tickbus::{BatchController, Config};
//!
//! let cfg = Config { initial_batch: 500, max_pending: 10_000, shrink_step: 50, ..Config::default() };
//! let mut batch = BatchController::new(&cfg);
//!
//! // Normal load: budget stays at the floor.
//! assert_eq!(batch.next(200), 500);
//!
//! // Burst: backlog above the high-water mark is taken whole.
//! assert_eq!(batch.next(10_001), 10_001);
//!
//! // Recovery: fixed-step decay, never below the floor.
//! assert_eq!(batch.next(300), 9_951);
//! ```

use super::config::Config;

/// Adaptive per-cycle delivery budget.
///
/// Owned by the scheduler and consulted once at the top of every drain
/// cycle; the memory-pressure lever mutates it between cycles.
#[derive(Clone, Copy, Debug)]
pub struct BatchController {
    current: usize,
    floor: usize,
    max_pending: usize,
    shrink_step: usize,
    pressure_floor: usize,
}

impl BatchController {
    /// Creates a controller seeded at the configured initial batch size.
    pub fn new(cfg: &Config) -> Self {
        let floor = cfg.initial_batch_clamped();
        Self {
            current: floor,
            floor,
            max_pending: cfg.max_pending,
            shrink_step: cfg.shrink_step,
            pressure_floor: cfg.pressure_floor_clamped(),
        }
    }

    /// Recomputes the budget for the coming drain cycle.
    ///
    /// - `backlog > max_pending` → the budget becomes the entire backlog
    ///   (drain-all), preventing unbounded growth at the cost of one longer
    ///   cycle.
    /// - Otherwise the budget shrinks by `shrink_step`, never below the
    ///   floor. This is also the recovery path after drain-all and after
    ///   pressure halving.
    pub fn next(&mut self, backlog: usize) -> usize {
        if backlog > self.max_pending {
            self.current = backlog;
        } else {
            self.current = self.current.saturating_sub(self.shrink_step).max(self.floor);
        }
        self.current
    }

    /// Halves the budget in response to a low-memory signal.
    ///
    /// Floored at `pressure_floor`. This is a degradation lever, not a
    /// correctness mechanism: it trades delivery latency for memory
    /// headroom, and the next ordinary cycle begins recovering the budget.
    pub fn on_pressure(&mut self) -> usize {
        self.current = (self.current / 2).max(self.pressure_floor);
        self.current
    }

    /// The budget chosen by the most recent `next`/`on_pressure` call.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }
}
