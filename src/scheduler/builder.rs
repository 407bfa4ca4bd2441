use std::sync::Arc;

use super::config::Config;
use super::core::{ReclaimHook, Scheduler};

/// Builder for constructing a [`Scheduler`] with optional hooks.
pub struct SchedulerBuilder {
    cfg: Config,
    reclaim: Option<ReclaimHook>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self { cfg, reclaim: None }
    }

    /// Registers a reclamation hook invoked on memory-pressure signals.
    ///
    /// Hosts typically point this at their asset-cache trim or allocator
    /// release entry point. The hook runs on whichever thread reported the
    /// pressure signal and must not block.
    pub fn with_reclaim_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.reclaim = Some(Box::new(hook));
        self
    }

    /// Builds and returns the scheduler instance.
    ///
    /// This consumes the builder and initializes the guarded queue, the
    /// adaptive batch controller, and the lifetime counters. The returned
    /// `Arc` is the handle observables are constructed with; the host keeps
    /// one clone for its drain loop.
    pub fn build(self) -> Arc<Scheduler> {
        Scheduler::new_internal(self.cfg, self.reclaim)
    }
}
