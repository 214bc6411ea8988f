use anyhow::Result;

use crate::utils::duration::TrackedDuration;

/// Source of the time the user has been inactive for.
#[cfg_attr(test, mockall::automock)]
pub trait IdleSource: Send {
    fn get_idle_time(&mut self) -> Result<TrackedDuration>;
}

/// Used where the platform offers no way of reading idle time. The user is always active.
pub struct NoIdleSource;

impl IdleSource for NoIdleSource {
    fn get_idle_time(&mut self) -> Result<TrackedDuration> {
        Ok(TrackedDuration::ZERO)
    }
}

pub struct IdleEvaluator {
    threshold: TrackedDuration,
}

impl IdleEvaluator {
    pub fn new(threshold: TrackedDuration) -> Self {
        Self { threshold }
    }

    pub fn is_idle(&self, idle_time: TrackedDuration) -> bool {
        self.threshold < idle_time
    }
}
