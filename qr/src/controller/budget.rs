//! Per-item time budget

use std::time::Duration;

/// Time allowed on one quiz item before a sentinel answer is forced
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    limit: Duration,
}

impl TimeBudget {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// True once `elapsed` reaches the limit; an item with no first-seen
    /// timestamp is never exhausted
    pub fn is_exhausted(&self, elapsed: Option<Duration>) -> bool {
        elapsed.is_some_and(|e| e >= self.limit)
    }
}
