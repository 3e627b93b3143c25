use std::time::Duration;
use thiserror::Error;

/// Misconfigured backoff policies
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackoffError {
    #[error("initial interval {initial:?} exceeds max interval {max:?}")]
    InitialExceedsMax { initial: Duration, max: Duration },

    #[error("max interval {max:?} exceeds max elapsed time {elapsed:?}")]
    MaxExceedsElapsed { max: Duration, elapsed: Duration },

    #[error("multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),
}
