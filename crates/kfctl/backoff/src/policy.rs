//! Backoff policy and delay sequence

use crate::error::BackoffError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff policy.
///
/// The first pause is `initial_interval` (clamped to `max_interval`); each
/// later pause is the previous one times `multiplier`, again clamped.
/// Retrying stops once another pause would push the total past
/// `max_elapsed_time`. A zero `max_elapsed_time` disables retries.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Duration,
    pub multiplier: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Duration::from_secs(15 * 60),
            multiplier: 1.5,
        }
    }
}

impl ExponentialBackoff {
    /// Policy with the three time budgets and the default multiplier
    pub fn new(initial_interval: Duration, max_interval: Duration, max_elapsed_time: Duration) -> Self {
        Self {
            initial_interval,
            max_interval,
            max_elapsed_time,
            ..Default::default()
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Check `initial_interval <= max_interval <= max_elapsed_time`.
    ///
    /// Retrying works with a policy that fails this check; the check exists
    /// for callers that want to refuse a misconfiguration up front.
    pub fn validate(&self) -> Result<(), BackoffError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(BackoffError::InvalidMultiplier(self.multiplier));
        }
        if self.initial_interval > self.max_interval {
            return Err(BackoffError::InitialExceedsMax {
                initial: self.initial_interval,
                max: self.max_interval,
            });
        }
        if self.max_interval > self.max_elapsed_time {
            return Err(BackoffError::MaxExceedsElapsed {
                max: self.max_interval,
                elapsed: self.max_elapsed_time,
            });
        }
        Ok(())
    }

    /// The successive pauses, without the elapsed-time cut-off
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.initial_interval.min(self.max_interval),
            max: self.max_interval,
            multiplier: if self.multiplier.is_finite() {
                self.multiplier.max(1.0)
            } else {
                1.0
            },
        }
    }

    /// Pause to take after a failure, or `None` to give up.
    pub(crate) fn next_pause(&self, delays: &mut Delays, elapsed: Duration) -> Option<Duration> {
        if self.max_elapsed_time.is_zero() {
            return None;
        }
        let delay = delays.next().unwrap_or(self.max_interval);
        if elapsed.saturating_add(delay) > self.max_elapsed_time {
            None
        } else {
            Some(delay)
        }
    }
}

/// Endless iterator over backoff pauses
#[derive(Debug, Clone)]
pub struct Delays {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        let grown = current.as_secs_f64() * self.multiplier;
        self.next = if grown >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(grown)
        };
        Some(current)
    }
}

/// Serializable form of a policy, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First pause (milliseconds)
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    /// Longest single pause (milliseconds)
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Total budget across attempts (milliseconds)
    #[serde(default = "default_max_elapsed_ms")]
    pub max_elapsed_ms: u64,

    /// Growth factor
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            max_elapsed_ms: default_max_elapsed_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl From<&BackoffConfig> for ExponentialBackoff {
    fn from(config: &BackoffConfig) -> Self {
        Self {
            initial_interval: Duration::from_millis(config.initial_interval_ms),
            max_interval: Duration::from_millis(config.max_interval_ms),
            max_elapsed_time: Duration::from_millis(config.max_elapsed_ms),
            multiplier: config.multiplier,
        }
    }
}

// Defaults match the readiness wait the bootstrap smoke test uses.
fn default_initial_interval_ms() -> u64 {
    3_000
}

fn default_max_interval_ms() -> u64 {
    30_000
}

fn default_max_elapsed_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    1.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_grow_and_clamp() {
        let policy = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
        .with_multiplier(2.0);

        let delays: Vec<_> = policy.delays().take(5).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(5),
                Duration::from_secs(5),
            ]
        );
    }

    #[test]
    fn test_initial_above_max_clamps_first_wait() {
        let policy = ExponentialBackoff::new(
            Duration::from_secs(10),
            Duration::from_secs(2),
            Duration::from_secs(60),
        );
        assert_eq!(policy.delays().next(), Some(Duration::from_secs(2)));
        assert!(matches!(
            policy.validate(),
            Err(BackoffError::InitialExceedsMax { .. })
        ));
    }

    #[test]
    fn test_validate_ordering() {
        let good = ExponentialBackoff::new(
            Duration::from_secs(3),
            Duration::from_secs(30),
            Duration::from_secs(60),
        );
        assert!(good.validate().is_ok());

        let bad = ExponentialBackoff::new(
            Duration::from_secs(3),
            Duration::from_secs(90),
            Duration::from_secs(60),
        );
        assert!(matches!(
            bad.validate(),
            Err(BackoffError::MaxExceedsElapsed { .. })
        ));

        let shrinking = good.clone().with_multiplier(0.5);
        assert_eq!(
            shrinking.validate(),
            Err(BackoffError::InvalidMultiplier(0.5))
        );
    }

    #[test]
    fn test_zero_budget_never_pauses() {
        let policy = ExponentialBackoff::new(Duration::ZERO, Duration::ZERO, Duration::ZERO);
        let mut delays = policy.delays();
        assert_eq!(policy.next_pause(&mut delays, Duration::ZERO), None);
    }

    #[test]
    fn test_pause_respects_budget() {
        let policy = ExponentialBackoff::new(
            Duration::from_secs(3),
            Duration::from_secs(30),
            Duration::from_secs(10),
        );
        let mut delays = policy.delays();
        assert_eq!(
            policy.next_pause(&mut delays, Duration::from_secs(6)),
            Some(Duration::from_secs(3))
        );
        // Next pause is 4.5s; 6s + 4.5s > 10s.
        assert_eq!(policy.next_pause(&mut delays, Duration::from_secs(6)), None);
    }

    #[test]
    fn test_config_conversion() {
        let config: BackoffConfig = serde_json::from_str(r#"{"max_elapsed_ms": 5000}"#).unwrap();
        let policy = ExponentialBackoff::from(&config);
        assert_eq!(policy.initial_interval, Duration::from_secs(3));
        assert_eq!(policy.max_interval, Duration::from_secs(30));
        assert_eq!(policy.max_elapsed_time, Duration::from_secs(5));
    }
}
