//! Exponential backoff for kfctl
//!
//! Retries a fallible operation with geometrically growing pauses, bounded
//! per pause by `max_interval` and overall by `max_elapsed_time`. Used by
//! callers that launch the bootstrap server in the background and must wait
//! for it to become reachable.
//!
//! ```no_run
//! use kfctl_backoff::{retry, ExponentialBackoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = ExponentialBackoff {
//!     initial_interval: Duration::from_secs(3),
//!     max_interval: Duration::from_secs(30),
//!     max_elapsed_time: Duration::from_secs(60),
//!     ..Default::default()
//! };
//! retry(&policy, || async { Err::<(), _>("not yet".to_string()) }).await
//! # }
//! ```
//!
//! Every error is treated as retryable. Operations that need to stop early
//! on a permanent failure should return `Ok` with a value saying so.

#![deny(unsafe_code)]

mod error;
mod policy;
mod retry;

pub use error::BackoffError;
pub use policy::{BackoffConfig, Delays, ExponentialBackoff};
pub use retry::{retry, retry_blocking, retry_notify};
