//! Retry loops

use crate::policy::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Run `op` until it succeeds or the policy's elapsed-time budget runs out.
///
/// On success the remaining budget is abandoned immediately. When the budget
/// is exhausted the most recent error is returned without another attempt.
pub async fn retry<T, E, F, Fut>(policy: &ExponentialBackoff, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_notify(policy, op, |_, _| {}).await
}

/// Like [`retry`], calling `notify` with the error and the upcoming pause
/// before every sleep.
pub async fn retry_notify<T, E, F, Fut, N>(
    policy: &ExponentialBackoff,
    mut op: F,
    mut notify: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(&E, Duration),
{
    let started = Instant::now();
    let mut delays = policy.delays();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(delay) = policy.next_pause(&mut delays, started.elapsed()) else {
            tracing::debug!(
                attempt,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Backoff budget exhausted"
            );
            return Err(err);
        };

        notify(&err, delay);
        tokio::time::sleep(delay).await;
    }
}

/// Blocking variant of [`retry`] for callers outside an async runtime.
pub fn retry_blocking<T, E, F>(policy: &ExponentialBackoff, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    let started = std::time::Instant::now();
    let mut delays = policy.delays();

    loop {
        let err = match op() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match policy.next_pause(&mut delays, started.elapsed()) {
            Some(delay) => std::thread::sleep(delay),
            None => return Err(err),
        }
    }
}
