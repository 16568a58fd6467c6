//! Exponential backoff for transient request failures.

use crate::config::RetryConfig;
use crate::error::{ParseratorError, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Run `operation`, retrying with exponential backoff while `should_retry`
/// allows it.
///
/// The delay starts at the configured base, multiplies by the configured
/// factor after each attempt, and is capped at the configured maximum; each
/// sleep adds bounded random jitter so concurrent retries do not
/// synchronize. Once `max_retries` is exhausted the last error propagates
/// unchanged.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    should_retry: impl Fn(&ParseratorError, u32) -> bool,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    let mut delay = config.initial_backoff;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= config.max_retries || !should_retry(&error, attempt) {
                    return Err(error);
                }

                let backoff = delay.min(config.max_backoff) + jitter();
                debug!(
                    attempt,
                    max_retries = config.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %error,
                    "request failed, retrying"
                );
                sleep(backoff).await;

                let next = delay.as_secs_f64() * config.multiplier;
                delay = Duration::from_secs_f64(next.min(config.max_backoff.as_secs_f64()));
                attempt += 1;
            }
        }
    }
}

/// Up to half a second of random spacing.
fn jitter() -> Duration {
    Duration::from_secs_f64(rand::random::<f64>() * 0.5)
}
