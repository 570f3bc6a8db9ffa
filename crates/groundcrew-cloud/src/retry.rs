//! Bounded retry with exponential backoff
//!
//! Every provisioning call goes through [`retry_with_backoff`]. Only
//! transient provider faults are retried; semantic faults surface on the
//! first attempt.

use crate::error::Result;
use crate::provider::RetryConfig;
use std::future::Future;

pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = config.initial_delay;
    let mut attempt = 1u32;

    loop {
        match call().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < config.max_attempts => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transient fault: {err}; retrying"
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay.mul_f64(config.backoff_multiplier), config.max_delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
