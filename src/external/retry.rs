use std::future::Future;

use tokio::time::Duration;
use tracing::warn;

use crate::external::option_chain_provider::ChainProviderError;
use crate::services::clock::Clock;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Exponential backoff (base 2, no jitter) over retryable provider failures.
///
/// Transport failures and rate limiting share one attempt counter. Once the
/// counter exceeds `max_retries` the call fails with `ExhaustedRetries`, so a
/// call makes at most `max_retries + 1` requests and sleeps `max_retries` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. The operation is re-issued unchanged on every attempt.
    pub async fn run<T, F, Fut>(
        &self,
        clock: &dyn Clock,
        label: &str,
        mut op: F,
    ) -> Result<T, ChainProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainProviderError>>,
    {
        let mut attempts: u32 = 0;
        let mut delay = self.base_delay;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    attempts += 1;
                    if attempts > self.max_retries {
                        return Err(ChainProviderError::ExhaustedRetries {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }
                    warn!(
                        "{} for {}, retrying in {:.1}s (attempt {}/{})",
                        e,
                        label,
                        delay.as_secs_f64(),
                        attempts,
                        self.max_retries
                    );
                    clock.sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
