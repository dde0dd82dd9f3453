//! Backoff for TSA exchanges.
//!
//! An exchange is retried only while its error says the same request may
//! succeed later ([`TimestampError::is_retryable`]): a dropped connection or
//! a request timeout. An HTTP error status, a PKIStatus rejection, or a
//! reply that does not decode is returned after the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::TimestampError;

/// How often and how patiently to repeat a TSA exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(16))
    }

    /// Run `exchange` until it succeeds, fails for good, or the retries
    /// are used up. `endpoint` only labels the log lines.
    pub(crate) async fn run<T, F, Fut>(&self, endpoint: &str, exchange: F) -> Result<T, TimestampError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, TimestampError>>,
    {
        let mut retry = 0;
        loop {
            match exchange().await {
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    let delay = self.delay(retry);
                    retry += 1;
                    tracing::warn!(
                        endpoint,
                        retry,
                        max_retries = self.max_retries,
                        "TSA exchange failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
