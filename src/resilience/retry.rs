//! Retry Logic
//!
//! Fixed-delay retry with jitter, configured per request.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::core::HttpResponse;
use crate::error::SouthbayResult;

/// Per-request retry policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub retries: u32,
    /// Delay before each retry.
    pub delay: Duration,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
}

/// Default retry delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Retry delay for the session refresh call.
pub const REFRESH_RETRY_DELAY: Duration = Duration::from_millis(400);

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: DEFAULT_RETRY_DELAY,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            delay,
            ..Default::default()
        }
    }

    /// Single attempt; used for mutations and uploads.
    pub fn none() -> Self {
        Self::new(0, DEFAULT_RETRY_DELAY)
    }

    /// Policy of the refresh call.
    pub fn refresh() -> Self {
        Self::new(1, REFRESH_RETRY_DELAY)
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }

    fn calculate_delay(&self) -> Duration {
        let base = self.delay.as_millis() as f64;
        let jitter_range = base * self.jitter;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        Duration::from_millis((base + jitter).max(0.0) as u64)
    }

    /// Run `operation` until it yields a non-retryable outcome or attempts
    /// run out. Transport failures and 5xx responses are retried; the last
    /// outcome is returned as is.
    pub async fn execute<F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> SouthbayResult<HttpResponse>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = SouthbayResult<HttpResponse>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = operation(attempt).await;
            let retryable = match &outcome {
                Ok(response) => response.status >= 500,
                Err(error) => error.is_retryable(),
            };

            if !retryable || attempt >= self.max_attempts() {
                return outcome;
            }

            let delay = self.calculate_delay();
            debug!(
                operation = operation_name,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, SouthbayError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Duration::from_millis(1)).with_jitter(0.0)
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fast(1)
            .execute("list", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(HttpResponse::new(if n == 0 { 503 } else { 200 }, "")) }
            })
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result = fast(3)
            .execute("create", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(HttpResponse::new(400, "")) }
            })
            .await
            .unwrap();

        assert_eq!(result.status, 400);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let result = fast(1)
            .execute("me", |attempt| async move {
                Err(SouthbayError::Network(NetworkError::ConnectionFailed {
                    message: format!("attempt {}", attempt),
                }))
            })
            .await;

        assert!(result.unwrap_err().to_string().contains("attempt 2"));
    }

    #[test]
    fn test_policies() {
        assert_eq!(RetryPolicy::default().retries, 1);
        assert_eq!(RetryPolicy::default().delay, Duration::from_millis(300));
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
        assert_eq!(RetryPolicy::refresh().delay, Duration::from_millis(400));
    }
}
