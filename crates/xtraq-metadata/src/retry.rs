//! Connection-open retry policy.
//!
//! Only transient *connection-open* failures are retried; logical/query
//! errors propagate immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use xtraq_common::error::Error;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_open_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_open_retries: 0,
            retry_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_open_retries: u32, retry_delay_ms: u64) -> Self {
        RetryPolicy {
            max_open_retries,
            retry_delay_ms,
        }
    }

    /// Run `open` up to `max_open_retries + 1` times, sleeping
    /// `retry_delay_ms` between attempts, retrying only errors for which
    /// `Error::is_retryable` is true.
    pub async fn open_with_retry<F, Fut, T>(&self, mut open: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 0;
        loop {
            match open().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_open_retries => {
                    attempt += 1;
                    warn!(attempt, max = self.max_open_retries, %err, "connection open failed, retrying");
                    tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
                }
                Err(err) => {
                    debug!(attempt, %err, "connection open failed, no more retries");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_up_to_max_then_succeeds() {
        let policy = RetryPolicy::new(3, 1);
        let attempts = AtomicU32::new(0);
        let result = policy
            .open_with_retry(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Error::Connection("refused".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_propagate_immediately() {
        let policy = RetryPolicy::new(5, 1);
        let attempts = AtomicU32::new(0);
        let result: Result<(), Error> = policy
            .open_with_retry(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::Query("syntax error".to_string())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_returns_last_error() {
        let policy = RetryPolicy::new(2, 1);
        let attempts = AtomicU32::new(0);
        let result: Result<(), Error> = policy
            .open_with_retry(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::Connection("refused".to_string())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
