use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::LendingError;

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first. Zero is treated as one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. The last error is returned as-is.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, LendingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LendingError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(what, attempt, attempts, error = %err, "retrying after transport failure");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&quick(3), "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LendingError::Transport("flaky".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_transport_error_after_exhaustion() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&quick(2), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LendingError::Transport("down".into()))
        })
        .await;

        assert_eq!(result.unwrap_err(), LendingError::Transport("down".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_decode_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&quick(5), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LendingError::Decode("bad".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _ = with_retry(&quick(0), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, LendingError>(())
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
