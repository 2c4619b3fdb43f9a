//! Bounded retry with fixed backoff.
//!
//! The driver only knows about budgets and delays; what counts as retryable
//! is decided by [`Error::class`](crate::Error::class).

use crate::error::ErrorClass;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Attempt budget and inter-attempt backoff for the generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// Run `op` up to the policy's attempt budget, sleeping the fixed backoff
/// between attempts (never after the final one). A terminal error stops
/// immediately; the last error is returned once the budget is exhausted.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, error = %err, "generation attempt failed");
                if err.class() == ErrorClass::Terminal {
                    return Err(err);
                }
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                tokio::time::sleep(policy.backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> Error {
        Error::Remote {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_attempts_and_sleeps() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<()> = run_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert!(result.is_err());
        // Exactly 5 attempts with exactly 4 inter-attempt sleeps.
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert_eq!(started.elapsed(), policy.backoff * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let result = run_with_retry(&policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok("answer".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "answer");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_stops_immediately() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<()> = run_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::InvalidResponse {
                    feedback: Some("blockReason: SAFETY".into()),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(Error::InvalidResponse { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // No backoff sleep on a terminal error.
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_immediate_success_single_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_secs(30));
        let attempts = AtomicU32::new(0);

        let result = run_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42u32) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
