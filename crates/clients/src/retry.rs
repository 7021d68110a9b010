//! Bounded retry with exponential backoff for collaborator calls.
//!
//! The policy is an explicit value injected into each provider rather than
//! being hardcoded per call site. Only errors classified transient by
//! `RagError::is_transient` are retried.

use minirag_core::{RagResult, Stage};
use std::future::Future;
use std::time::Duration;

/// Retry policy for a collaborator.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubled after each failure
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    pub fn from_config(config: &minirag_core::config::RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_backoff_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}

/// Run `op`, retrying transient failures up to the policy's attempt budget.
///
/// Non-transient failures are surfaced immediately. The final transient
/// failure is surfaced after attempts are exhausted.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, stage: Stage, mut op: F) -> RagResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RagResult<T>>,
{
    let mut backoff = policy.base_backoff;

    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(
                    "Transient {} failure (attempt {}/{}), retrying in {:?}: {}",
                    stage,
                    attempt,
                    policy.max_attempts,
                    backoff,
                    err
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            Err(err) => return Err(err),
        }
    }

    unreachable!("retry loop always returns within max_attempts")
}

/// Whether an HTTP status indicates a transient condition worth retrying.
pub fn transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use minirag_core::RagError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result = with_retry(&policy, Stage::Embed, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RagError::embedding_transient("rate limited"))
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1));

        let result: RagResult<u32> = with_retry(&policy, Stage::Embed, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RagError::embedding("invalid api key")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result: RagResult<u32> = with_retry(&policy, Stage::Generate, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RagError::generation_transient("server error")) }
        })
        .await;

        assert!(matches!(result, Err(RagError::Generation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_transient_status() {
        assert!(transient_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(transient_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(transient_status(reqwest::StatusCode::REQUEST_TIMEOUT));
        assert!(!transient_status(reqwest::StatusCode::BAD_REQUEST));
        assert!(!transient_status(reqwest::StatusCode::UNAUTHORIZED));
    }
}
