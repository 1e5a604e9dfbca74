//! Transient store error handling
//!
//! Lock contention, pool exhaustion and raw I/O failures are worth
//! retrying with backoff; everything else is a real error. Both the
//! resolver's lookups/auto-creates and the commit path run their store
//! calls through [`with_retry`], so a busy database surfaces the same
//! way everywhere: retried per the policy, then escalated to
//! `StoreUnavailable`, which aborts the run with a report instead of
//! crashing it.

use crate::config::RetryPolicy;
use crate::error::{ImportError, ImportResult};
use std::future::Future;
use tracing::warn;

/// Errors worth retrying: lock contention, pool exhaustion, raw I/O
pub fn is_transient(error: &propd_common::Error) -> bool {
    let propd_common::Error::Database(db_err) = error else {
        return false;
    };
    match db_err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(inner) => {
            let message = inner.message().to_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}

/// Run a store operation, retrying transient failures with backoff.
///
/// Non-transient errors pass through as `ImportError::Common` on the
/// first attempt; exhausting the policy maps the last transient error
/// to `StoreUnavailable`.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> ImportResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = propd_common::Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) => {
                attempt += 1;
                if attempt >= policy.attempts {
                    return Err(ImportError::StoreUnavailable(e.to_string()));
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(attempt, ?delay, error = %e, "transient store error, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(ImportError::Common(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            growth: 2,
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_transient_error_retried_until_success() {
        let calls = AtomicU32::new(0);
        let value = with_retry(&quick_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(propd_common::Error::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_store_unavailable() {
        let calls = AtomicU32::new(0);
        let err = with_retry::<(), _, _>(&quick_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(propd_common::Error::Database(sqlx::Error::PoolTimedOut)) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::StoreUnavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "one try per policy attempt");
    }

    #[tokio::test]
    async fn test_data_errors_pass_through_without_retry() {
        let calls = AtomicU32::new(0);
        let err = with_retry::<(), _, _>(&quick_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(propd_common::Error::Config("bad".to_string())) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::Common(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(is_transient(&propd_common::Error::Database(
            sqlx::Error::PoolTimedOut
        )));
        assert!(!is_transient(&propd_common::Error::Config(
            "bad".to_string()
        )));
    }
}
