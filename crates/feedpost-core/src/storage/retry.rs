//! Retry for SQLite operations that lose a lock race.
//!
//! The fetch loop writes from one task per source, so a connection can hit
//! `SQLITE_BUSY` even with a busy timeout configured.

use std::future::Future;
use std::time::Duration;

/// Maximum number of retry attempts for database operations
pub const MAX_RETRIES: u32 = 4;

/// Check if a SQLite error is a lock conflict that should be retried
///
/// - SQLITE_BUSY (5)
/// - SQLITE_LOCKED (6)
/// - SQLITE_BUSY_SNAPSHOT (517)
/// - SQLITE_LOCKED_SHAREDCACHE (262)
pub fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string());
            matches!(code.as_deref(), Some("5") | Some("6") | Some("262") | Some("517"))
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// Delays: 100ms, 200ms, 400ms, 800ms
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt.saturating_sub(1)))
}

/// Run `operation`, retrying transient errors with exponential backoff
pub async fn with_retry<F, Fut, T>(operation: F) -> std::result::Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if is_transient_error(&e) && attempts < MAX_RETRIES => {
                attempts += 1;
                let delay = backoff_delay(attempts);
                tracing::debug!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Database busy, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(1), Duration::from_millis(100));
        assert_eq!(backoff_delay(2), Duration::from_millis(200));
        assert_eq!(backoff_delay(4), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_timeout_is_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(sqlx::Error::PoolTimedOut)
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(sqlx::Error::RowNotFound) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
