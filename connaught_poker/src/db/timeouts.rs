//! Query timeouts for repository calls.
//!
//! Every repository query goes through [`with_timeout`] so a stalled
//! connection surfaces as an error instead of a hung request.

use std::time::Duration;
use tokio::time::timeout;

/// Timeout for single-row and per-game queries
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for queries spanning every game (leaderboard, history)
pub const AGGREGATE_QUERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Error type for timed database operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for timed operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run a database future, failing if it takes longer than `duration`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(TimeoutError::Database),
        Err(_) => {
            log::warn!("Database operation timed out after {duration:?}");
            Err(TimeoutError::Timeout(duration))
        }
    }
}

/// Run a database future with [`DEFAULT_QUERY_TIMEOUT`]
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
