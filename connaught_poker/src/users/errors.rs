//! User error types.

use super::models::UserId;
use crate::db::timeouts::TimeoutError;
use thiserror::Error;

/// User errors
#[derive(Debug, Error)]
pub enum UserError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query timed out
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// User not found
    #[error("User not found: {0}")]
    NotFound(UserId),
}

impl UserError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            UserError::Database(_) | UserError::Timeout(_) => "Internal server error".to_string(),
            UserError::NotFound(_) => "User not found".to_string(),
        }
    }
}

/// Result type for user operations
pub type UserResult<T> = Result<T, UserError>;
