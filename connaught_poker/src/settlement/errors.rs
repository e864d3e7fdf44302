//! Settlement error types.

use super::models::Cents;
use crate::games::GameId;
use crate::users::UserId;
use thiserror::Error;

/// Settlement errors
///
/// An unbalanced game is not an error; see `SettlementImbalance`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// More than one result row for the same player in the same game
    #[error("Duplicate result for user {user_id} in game {game_id}")]
    DuplicateResult { game_id: GameId, user_id: UserId },

    /// Records from more than one game were passed in
    #[error("Records span more than one game: {expected} and {found}")]
    MixedGames { expected: GameId, found: GameId },

    /// Buy-in not positive, or final amount negative
    #[error("Invalid amount {amount} for user {user_id}")]
    InvalidAmount { user_id: UserId, amount: Cents },

    /// Totals exceeded the representable range
    #[error("Amount overflow while settling game")]
    AmountOverflow,
}

impl SettlementError {
    /// Get a client-safe error message without game or user IDs
    pub fn client_message(&self) -> String {
        match self {
            SettlementError::DuplicateResult { .. } => {
                "A player has more than one result recorded for this game".to_string()
            }
            SettlementError::MixedGames { .. } => "Records belong to different games".to_string(),
            SettlementError::InvalidAmount { amount, .. } => format!("Invalid amount {amount}"),
            SettlementError::AmountOverflow => self.to_string(),
        }
    }
}

/// Result type for settlement operations
pub type SettlementResult<T> = Result<T, SettlementError>;
