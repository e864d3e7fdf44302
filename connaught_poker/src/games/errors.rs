//! Game error types.

use super::join_code::JoinCodeError;
use super::models::{GameId, GameStatus};
use crate::db::timeouts::TimeoutError;
use crate::settlement::{BuyinId, Cents, SettlementError};
use crate::users::{UserError, UserId};
use thiserror::Error;

/// Game errors
#[derive(Debug, Error)]
pub enum GameError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query timed out
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// A stored row could not be mapped back to a model
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Game not found
    #[error("Game not found: {0}")]
    NotFound(GameId),

    /// Buy-in not found
    #[error("Buy-in not found: {0}")]
    BuyinNotFound(BuyinId),

    /// No upcoming or running game uses this join code
    #[error("No active game with join code {0}")]
    NoActiveGameForCode(String),

    /// Lifecycle does not allow this status change
    #[error("Cannot move game from {from} to {to}")]
    InvalidTransition { from: GameStatus, to: GameStatus },

    /// Records of a cancelled game cannot change
    #[error("Game {0} is cancelled")]
    GameCancelled(GameId),

    /// Caller may not modify this game
    #[error("Not authorized to modify game {0}")]
    NotAuthorized(GameId),

    /// The participant set names someone other than the caller as host
    #[error("Only the caller can host a game they create")]
    HostMismatch,

    /// User is not a participant of the game
    #[error("User {user_id} is not playing in game {game_id}")]
    NotParticipant { game_id: GameId, user_id: UserId },

    /// Buy-in not positive, or final amount negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(Cents),

    /// Notes exceed the configured length
    #[error("Notes too long: {len} characters, at most {max} allowed")]
    NotesTooLong { len: usize, max: usize },

    /// Another game took the join code between lookup and insert
    #[error("Join code {0} was taken by another game")]
    JoinCodeConflict(String),

    /// A viewer asked for history the owner has hidden
    #[error("Game history of user {0} is private")]
    HistoryHidden(UserId),

    /// Join code generation or parsing failed
    #[error(transparent)]
    JoinCode(#[from] JoinCodeError),

    /// Settlement rejected the game's records
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// User lookup failed
    #[error(transparent)]
    User(#[from] UserError),
}

impl GameError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database details and record IDs are not exposed.
    pub fn client_message(&self) -> String {
        match self {
            GameError::Database(_) | GameError::Timeout(_) | GameError::CorruptRecord(_) => {
                "Internal server error".to_string()
            }
            GameError::NotFound(_) => "Game not found".to_string(),
            GameError::BuyinNotFound(_) => "Buy-in not found".to_string(),
            GameError::GameCancelled(_) => "This game is cancelled".to_string(),
            GameError::NotAuthorized(_) => "Not authorized".to_string(),
            GameError::NotParticipant { .. } => "Player is not in this game".to_string(),
            GameError::HistoryHidden(_) => "This player's history is private".to_string(),
            GameError::JoinCodeConflict(_) => {
                "Could not reserve a join code, please try again".to_string()
            }
            GameError::Settlement(e) => e.client_message(),
            GameError::User(e) => e.client_message(),
            GameError::NoActiveGameForCode(_)
            | GameError::InvalidTransition { .. }
            | GameError::HostMismatch
            | GameError::InvalidAmount(_)
            | GameError::NotesTooLong { .. }
            | GameError::JoinCode(_) => self.to_string(),
        }
    }
}

/// Result type for game operations
pub type GamesResult<T> = Result<T, GameError>;
