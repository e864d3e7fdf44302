//! Games: lifecycle, participants, join codes and the service that records
//! buy-ins and results.
//!
//! A game moves `UPCOMING -> IN_PROGRESS -> COMPLETED`, or to `CANCELLED`
//! from either open state. Every buy-in or result write recomputes the stored
//! net winnings of the whole game, so stored values always agree with
//! [`crate::settlement::settle_game`].

pub mod errors;
pub mod join_code;
pub mod manager;
pub mod models;

pub use errors::{GameError, GamesResult};
pub use join_code::{
    JOIN_CODE_ALPHABET, JOIN_CODE_LENGTH, JoinCodeError, JoinCodeGenerator, normalize_join_code,
    random_join_code,
};
pub use manager::GameManager;
pub use models::{Game, GameId, GameStatus, HistoryEntry, NewGame, Participant, ParticipantSet};
