//! # Connaught Poker
//!
//! Bookkeeping for a home poker group: games, buy-ins, final amounts,
//! per-game settlement and an all-time leaderboard.
//!
//! The computational core is pure and synchronous:
//!
//! - [`settlement::settle_game`] turns one game's buy-ins and results into
//!   per-player net winnings and flags any imbalance.
//! - [`leaderboard::build_leaderboard`] aggregates net winnings across
//!   completed games and orders the players.
//! - [`games::JoinCodeGenerator`] issues short join codes with a bounded
//!   number of retries on collision.
//!
//! [`games::GameManager`] wraps these in an async service over the
//! repository traits in [`db`], checking lifecycle and permissions and
//! keeping stored net winnings consistent with every write.
//!
//! ## Example
//!
//! ```
//! use connaught_poker::leaderboard::{build_leaderboard, format_amount, LeaderboardRow};
//! use connaught_poker::games::GameStatus;
//! use uuid::Uuid;
//!
//! let (game, alice) = (Uuid::new_v4(), Uuid::new_v4());
//! let rows = vec![LeaderboardRow {
//!     game_id: game,
//!     game_status: GameStatus::Completed,
//!     user_id: alice,
//!     username: "alice".to_string(),
//!     display_name: "Alice".to_string(),
//!     net_winnings: 2_050,
//! }];
//!
//! let board = build_leaderboard(&rows);
//! assert_eq!(format_amount(board[0].total_winnings), "20.50");
//! ```

/// Engine configuration read from the environment.
pub mod config;

/// Connection pool, repositories and query timeouts.
pub mod db;

/// Game lifecycle, join codes and the game service.
pub mod games;

/// Leaderboard aggregation across completed games.
pub mod leaderboard;

/// Per-game settlement.
pub mod settlement;

/// Users and authenticated identities.
pub mod users;

pub use config::{ConfigError, EngineConfig};
pub use games::{Game, GameError, GameId, GameManager, GameStatus, NewGame};
pub use leaderboard::{LeaderboardEntry, RankedEntry};
pub use settlement::{Buyin, Cents, GameResult, Settlement, SettlementError, settle_game};
pub use users::{AuthenticatedUser, UserId};
