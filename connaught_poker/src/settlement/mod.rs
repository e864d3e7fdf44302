//! Per-game settlement: buy-ins, final amounts and net winnings.
//!
//! Settlement is a pure computation over a snapshot of one game's records.
//! Every buy-in a player makes (including rebuys) is summed, and the
//! player's net winnings are their final amount minus that total. A home
//! game is zero-sum, so the net winnings of a fully recorded game add up to
//! nothing; any deviation is reported as a [`SettlementImbalance`] for the
//! host to acknowledge rather than treated as a failure.
//!
//! ## Example
//!
//! ```
//! use connaught_poker::settlement::{settle_game, Buyin, GameResult};
//! use uuid::Uuid;
//!
//! let (game, alice, bob) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
//! let buyins = vec![
//!     Buyin::new(game, alice, 5_000, alice),
//!     Buyin::new(game, bob, 5_000, alice),
//! ];
//! let results = vec![
//!     GameResult::new(game, alice, 7_500, alice),
//!     GameResult::new(game, bob, 2_500, alice),
//! ];
//!
//! let settlement = settle_game(&buyins, &results).unwrap();
//! assert_eq!(settlement.net_for(alice), Some(2_500));
//! assert_eq!(settlement.net_for(bob), Some(-2_500));
//! assert!(settlement.is_balanced());
//! ```

pub mod engine;
pub mod errors;
pub mod models;

pub use engine::{settle_game, settle_game_with_tolerance};
pub use errors::{SettlementError, SettlementResult};
pub use models::{
    Buyin, BuyinId, Cents, GameResult, PaidStatus, PlayerNet, ResultId, SETTLEMENT_TOLERANCE_CENTS,
    Settlement, SettlementImbalance,
};
