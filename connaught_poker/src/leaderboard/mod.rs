//! Leaderboard aggregation across completed games.
//!
//! Results from every completed game are summed per player and ranked by
//! total net winnings. Ties go to the player with more games, then to the
//! alphabetically smaller username, so the order is total and stable.
//! Aggregation always runs over the whole population; [`top_n`] truncates
//! afterwards for display.

pub mod aggregate;
pub mod models;

pub use aggregate::{
    build_leaderboard, compare_entries, format_amount, rank_entries, top_n, visible_to,
};
pub use models::{LeaderboardEntry, LeaderboardRow, RankedEntry};
