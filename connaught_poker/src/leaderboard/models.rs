//! Leaderboard data models.

use serde::{Deserialize, Serialize};

use crate::games::{GameId, GameStatus};
use crate::settlement::Cents;
use crate::users::UserId;

/// One game result joined with its game's status and the player's names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub game_id: GameId,
    pub game_status: GameStatus,
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub net_winnings: Cents,
}

/// A player's standing across all completed games
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub username: String,
    pub total_winnings: Cents,
    pub games_played: u32,
}

impl LeaderboardEntry {
    /// Average net winnings per game, rounded to the nearest cent
    ///
    /// Zero for a player without games.
    pub fn average_per_game(&self) -> Cents {
        if self.games_played == 0 {
            return 0;
        }
        (self.total_winnings as f64 / f64::from(self.games_played)).round() as Cents
    }
}

/// Leaderboard entry with its 1-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}
