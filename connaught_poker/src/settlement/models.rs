//! Settlement data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::games::GameId;
use crate::users::UserId;

/// Monetary amount in minor currency units (cents)
pub type Cents = i64;

/// Buy-in ID type
pub type BuyinId = Uuid;

/// Game result ID type
pub type ResultId = Uuid;

/// How far a settled game may drift from zero before it is flagged (one cent)
pub const SETTLEMENT_TOLERANCE_CENTS: Cents = 1;

/// Whether a buy-in has been paid for with real money
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaidStatus {
    #[default]
    Unpaid,
    Pending,
    Paid,
}

impl PaidStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaidStatus::Unpaid => "UNPAID",
            PaidStatus::Pending => "PENDING",
            PaidStatus::Paid => "PAID",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UNPAID" => Some(PaidStatus::Unpaid),
            "PENDING" => Some(PaidStatus::Pending),
            "PAID" => Some(PaidStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chips bought with real money, at the start of a game or as a rebuy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyin {
    pub id: BuyinId,
    pub game_id: GameId,
    pub user_id: UserId,
    pub amount: Cents,
    pub paid_status: PaidStatus,
    pub timestamp: DateTime<Utc>,
    /// Who recorded this buy-in
    pub entered_by: UserId,
}

impl Buyin {
    /// Create an unpaid buy-in stamped with the current time
    pub fn new(game_id: GameId, user_id: UserId, amount: Cents, entered_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            user_id,
            amount,
            paid_status: PaidStatus::Unpaid,
            timestamp: Utc::now(),
            entered_by,
        }
    }
}

/// A player's cash-out at the end of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub id: ResultId,
    pub game_id: GameId,
    pub user_id: UserId,
    pub final_amount: Cents,
    /// `final_amount` minus the player's buy-ins; kept current by settlement
    pub net_winnings: Cents,
    pub timestamp: DateTime<Utc>,
    pub entered_by: UserId,
}

impl GameResult {
    /// Create a result stamped with the current time
    ///
    /// Net winnings start out equal to the final amount, which is correct
    /// for a player without buy-ins; the game service recomputes them
    /// against the recorded buy-ins on every write.
    pub fn new(game_id: GameId, user_id: UserId, final_amount: Cents, entered_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            user_id,
            final_amount,
            net_winnings: final_amount,
            timestamp: Utc::now(),
            entered_by,
        }
    }
}

/// One player's line in a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerNet {
    pub user_id: UserId,
    pub total_buyin: Cents,
    pub final_amount: Cents,
    pub net_winnings: Cents,
}

/// Warning raised when a game's money in and money out do not match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementImbalance {
    pub game_id: Option<GameId>,
    /// Total cashed out minus total bought in
    pub discrepancy: Cents,
    /// Players who bought in but have no recorded result
    pub missing_results: Vec<UserId>,
}

impl std::fmt::Display for SettlementImbalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = if self.discrepancy > 0 {
            "more cashed out than bought in"
        } else {
            "less cashed out than bought in"
        };
        write!(
            f,
            "Settlement off by {} cents ({})",
            self.discrepancy.unsigned_abs(),
            direction
        )?;
        if !self.missing_results.is_empty() {
            write!(
                f,
                "; {} player(s) have no result recorded",
                self.missing_results.len()
            )?;
        }
        Ok(())
    }
}

/// Outcome of settling one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    /// `None` when there were no records at all
    pub game_id: Option<GameId>,
    /// One line per player with a result, ordered by user ID
    pub players: Vec<PlayerNet>,
    pub total_buyins: Cents,
    pub total_cashouts: Cents,
    pub imbalance: Option<SettlementImbalance>,
}

impl Settlement {
    /// True when no imbalance was detected
    pub fn is_balanced(&self) -> bool {
        self.imbalance.is_none()
    }

    /// Net winnings for a player, if they have a result
    pub fn net_for(&self, user_id: UserId) -> Option<Cents> {
        self.players
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.net_winnings)
    }

    /// Sum of all players' net winnings
    pub fn net_sum(&self) -> Cents {
        self.players.iter().map(|p| p.net_winnings).sum()
    }
}
