//! Game data models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settlement::Cents;
use crate::users::UserId;

/// Game ID type
pub type GameId = Uuid;

/// Game lifecycle status
///
/// ```text
/// UPCOMING -> IN_PROGRESS -> COMPLETED
///     \            \
///      +------------+-> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Upcoming,
    InProgress,
    Completed,
    Cancelled,
}

impl GameStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Upcoming => "UPCOMING",
            GameStatus::InProgress => "IN_PROGRESS",
            GameStatus::Completed => "COMPLETED",
            GameStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UPCOMING" => Some(GameStatus::Upcoming),
            "IN_PROGRESS" => Some(GameStatus::InProgress),
            "COMPLETED" => Some(GameStatus::Completed),
            "CANCELLED" => Some(GameStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled games never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Completed | GameStatus::Cancelled)
    }

    /// Active games hold their join code exclusively
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: GameStatus) -> bool {
        matches!(
            (*self, next),
            (GameStatus::Upcoming, GameStatus::InProgress)
                | (GameStatus::InProgress, GameStatus::Completed)
                | (GameStatus::Upcoming, GameStatus::Cancelled)
                | (GameStatus::InProgress, GameStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub created_at: DateTime<Utc>,
    /// When the game is scheduled or was played
    pub game_date: DateTime<Utc>,
    pub host_id: UserId,
    pub status: GameStatus,
    pub join_code: Option<String>,
    pub notes: Option<String>,
}

/// A user's membership in a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub game_id: GameId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

/// The players selected for a new game
///
/// The host is a member from construction and cannot be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSet {
    host: UserId,
    members: BTreeSet<UserId>,
}

impl ParticipantSet {
    /// Create a set containing only the host
    pub fn new(host: UserId) -> Self {
        Self {
            host,
            members: BTreeSet::from([host]),
        }
    }

    /// Add several players at once
    pub fn with_players(mut self, players: impl IntoIterator<Item = UserId>) -> Self {
        self.members.extend(players);
        self
    }

    /// Select a player if unselected, deselect if selected
    ///
    /// Toggling the host does nothing. Returns whether the user is selected
    /// afterwards.
    pub fn toggle(&mut self, user_id: UserId) -> bool {
        if user_id == self.host {
            return true;
        }
        if !self.members.remove(&user_id) {
            self.members.insert(user_id);
            return true;
        }
        false
    }

    pub fn host(&self) -> UserId {
        self.host
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: the host is a member
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.members.iter().copied()
    }
}

/// Request to create a game
#[derive(Debug, Clone)]
pub struct NewGame {
    pub game_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub participants: ParticipantSet,
    /// Generate a join code so others can join without an invitation
    pub with_join_code: bool,
}

impl NewGame {
    /// A game hosted by `host` with a join code and no other players yet
    pub fn hosted_by(host: UserId, game_date: DateTime<Utc>) -> Self {
        Self {
            game_date,
            notes: None,
            participants: ParticipantSet::new(host),
            with_join_code: true,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_players(mut self, players: impl IntoIterator<Item = UserId>) -> Self {
        self.participants = self.participants.with_players(players);
        self
    }

    pub fn without_join_code(mut self) -> Self {
        self.with_join_code = false;
        self
    }
}

/// A game in a user's history, with the result hidden if they chose so
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub game_id: GameId,
    pub game_date: DateTime<Utc>,
    pub net_winnings: Option<Cents>,
}
