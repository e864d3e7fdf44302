//! User data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User ID type
pub type UserId = Uuid;

/// What other players may see about a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub show_total_winnings: bool,
    pub show_game_history: bool,
    pub show_individual_results: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            show_total_winnings: true,
            show_game_history: true,
            show_individual_results: true,
        }
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub is_admin: bool,
    #[serde(flatten)]
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity of the caller, as established by the auth collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    /// Whether this caller may see data that `owner` has hidden
    ///
    /// Owners always see their own data; admins see everything.
    pub fn overrides_privacy_of(&self, owner: UserId) -> bool {
        self.is_admin || self.user_id == owner
    }
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}
