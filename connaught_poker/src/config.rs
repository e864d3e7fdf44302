//! Engine configuration management.
//!
//! Consolidates the environment variable reads that tune settlement,
//! leaderboard and join-code behaviour, and validates them.

use crate::games::join_code::DEFAULT_MAX_ATTEMPTS;
use crate::settlement::{Cents, SETTLEMENT_TOLERANCE_CENTS};

/// Default number of leaderboard entries handed to the presentation layer
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

/// Default maximum length of free-form game notes
pub const DEFAULT_MAX_NOTES_LENGTH: usize = 1000;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of entries returned by the leaderboard (top-N)
    pub leaderboard_limit: usize,
    /// Attempts made to find an unused join code before giving up
    pub join_code_max_attempts: u32,
    /// Allowed deviation from zero when checking a settlement, in cents
    pub settlement_tolerance: Cents,
    /// Maximum length of game notes in characters
    pub max_notes_length: usize,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Recognised variables:
    /// - `LEADERBOARD_LIMIT` (default: 50)
    /// - `JOIN_CODE_MAX_ATTEMPTS` (default: 5)
    /// - `SETTLEMENT_TOLERANCE_CENTS` (default: 1)
    /// - `MAX_NOTES_LENGTH` (default: 1000)
    ///
    /// Unparseable values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a parsed value fails validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            leaderboard_limit: parse_env_or("LEADERBOARD_LIMIT", DEFAULT_LEADERBOARD_LIMIT),
            join_code_max_attempts: parse_env_or("JOIN_CODE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            settlement_tolerance: parse_env_or(
                "SETTLEMENT_TOLERANCE_CENTS",
                SETTLEMENT_TOLERANCE_CENTS,
            ),
            max_notes_length: parse_env_or("MAX_NOTES_LENGTH", DEFAULT_MAX_NOTES_LENGTH),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leaderboard_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "LEADERBOARD_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.join_code_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "JOIN_CODE_MAX_ATTEMPTS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.settlement_tolerance < 0 {
            return Err(ConfigError::Invalid {
                var: "SETTLEMENT_TOLERANCE_CENTS".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        if self.max_notes_length == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_NOTES_LENGTH".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            join_code_max_attempts: DEFAULT_MAX_ATTEMPTS,
            settlement_tolerance: SETTLEMENT_TOLERANCE_CENTS,
            max_notes_length: DEFAULT_MAX_NOTES_LENGTH,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
pub(crate) fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
