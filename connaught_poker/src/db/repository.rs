//! Repository trait definitions and their PostgreSQL implementations.
//!
//! The game service only talks to storage through these traits, so tests can
//! swap in mock implementations and the service never sees SQL.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use super::timeouts::{AGGREGATE_QUERY_TIMEOUT, TimeoutError, with_default_timeout, with_timeout};
use crate::games::{Game, GameError, GameId, GameStatus, GamesResult, Participant};
use crate::leaderboard::LeaderboardRow;
use crate::settlement::{Buyin, BuyinId, Cents, GameResult, PaidStatus};
use crate::users::{User, UserError, UserId, UserResult, Visibility};

/// Trait for game, buy-in and result storage
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Insert a game together with its initial participants
    ///
    /// Fails with `GameError::JoinCodeConflict` if another active game took
    /// the join code first.
    async fn insert_game(&self, game: &Game, participants: &[UserId]) -> GamesResult<()>;

    /// Find game by ID
    async fn find_game(&self, game_id: GameId) -> GamesResult<Option<Game>>;

    /// Find the upcoming or running game holding a join code
    async fn find_active_by_join_code(&self, code: &str) -> GamesResult<Option<Game>>;

    /// Whether an upcoming or running game holds a join code
    async fn join_code_in_use(&self, code: &str) -> GamesResult<bool>;

    /// Set a game's status
    async fn update_status(&self, game_id: GameId, status: GameStatus) -> GamesResult<()>;

    /// Add a participant; returns false if they were already in the game
    async fn add_participant(&self, game_id: GameId, user_id: UserId) -> GamesResult<bool>;

    /// List a game's participants in joining order
    async fn list_participants(&self, game_id: GameId) -> GamesResult<Vec<Participant>>;

    /// Record a buy-in and the net winnings it changes, atomically
    async fn insert_buyin(
        &self,
        buyin: &Buyin,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<()>;

    /// Find buy-in by ID
    async fn find_buyin(&self, buyin_id: BuyinId) -> GamesResult<Option<Buyin>>;

    /// Change whether a buy-in has been paid
    async fn update_paid_status(&self, buyin_id: BuyinId, status: PaidStatus) -> GamesResult<()>;

    /// List a game's buy-ins
    async fn list_buyins(&self, game_id: GameId) -> GamesResult<Vec<Buyin>>;

    /// Insert a result, or replace the player's existing result for the game
    ///
    /// Other players' net winnings in `net_winnings` are updated in the same
    /// transaction.
    async fn upsert_result(
        &self,
        result: &GameResult,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<GameResult>;

    /// List a game's results
    async fn list_results(&self, game_id: GameId) -> GamesResult<Vec<GameResult>>;

    /// Overwrite stored net winnings for some players of a game
    async fn update_net_winnings(
        &self,
        game_id: GameId,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<()>;

    /// Every result joined with its game's status and the player's names
    async fn leaderboard_rows(&self) -> GamesResult<Vec<LeaderboardRow>>;

    /// A player's results with their games, newest game first
    async fn results_for_user(&self, user_id: UserId) -> GamesResult<Vec<(Game, GameResult)>>;
}

/// Trait for user lookups
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> UserResult<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> UserResult<Option<User>>;

    /// All users ordered by display name, for player selection
    async fn list_users(&self) -> UserResult<Vec<User>>;

    /// Replace a user's visibility flags
    async fn update_visibility(&self, user_id: UserId, visibility: Visibility) -> UserResult<()>;
}

/// Partial unique index keeping join codes unique among active games
const ACTIVE_JOIN_CODE_INDEX: &str = "games_active_join_code_idx";

const GAME_COLUMNS: &str = "id, created_at, game_date, host_id, status, join_code, notes";
const BUYIN_COLUMNS: &str = "id, game_id, user_id, amount, paid_status, timestamp, entered_by";
const RESULT_COLUMNS: &str =
    "id, game_id, user_id, final_amount, net_winnings, timestamp, entered_by";
const USER_COLUMNS: &str = "id, username, display_name, is_admin, show_total_winnings, \
     show_game_history, show_individual_results, created_at, updated_at";

fn parse_status(value: &str) -> GamesResult<GameStatus> {
    GameStatus::parse(value)
        .ok_or_else(|| GameError::CorruptRecord(format!("unknown game status {value:?}")))
}

fn game_from_row(row: &PgRow) -> GamesResult<Game> {
    Ok(Game {
        id: row.try_get("id")?,
        created_at: row.try_get::<NaiveDateTime, _>("created_at")?.and_utc(),
        game_date: row.try_get::<NaiveDateTime, _>("game_date")?.and_utc(),
        host_id: row.try_get("host_id")?,
        status: parse_status(row.try_get("status")?)?,
        join_code: row.try_get("join_code")?,
        notes: row.try_get("notes")?,
    })
}

fn buyin_from_row(row: &PgRow) -> GamesResult<Buyin> {
    let paid_status: &str = row.try_get("paid_status")?;
    Ok(Buyin {
        id: row.try_get("id")?,
        game_id: row.try_get("game_id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        paid_status: PaidStatus::parse(paid_status).ok_or_else(|| {
            GameError::CorruptRecord(format!("unknown paid status {paid_status:?}"))
        })?,
        timestamp: row.try_get::<NaiveDateTime, _>("timestamp")?.and_utc(),
        entered_by: row.try_get("entered_by")?,
    })
}

fn result_from_row(row: &PgRow) -> GamesResult<GameResult> {
    Ok(GameResult {
        id: row.try_get("id")?,
        game_id: row.try_get("game_id")?,
        user_id: row.try_get("user_id")?,
        final_amount: row.try_get("final_amount")?,
        net_winnings: row.try_get("net_winnings")?,
        timestamp: row.try_get::<NaiveDateTime, _>("timestamp")?.and_utc(),
        entered_by: row.try_get("entered_by")?,
    })
}

/// Overwrite stored net winnings inside an open transaction
async fn write_net_winnings(
    conn: &mut PgConnection,
    game_id: GameId,
    net_winnings: &[(UserId, Cents)],
) -> Result<(), sqlx::Error> {
    for (user_id, net) in net_winnings {
        sqlx::query(
            "UPDATE game_results SET net_winnings = $1
             WHERE game_id = $2 AND user_id = $3",
        )
        .bind(net)
        .bind(game_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        is_admin: row.try_get("is_admin")?,
        visibility: Visibility {
            show_total_winnings: row.try_get("show_total_winnings")?,
            show_game_history: row.try_get("show_game_history")?,
            show_individual_results: row.try_get("show_individual_results")?,
        },
        created_at: row.try_get::<NaiveDateTime, _>("created_at")?.and_utc(),
        updated_at: row.try_get::<NaiveDateTime, _>("updated_at")?.and_utc(),
    })
}

/// Default PostgreSQL implementation of `GameRepository`
#[derive(Clone)]
pub struct PgGameRepository {
    pool: PgPool,
}

impl PgGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn insert_game(&self, game: &Game, participants: &[UserId]) -> GamesResult<()> {
        let inserted = with_default_timeout(async {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                "INSERT INTO games (id, created_at, game_date, host_id, status, join_code, notes)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(game.id)
            .bind(game.created_at.naive_utc())
            .bind(game.game_date.naive_utc())
            .bind(game.host_id)
            .bind(game.status.as_str())
            .bind(game.join_code.as_deref())
            .bind(game.notes.as_deref())
            .execute(&mut *tx)
            .await?;

            for user_id in participants {
                sqlx::query(
                    "INSERT INTO game_participants (game_id, user_id, joined_at)
                     VALUES ($1, $2, $3)",
                )
                .bind(game.id)
                .bind(user_id)
                .bind(game.created_at.naive_utc())
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await
        })
        .await;

        match inserted {
            Err(TimeoutError::Database(sqlx::Error::Database(db)))
                if db.constraint() == Some(ACTIVE_JOIN_CODE_INDEX) =>
            {
                Err(GameError::JoinCodeConflict(
                    game.join_code.clone().unwrap_or_default(),
                ))
            }
            other => other.map_err(GameError::from),
        }
    }

    async fn find_game(&self, game_id: GameId) -> GamesResult<Option<Game>> {
        let query = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1");
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(game_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(game_from_row).transpose()
    }

    async fn find_active_by_join_code(&self, code: &str) -> GamesResult<Option<Game>> {
        let query = format!(
            "SELECT {GAME_COLUMNS} FROM games
             WHERE join_code = $1 AND status IN ('UPCOMING', 'IN_PROGRESS')"
        );
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(code)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(game_from_row).transpose()
    }

    async fn join_code_in_use(&self, code: &str) -> GamesResult<bool> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT EXISTS (
                     SELECT 1 FROM games
                     WHERE join_code = $1 AND status IN ('UPCOMING', 'IN_PROGRESS')
                 ) AS in_use",
            )
            .bind(code)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.try_get("in_use")?)
    }

    async fn update_status(&self, game_id: GameId, status: GameStatus) -> GamesResult<()> {
        let result = with_default_timeout(
            sqlx::query("UPDATE games SET status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(game_id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(GameError::NotFound(game_id));
        }
        Ok(())
    }

    async fn add_participant(&self, game_id: GameId, user_id: UserId) -> GamesResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "INSERT INTO game_participants (game_id, user_id, joined_at)
                 VALUES ($1, $2, NOW())
                 ON CONFLICT (game_id, user_id) DO NOTHING",
            )
            .bind(game_id)
            .bind(user_id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_participants(&self, game_id: GameId) -> GamesResult<Vec<Participant>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT game_id, user_id, joined_at FROM game_participants
                 WHERE game_id = $1
                 ORDER BY joined_at, user_id",
            )
            .bind(game_id)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|row| -> GamesResult<Participant> {
                Ok(Participant {
                    game_id: row.try_get("game_id")?,
                    user_id: row.try_get("user_id")?,
                    joined_at: row.try_get::<NaiveDateTime, _>("joined_at")?.and_utc(),
                })
            })
            .collect()
    }

    async fn insert_buyin(
        &self,
        buyin: &Buyin,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<()> {
        with_default_timeout(async {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                "INSERT INTO buyins (id, game_id, user_id, amount, paid_status, timestamp, entered_by)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(buyin.id)
            .bind(buyin.game_id)
            .bind(buyin.user_id)
            .bind(buyin.amount)
            .bind(buyin.paid_status.as_str())
            .bind(buyin.timestamp.naive_utc())
            .bind(buyin.entered_by)
            .execute(&mut *tx)
            .await?;

            write_net_winnings(&mut *tx, buyin.game_id, net_winnings).await?;
            tx.commit().await
        })
        .await?;

        Ok(())
    }

    async fn find_buyin(&self, buyin_id: BuyinId) -> GamesResult<Option<Buyin>> {
        let query = format!("SELECT {BUYIN_COLUMNS} FROM buyins WHERE id = $1");
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(buyin_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(buyin_from_row).transpose()
    }

    async fn update_paid_status(&self, buyin_id: BuyinId, status: PaidStatus) -> GamesResult<()> {
        let result = with_default_timeout(
            sqlx::query("UPDATE buyins SET paid_status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(buyin_id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(GameError::BuyinNotFound(buyin_id));
        }
        Ok(())
    }

    async fn list_buyins(&self, game_id: GameId) -> GamesResult<Vec<Buyin>> {
        let query =
            format!("SELECT {BUYIN_COLUMNS} FROM buyins WHERE game_id = $1 ORDER BY timestamp");
        let rows = with_default_timeout(
            sqlx::query(&query)
                .bind(game_id)
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(buyin_from_row).collect()
    }

    async fn upsert_result(
        &self,
        result: &GameResult,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<GameResult> {
        let query = format!(
            "INSERT INTO game_results (id, game_id, user_id, final_amount, net_winnings, timestamp, entered_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (game_id, user_id) DO UPDATE SET
                final_amount = EXCLUDED.final_amount,
                net_winnings = EXCLUDED.net_winnings,
                timestamp = EXCLUDED.timestamp,
                entered_by = EXCLUDED.entered_by
             RETURNING {RESULT_COLUMNS}"
        );
        let row = with_default_timeout(async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(&query)
                .bind(result.id)
                .bind(result.game_id)
                .bind(result.user_id)
                .bind(result.final_amount)
                .bind(result.net_winnings)
                .bind(result.timestamp.naive_utc())
                .bind(result.entered_by)
                .fetch_one(&mut *tx)
                .await?;

            write_net_winnings(&mut *tx, result.game_id, net_winnings).await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(row)
        })
        .await?;

        result_from_row(&row)
    }

    async fn list_results(&self, game_id: GameId) -> GamesResult<Vec<GameResult>> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} FROM game_results WHERE game_id = $1 ORDER BY timestamp"
        );
        let rows = with_default_timeout(
            sqlx::query(&query)
                .bind(game_id)
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(result_from_row).collect()
    }

    async fn update_net_winnings(
        &self,
        game_id: GameId,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<()> {
        if net_winnings.is_empty() {
            return Ok(());
        }

        with_default_timeout(async {
            let mut tx = self.pool.begin().await?;
            write_net_winnings(&mut *tx, game_id, net_winnings).await?;
            tx.commit().await
        })
        .await?;

        Ok(())
    }

    async fn leaderboard_rows(&self) -> GamesResult<Vec<LeaderboardRow>> {
        let rows = with_timeout(
            AGGREGATE_QUERY_TIMEOUT,
            sqlx::query(
                "SELECT r.game_id, g.status, r.user_id, u.username, u.display_name, r.net_winnings
                 FROM game_results r
                 JOIN games g ON g.id = r.game_id
                 JOIN users u ON u.id = r.user_id",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|row| -> GamesResult<LeaderboardRow> {
                Ok(LeaderboardRow {
                    game_id: row.try_get("game_id")?,
                    game_status: parse_status(row.try_get("status")?)?,
                    user_id: row.try_get("user_id")?,
                    username: row.try_get("username")?,
                    display_name: row.try_get("display_name")?,
                    net_winnings: row.try_get("net_winnings")?,
                })
            })
            .collect()
    }

    async fn results_for_user(&self, user_id: UserId) -> GamesResult<Vec<(Game, GameResult)>> {
        let rows = with_timeout(
            AGGREGATE_QUERY_TIMEOUT,
            sqlx::query(
                "SELECT g.id, g.created_at, g.game_date, g.host_id, g.status, g.join_code, g.notes,
                        r.id AS result_id, r.final_amount, r.net_winnings,
                        r.timestamp AS result_timestamp, r.entered_by
                 FROM game_results r
                 JOIN games g ON g.id = r.game_id
                 WHERE r.user_id = $1
                 ORDER BY g.game_date DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|row| -> GamesResult<(Game, GameResult)> {
                let game = game_from_row(row)?;
                let result = GameResult {
                    id: row.try_get("result_id")?,
                    game_id: game.id,
                    user_id,
                    final_amount: row.try_get("final_amount")?,
                    net_winnings: row.try_get("net_winnings")?,
                    timestamp: row
                        .try_get::<NaiveDateTime, _>("result_timestamp")?
                        .and_utc(),
                    entered_by: row.try_get("entered_by")?,
                };
                Ok((game, result))
            })
            .collect()
    }
}

/// Default PostgreSQL implementation of `UserRepository`
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: UserId) -> UserResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_username(&self, username: &str) -> UserResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(username)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn list_users(&self) -> UserResult<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY display_name, username");
        let rows = with_default_timeout(sqlx::query(&query).fetch_all(&self.pool)).await?;

        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()?)
    }

    async fn update_visibility(&self, user_id: UserId, visibility: Visibility) -> UserResult<()> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE users
                 SET show_total_winnings = $1, show_game_history = $2,
                     show_individual_results = $3, updated_at = NOW()
                 WHERE id = $4",
            )
            .bind(visibility.show_total_winnings)
            .bind(visibility.show_game_history)
            .bind(visibility.show_individual_results)
            .bind(user_id)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(user_id));
        }
        Ok(())
    }
}
