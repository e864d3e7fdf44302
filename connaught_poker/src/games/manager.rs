//! Game service implementation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use super::{
    errors::{GameError, GamesResult},
    join_code::{JoinCodeGenerator, normalize_join_code},
    models::{Game, GameId, GameStatus, HistoryEntry, NewGame, Participant},
};
use crate::config::EngineConfig;
use crate::db::repository::{GameRepository, UserRepository};
use crate::leaderboard::{RankedEntry, build_leaderboard, rank_entries, top_n, visible_to};
use crate::settlement::{
    Buyin, BuyinId, Cents, GameResult, PaidStatus, Settlement, settle_game_with_tolerance,
};
use crate::users::{AuthenticatedUser, User, UserError, UserId, Visibility};

/// Game manager
///
/// Holds no state of its own beyond configuration; everything lives in the
/// repositories, so clones share the same store.
pub struct GameManager<G, U> {
    games: Arc<G>,
    users: Arc<U>,
    config: EngineConfig,
}

impl<G, U> Clone for GameManager<G, U> {
    fn clone(&self) -> Self {
        Self {
            games: Arc::clone(&self.games),
            users: Arc::clone(&self.users),
            config: self.config.clone(),
        }
    }
}

impl<G: GameRepository, U: UserRepository> GameManager<G, U> {
    /// Create a new game manager
    ///
    /// # Arguments
    ///
    /// * `games` - Game, buy-in and result storage
    /// * `users` - User lookups
    /// * `config` - Engine configuration
    pub fn new(games: Arc<G>, users: Arc<U>, config: EngineConfig) -> Self {
        Self {
            games,
            users,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a game hosted by the caller
    ///
    /// # Arguments
    ///
    /// * `caller` - Authenticated user, becomes the host
    /// * `request` - Date, notes, selected players and whether to issue a join code
    ///
    /// # Returns
    ///
    /// * `GamesResult<Game>` - The stored game, status `UPCOMING`
    ///
    /// # Errors
    ///
    /// * `GameError::HostMismatch` - The participant set is hosted by someone else
    /// * `GameError::NotesTooLong` - Notes exceed the configured length
    /// * `GameError::JoinCode` - No unused join code found; nothing was stored
    pub async fn create_game(
        &self,
        caller: &AuthenticatedUser,
        request: NewGame,
    ) -> GamesResult<Game> {
        if request.participants.host() != caller.user_id {
            return Err(GameError::HostMismatch);
        }

        let notes = self.clean_notes(request.notes)?;
        let mut game = Game {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            game_date: request.game_date,
            host_id: caller.user_id,
            status: GameStatus::Upcoming,
            join_code: None,
            notes,
        };
        let participants: Vec<UserId> = request.participants.iter().collect();

        if request.with_join_code {
            let code = self.insert_with_join_code(&game, &participants).await?;
            game.join_code = Some(code);
        } else {
            self.games.insert_game(&game, &participants).await?;
        }

        log::info!(
            "User {} created game {} with {} players",
            caller.username,
            game.id,
            participants.len()
        );

        Ok(game)
    }

    /// Join an upcoming or running game by its join code
    ///
    /// Joining a game twice is not an error.
    ///
    /// # Errors
    ///
    /// * `GameError::JoinCode` - The code is malformed
    /// * `GameError::NoActiveGameForCode` - No open game uses the code
    pub async fn join_by_code(&self, caller: &AuthenticatedUser, code: &str) -> GamesResult<Game> {
        let code = normalize_join_code(code)?;
        let game = self
            .games
            .find_active_by_join_code(&code)
            .await?
            .ok_or_else(|| GameError::NoActiveGameForCode(code.clone()))?;

        if self.games.add_participant(game.id, caller.user_id).await? {
            log::info!("User {} joined game {} by code", caller.username, game.id);
        }

        Ok(game)
    }

    /// Get a game by ID
    pub async fn game(&self, game_id: GameId) -> GamesResult<Game> {
        self.games
            .find_game(game_id)
            .await?
            .ok_or(GameError::NotFound(game_id))
    }

    /// List a game's participants
    pub async fn participants(&self, game_id: GameId) -> GamesResult<Vec<Participant>> {
        self.game(game_id).await?;
        self.games.list_participants(game_id).await
    }

    /// Every user, ordered by display name, for picking players
    pub async fn players(&self) -> GamesResult<Vec<User>> {
        Ok(self.users.list_users().await?)
    }

    /// Move an upcoming game to in progress
    pub async fn start_game(
        &self,
        caller: &AuthenticatedUser,
        game_id: GameId,
    ) -> GamesResult<Game> {
        self.transition(caller, game_id, GameStatus::InProgress).await
    }

    /// Cancel an upcoming or running game
    ///
    /// Its join code is released and its records are frozen.
    pub async fn cancel_game(
        &self,
        caller: &AuthenticatedUser,
        game_id: GameId,
    ) -> GamesResult<Game> {
        self.transition(caller, game_id, GameStatus::Cancelled).await
    }

    /// Settle a running game and mark it completed
    ///
    /// # Returns
    ///
    /// * `GamesResult<(Game, Settlement)>` - The completed game and its
    ///   settlement; an imbalance is reported, not rejected
    ///
    /// # Errors
    ///
    /// * `GameError::NotAuthorized` - Caller is neither host nor admin
    /// * `GameError::InvalidTransition` - Game is not in progress
    /// * `GameError::Settlement` - Records cannot be settled; the game stays open
    pub async fn complete_game(
        &self,
        caller: &AuthenticatedUser,
        game_id: GameId,
    ) -> GamesResult<(Game, Settlement)> {
        let game = self.game(game_id).await?;
        Self::ensure_host_or_admin(caller, &game)?;
        Self::ensure_transition(&game, GameStatus::Completed)?;

        let settlement = self.recompute_net_winnings(game_id).await?;
        let game = self.set_status(caller, game, GameStatus::Completed).await?;

        if let Some(imbalance) = &settlement.imbalance {
            log::warn!("Completed unbalanced game: {imbalance}");
        }

        Ok((game, settlement))
    }

    /// Record a buy-in or rebuy
    ///
    /// # Arguments
    ///
    /// * `caller` - Host, admin, or the buying player
    /// * `game_id` - Game ID
    /// * `user_id` - Player buying in
    /// * `amount` - Amount in cents, must be positive
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidAmount` - Amount not positive
    /// * `GameError::GameCancelled` - Game is cancelled
    /// * `GameError::NotAuthorized` - Caller may not record for this player
    /// * `GameError::NotParticipant` - Player is not in the game
    /// * `GameError::Settlement` - The game's records cannot be settled; nothing is stored
    pub async fn record_buyin(
        &self,
        caller: &AuthenticatedUser,
        game_id: GameId,
        user_id: UserId,
        amount: Cents,
    ) -> GamesResult<Buyin> {
        if amount <= 0 {
            return Err(GameError::InvalidAmount(amount));
        }

        let game = self.game(game_id).await?;
        Self::ensure_writable(&game)?;
        if caller.user_id != user_id {
            Self::ensure_host_or_admin(caller, &game)?;
        }
        self.ensure_participant(game_id, user_id).await?;

        let buyin = Buyin::new(game_id, user_id, amount, caller.user_id);

        let mut buyins = self.games.list_buyins(game_id).await?;
        let results = self.games.list_results(game_id).await?;
        buyins.push(buyin.clone());
        let (_, stale) = self.plan_write(&buyins, &results)?;

        self.games.insert_buyin(&buyin, &stale).await?;

        log::info!(
            "Recorded buy-in of {} cents for {} in game {}",
            amount,
            user_id,
            game_id
        );

        Ok(buyin)
    }

    /// Mark a buy-in unpaid, pending or paid
    ///
    /// Only the host or an admin may change payment state. Net winnings do
    /// not depend on it.
    pub async fn update_paid_status(
        &self,
        caller: &AuthenticatedUser,
        buyin_id: BuyinId,
        status: PaidStatus,
    ) -> GamesResult<Buyin> {
        let mut buyin = self
            .games
            .find_buyin(buyin_id)
            .await?
            .ok_or(GameError::BuyinNotFound(buyin_id))?;

        let game = self.game(buyin.game_id).await?;
        Self::ensure_writable(&game)?;
        Self::ensure_host_or_admin(caller, &game)?;

        self.games.update_paid_status(buyin_id, status).await?;
        buyin.paid_status = status;

        log::debug!("Buy-in {buyin_id} marked {status}");

        Ok(buyin)
    }

    /// Record a player's final amount, replacing any earlier result
    ///
    /// # Returns
    ///
    /// * `GamesResult<GameResult>` - The stored result with its net winnings
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidAmount` - Final amount negative
    /// * `GameError::GameCancelled` - Game is cancelled
    /// * `GameError::NotAuthorized` - Caller is neither host nor admin
    /// * `GameError::NotParticipant` - Player is not in the game
    /// * `GameError::Settlement` - The game's records cannot be settled; nothing is stored
    pub async fn record_result(
        &self,
        caller: &AuthenticatedUser,
        game_id: GameId,
        user_id: UserId,
        final_amount: Cents,
    ) -> GamesResult<GameResult> {
        if final_amount < 0 {
            return Err(GameError::InvalidAmount(final_amount));
        }

        let game = self.game(game_id).await?;
        Self::ensure_writable(&game)?;
        Self::ensure_host_or_admin(caller, &game)?;
        self.ensure_participant(game_id, user_id).await?;

        let mut result = GameResult::new(game_id, user_id, final_amount, caller.user_id);

        let buyins = self.games.list_buyins(game_id).await?;
        let mut results = self.games.list_results(game_id).await?;
        match results.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => *existing = result.clone(),
            None => results.push(result.clone()),
        }
        let (settlement, stale) = self.plan_write(&buyins, &results)?;
        if let Some(net) = settlement.net_for(user_id) {
            result.net_winnings = net;
        }

        let stale: Vec<(UserId, Cents)> =
            stale.into_iter().filter(|(id, _)| *id != user_id).collect();
        let stored = self.games.upsert_result(&result, &stale).await?;

        log::info!(
            "Recorded final amount of {} cents for {} in game {}",
            final_amount,
            user_id,
            game_id
        );

        Ok(stored)
    }

    /// Settle a game from its stored buy-ins and results
    pub async fn settle(&self, game_id: GameId) -> GamesResult<Settlement> {
        self.game(game_id).await?;
        let buyins = self.games.list_buyins(game_id).await?;
        let results = self.games.list_results(game_id).await?;

        Ok(settle_game_with_tolerance(
            &buyins,
            &results,
            self.config.settlement_tolerance,
        )?)
    }

    /// Settle a game and write back any net winnings that changed
    pub async fn recompute_net_winnings(&self, game_id: GameId) -> GamesResult<Settlement> {
        let buyins = self.games.list_buyins(game_id).await?;
        let results = self.games.list_results(game_id).await?;
        let (settlement, stale) = self.plan_write(&buyins, &results)?;

        if !stale.is_empty() {
            self.games.update_net_winnings(game_id, &stale).await?;
            log::debug!(
                "Updated net winnings of {} players in game {}",
                stale.len(),
                game_id
            );
        }

        Ok(settlement)
    }

    /// Leaderboard over all completed games as seen by `viewer`
    ///
    /// # Arguments
    ///
    /// * `viewer` - Authenticated user; hidden totals are shown to their owner and admins
    /// * `limit` - Number of entries, defaults to the configured leaderboard limit
    pub async fn leaderboard(
        &self,
        viewer: &AuthenticatedUser,
        limit: Option<usize>,
    ) -> GamesResult<Vec<RankedEntry>> {
        let rows = self.games.leaderboard_rows().await?;
        let visibility: HashMap<UserId, Visibility> = self
            .users
            .list_users()
            .await?
            .into_iter()
            .map(|user| (user.id, user.visibility))
            .collect();

        let entries = visible_to(build_leaderboard(&rows), viewer, &visibility);
        let limit = limit.unwrap_or(self.config.leaderboard_limit);

        Ok(rank_entries(top_n(entries, limit)))
    }

    /// A player's completed games, newest first
    ///
    /// # Errors
    ///
    /// * `GameError::User` - No such user
    /// * `GameError::HistoryHidden` - The player hides their history from `viewer`
    pub async fn game_history(
        &self,
        viewer: &AuthenticatedUser,
        user_id: UserId,
    ) -> GamesResult<Vec<HistoryEntry>> {
        let owner = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound(user_id))?;

        let privileged = viewer.overrides_privacy_of(user_id);
        if !privileged && !owner.visibility.show_game_history {
            return Err(GameError::HistoryHidden(user_id));
        }
        let show_results = privileged || owner.visibility.show_individual_results;

        let history = self
            .games
            .results_for_user(user_id)
            .await?
            .into_iter()
            .filter(|(game, _)| game.status == GameStatus::Completed)
            .map(|(game, result)| HistoryEntry {
                game_id: game.id,
                game_date: game.game_date,
                net_winnings: show_results.then_some(result.net_winnings),
            })
            .collect();

        Ok(history)
    }

    /// Settle records as they will be stored and list the net winnings that change
    ///
    /// Runs before any write, so records that cannot be settled are never stored.
    fn plan_write(
        &self,
        buyins: &[Buyin],
        results: &[GameResult],
    ) -> GamesResult<(Settlement, Vec<(UserId, Cents)>)> {
        let settlement =
            settle_game_with_tolerance(buyins, results, self.config.settlement_tolerance)?;

        let stale = results
            .iter()
            .filter_map(|result| {
                settlement
                    .net_for(result.user_id)
                    .filter(|net| *net != result.net_winnings)
                    .map(|net| (result.user_id, net))
            })
            .collect();

        Ok((settlement, stale))
    }

    /// Insert `game` under a fresh join code and return the code
    ///
    /// A code counts as taken when the lookup finds it or when the insert
    /// loses it to a game created concurrently. Both share one attempt budget.
    async fn insert_with_join_code(
        &self,
        game: &Game,
        participants: &[UserId],
    ) -> GamesResult<String> {
        let mut generator = JoinCodeGenerator::with_rng(StdRng::from_os_rng())
            .with_max_attempts(self.config.join_code_max_attempts);
        let games = &self.games;

        generator
            .generate_unique_async(|code| {
                let mut candidate = game.clone();
                async move {
                    if games.join_code_in_use(&code).await? {
                        return Ok::<_, GameError>(true);
                    }
                    candidate.join_code = Some(code);
                    match games.insert_game(&candidate, participants).await {
                        Ok(()) => Ok(false),
                        Err(GameError::JoinCodeConflict(code)) => {
                            log::debug!("Join code {code} taken by a concurrent game");
                            Ok(true)
                        }
                        Err(e) => Err(e),
                    }
                }
            })
            .await
    }

    async fn transition(
        &self,
        caller: &AuthenticatedUser,
        game_id: GameId,
        next: GameStatus,
    ) -> GamesResult<Game> {
        let game = self.game(game_id).await?;
        Self::ensure_host_or_admin(caller, &game)?;
        Self::ensure_transition(&game, next)?;
        self.set_status(caller, game, next).await
    }

    async fn set_status(
        &self,
        caller: &AuthenticatedUser,
        mut game: Game,
        next: GameStatus,
    ) -> GamesResult<Game> {
        self.games.update_status(game.id, next).await?;

        log::info!(
            "Game {} moved from {} to {} by {}",
            game.id,
            game.status,
            next,
            caller.username
        );

        game.status = next;
        Ok(game)
    }

    async fn ensure_participant(&self, game_id: GameId, user_id: UserId) -> GamesResult<()> {
        let participants = self.games.list_participants(game_id).await?;
        if participants.iter().any(|p| p.user_id == user_id) {
            Ok(())
        } else {
            Err(GameError::NotParticipant { game_id, user_id })
        }
    }

    /// Trim notes, treating blank notes as none
    fn clean_notes(&self, notes: Option<String>) -> GamesResult<Option<String>> {
        let Some(notes) = notes else {
            return Ok(None);
        };
        let trimmed = notes.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let len = trimmed.chars().count();
        if len > self.config.max_notes_length {
            return Err(GameError::NotesTooLong {
                len,
                max: self.config.max_notes_length,
            });
        }

        Ok(Some(trimmed.to_string()))
    }

    fn ensure_host_or_admin(caller: &AuthenticatedUser, game: &Game) -> GamesResult<()> {
        if caller.is_admin || caller.user_id == game.host_id {
            Ok(())
        } else {
            Err(GameError::NotAuthorized(game.id))
        }
    }

    fn ensure_transition(game: &Game, next: GameStatus) -> GamesResult<()> {
        if game.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(GameError::InvalidTransition {
                from: game.status,
                to: next,
            })
        }
    }

    fn ensure_writable(game: &Game) -> GamesResult<()> {
        if game.status == GameStatus::Cancelled {
            Err(GameError::GameCancelled(game.id))
        } else {
            Ok(())
        }
    }
}
