//! In-memory repositories shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use connaught_poker::config::EngineConfig;
use connaught_poker::db::{GameRepository, UserRepository};
use connaught_poker::games::{
    Game, GameError, GameId, GameManager, GameStatus, GamesResult, Participant,
};
use connaught_poker::leaderboard::LeaderboardRow;
use connaught_poker::settlement::{Buyin, BuyinId, Cents, GameResult, PaidStatus};
use connaught_poker::users::{AuthenticatedUser, User, UserError, UserId, UserResult, Visibility};
use uuid::Uuid;

pub type TestManager = GameManager<MemoryGameRepository, MemoryUserRepository>;

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl MemoryUserRepository {
    /// Register a user and return their identity
    pub fn add(&self, username: &str, is_admin: bool) -> AuthenticatedUser {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: username.to_uppercase(),
            is_admin,
            visibility: Visibility::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let identity = AuthenticatedUser::from(&user);
        self.users.lock().unwrap().push(user);
        identity
    }

    fn get(&self, user_id: UserId) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, user_id: UserId) -> UserResult<Option<User>> {
        Ok(self.get(user_id))
    }

    async fn find_by_username(&self, username: &str) -> UserResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> UserResult<Vec<User>> {
        let mut users = self.users.lock().unwrap().clone();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(users)
    }

    async fn update_visibility(&self, user_id: UserId, visibility: Visibility) -> UserResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(UserError::NotFound(user_id))?;
        user.visibility = visibility;
        Ok(())
    }
}

#[derive(Default)]
struct Store {
    games: HashMap<GameId, Game>,
    participants: Vec<Participant>,
    buyins: Vec<Buyin>,
    results: Vec<GameResult>,
}

pub struct MemoryGameRepository {
    store: Mutex<Store>,
    users: Arc<MemoryUserRepository>,
    all_codes_taken: AtomicBool,
    code_lookups: AtomicUsize,
    racing_inserts: AtomicUsize,
}

impl MemoryGameRepository {
    pub fn new(users: Arc<MemoryUserRepository>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            users,
            all_codes_taken: AtomicBool::new(false),
            code_lookups: AtomicUsize::new(0),
            racing_inserts: AtomicUsize::new(0),
        }
    }

    /// Make every join code look like it belongs to an active game
    pub fn take_all_codes(&self) {
        self.all_codes_taken.store(true, Ordering::SeqCst);
    }

    /// Make the next `n` game inserts lose their join code to a concurrent
    /// creation after the availability check passed
    pub fn race_next_inserts(&self, n: usize) {
        self.racing_inserts.store(n, Ordering::SeqCst);
    }

    pub fn code_lookups(&self) -> usize {
        self.code_lookups.load(Ordering::SeqCst)
    }

    pub fn game_count(&self) -> usize {
        self.store.lock().unwrap().games.len()
    }

    pub fn buyin_count(&self, game_id: GameId) -> usize {
        self.store
            .lock()
            .unwrap()
            .buyins
            .iter()
            .filter(|b| b.game_id == game_id)
            .count()
    }

    /// Store a result without the (game, user) uniqueness check
    pub fn push_raw_result(&self, result: GameResult) {
        self.store.lock().unwrap().results.push(result);
    }

    pub fn stored_net(&self, game_id: GameId, user_id: UserId) -> Option<Cents> {
        self.store
            .lock()
            .unwrap()
            .results
            .iter()
            .find(|r| r.game_id == game_id && r.user_id == user_id)
            .map(|r| r.net_winnings)
    }
}

fn apply_net_winnings(store: &mut Store, game_id: GameId, net_winnings: &[(UserId, Cents)]) {
    for (user_id, net) in net_winnings {
        for result in store
            .results
            .iter_mut()
            .filter(|r| r.game_id == game_id && r.user_id == *user_id)
        {
            result.net_winnings = *net;
        }
    }
}

fn active_code_holder<'a>(store: &'a Store, code: &str) -> Option<&'a Game> {
    store
        .games
        .values()
        .find(|g| g.status.is_active() && g.join_code.as_deref() == Some(code))
}

#[async_trait]
impl GameRepository for MemoryGameRepository {
    async fn insert_game(&self, game: &Game, participants: &[UserId]) -> GamesResult<()> {
        let mut store = self.store.lock().unwrap();
        if let Some(code) = game.join_code.as_deref() {
            let raced = self
                .racing_inserts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if raced || active_code_holder(&store, code).is_some() {
                return Err(GameError::JoinCodeConflict(code.to_string()));
            }
        }
        store.games.insert(game.id, game.clone());
        for user_id in participants {
            store.participants.push(Participant {
                game_id: game.id,
                user_id: *user_id,
                joined_at: game.created_at,
            });
        }
        Ok(())
    }

    async fn find_game(&self, game_id: GameId) -> GamesResult<Option<Game>> {
        Ok(self.store.lock().unwrap().games.get(&game_id).cloned())
    }

    async fn find_active_by_join_code(&self, code: &str) -> GamesResult<Option<Game>> {
        Ok(active_code_holder(&self.store.lock().unwrap(), code).cloned())
    }

    async fn join_code_in_use(&self, code: &str) -> GamesResult<bool> {
        self.code_lookups.fetch_add(1, Ordering::SeqCst);
        if self.all_codes_taken.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(active_code_holder(&self.store.lock().unwrap(), code).is_some())
    }

    async fn update_status(&self, game_id: GameId, status: GameStatus) -> GamesResult<()> {
        let mut store = self.store.lock().unwrap();
        let game = store
            .games
            .get_mut(&game_id)
            .ok_or(GameError::NotFound(game_id))?;
        game.status = status;
        Ok(())
    }

    async fn add_participant(&self, game_id: GameId, user_id: UserId) -> GamesResult<bool> {
        let mut store = self.store.lock().unwrap();
        if store
            .participants
            .iter()
            .any(|p| p.game_id == game_id && p.user_id == user_id)
        {
            return Ok(false);
        }
        store.participants.push(Participant {
            game_id,
            user_id,
            joined_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_participants(&self, game_id: GameId) -> GamesResult<Vec<Participant>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .participants
            .iter()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn insert_buyin(
        &self,
        buyin: &Buyin,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<()> {
        let mut store = self.store.lock().unwrap();
        store.buyins.push(buyin.clone());
        apply_net_winnings(&mut store, buyin.game_id, net_winnings);
        Ok(())
    }

    async fn find_buyin(&self, buyin_id: BuyinId) -> GamesResult<Option<Buyin>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .buyins
            .iter()
            .find(|b| b.id == buyin_id)
            .cloned())
    }

    async fn update_paid_status(&self, buyin_id: BuyinId, status: PaidStatus) -> GamesResult<()> {
        let mut store = self.store.lock().unwrap();
        let buyin = store
            .buyins
            .iter_mut()
            .find(|b| b.id == buyin_id)
            .ok_or(GameError::BuyinNotFound(buyin_id))?;
        buyin.paid_status = status;
        Ok(())
    }

    async fn list_buyins(&self, game_id: GameId) -> GamesResult<Vec<Buyin>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .buyins
            .iter()
            .filter(|b| b.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn upsert_result(
        &self,
        result: &GameResult,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<GameResult> {
        let mut store = self.store.lock().unwrap();
        apply_net_winnings(&mut store, result.game_id, net_winnings);
        if let Some(existing) = store
            .results
            .iter_mut()
            .find(|r| r.game_id == result.game_id && r.user_id == result.user_id)
        {
            existing.final_amount = result.final_amount;
            existing.net_winnings = result.net_winnings;
            existing.timestamp = result.timestamp;
            existing.entered_by = result.entered_by;
            return Ok(existing.clone());
        }
        store.results.push(result.clone());
        Ok(result.clone())
    }

    async fn list_results(&self, game_id: GameId) -> GamesResult<Vec<GameResult>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .results
            .iter()
            .filter(|r| r.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn update_net_winnings(
        &self,
        game_id: GameId,
        net_winnings: &[(UserId, Cents)],
    ) -> GamesResult<()> {
        apply_net_winnings(&mut self.store.lock().unwrap(), game_id, net_winnings);
        Ok(())
    }

    async fn leaderboard_rows(&self) -> GamesResult<Vec<LeaderboardRow>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .results
            .iter()
            .filter_map(|r| {
                let game = store.games.get(&r.game_id)?;
                let user = self.users.get(r.user_id)?;
                Some(LeaderboardRow {
                    game_id: r.game_id,
                    game_status: game.status,
                    user_id: r.user_id,
                    username: user.username,
                    display_name: user.display_name,
                    net_winnings: r.net_winnings,
                })
            })
            .collect())
    }

    async fn results_for_user(&self, user_id: UserId) -> GamesResult<Vec<(Game, GameResult)>> {
        let store = self.store.lock().unwrap();
        let mut history: Vec<(Game, GameResult)> = store
            .results
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| Some((store.games.get(&r.game_id)?.clone(), r.clone())))
            .collect();
        history.sort_by(|a, b| b.0.game_date.cmp(&a.0.game_date));
        Ok(history)
    }
}

/// A manager over fresh in-memory repositories
pub fn setup() -> (TestManager, Arc<MemoryGameRepository>, Arc<MemoryUserRepository>) {
    setup_with_config(EngineConfig::default())
}

pub fn setup_with_config(
    config: EngineConfig,
) -> (TestManager, Arc<MemoryGameRepository>, Arc<MemoryUserRepository>) {
    let users = Arc::new(MemoryUserRepository::default());
    let games = Arc::new(MemoryGameRepository::new(Arc::clone(&users)));
    let manager = GameManager::new(Arc::clone(&games), Arc::clone(&users), config);
    (manager, games, users)
}
