use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use outbreak_core::entry::UserId;
use outbreak_core::game::{Game, GameId};
use outbreak_core::rules::GameRules;

use crate::error::AppError;

/// A registered player account. Accounts outlive individual games.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub display_name: String,
    pub email_address: String,
}

/// In-memory storage for users and games. The registry is the storage seam:
/// everything behind it could be swapped for a database without touching
/// the domain types.
#[derive(Default)]
pub struct GameRegistry {
    users: HashMap<UserId, User>,
    tokens: HashMap<Uuid, UserId>,
    games: HashMap<GameId, Game>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user and issue their bearer token. User names are
    /// unique, case-insensitively.
    pub fn register_user(
        &mut self,
        user_name: String,
        display_name: String,
        email_address: String,
    ) -> Result<(User, Uuid), AppError> {
        let lowered = user_name.to_lowercase();
        if self
            .users
            .values()
            .any(|u| u.user_name.to_lowercase() == lowered)
        {
            return Err(AppError::Conflict(format!(
                "user name {user_name:?} is already taken"
            )));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            user_name,
            display_name,
            email_address,
        };
        let token = Uuid::new_v4();
        self.tokens.insert(token, user.user_id);
        self.users.insert(user.user_id, user.clone());
        Ok((user, token))
    }

    /// Resolve a player bearer token to a user id.
    pub fn authenticate(&self, token: Uuid) -> Option<UserId> {
        self.tokens.get(&token).copied()
    }

    pub fn user(&self, user_id: UserId) -> Option<&User> {
        self.users.get(&user_id)
    }

    pub fn create_game(&mut self, display_name: String, rules: GameRules) -> GameId {
        let game = Game::new(display_name, rules, Utc::now());
        let id = game.id;
        self.games.insert(id, game);
        id
    }

    pub fn game(&self, id: GameId) -> Option<&Game> {
        self.games.get(&id)
    }

    pub fn game_mut(&mut self, id: GameId) -> Option<&mut Game> {
        self.games.get_mut(&id)
    }

    /// Delete a game and its entries. Users persist.
    pub fn delete_game(&mut self, id: GameId) -> bool {
        self.games.remove(&id).is_some()
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// (active games, total entries across them) for the health endpoint.
    pub fn stats(&self) -> (usize, usize) {
        let games = self.games.len();
        let players = self.games.values().map(|g| g.entries.len()).sum();
        (games, players)
    }
}
