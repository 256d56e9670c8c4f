//! In-memory repositories
//!
//! One shared store implementing every repository trait, enforcing the same
//! foreign-key and uniqueness rules as the Postgres schema.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Game, LibraryEntry, LibraryEntryDetails, Promotion, PromotionDetails, Role, User,
};

use super::{
    hash_api_key, ApiKeyRecord, ApiKeyRepository, GameRepository, LibraryRepository,
    PromotionRepository, RepositoryError, UserRepository,
};

#[derive(Debug, Default)]
struct State {
    games: Vec<Game>,
    promotions: Vec<Promotion>,
    libraries: Vec<LibraryEntry>,
    users: Vec<User>,
    api_keys: Vec<(String, ApiKeyRecord)>,
}

impl State {
    fn game(&self, id: Uuid) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn promotion_details(&self, promotion: &Promotion) -> Option<PromotionDetails> {
        self.game(promotion.game_id).map(|game| PromotionDetails {
            promotion: promotion.clone(),
            game: game.clone(),
        })
    }

    fn library_details(&self, entry: &LibraryEntry) -> Option<LibraryEntryDetails> {
        let user = self.user(entry.user_id)?;
        let game = self.game(entry.game_id)?;
        Some(LibraryEntryDetails {
            entry: entry.clone(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            game_title: game.title.clone(),
        })
    }

    fn check_library_refs(&self, entry: &LibraryEntry) -> Result<(), RepositoryError> {
        if self.user(entry.user_id).is_none() {
            return Err(RepositoryError::ForeignKeyViolation("libraries_user_id_fkey".into()));
        }
        if self.game(entry.game_id).is_none() {
            return Err(RepositoryError::ForeignKeyViolation("libraries_game_id_fkey".into()));
        }
        Ok(())
    }

    fn owns(&self, user_id: Uuid, game_id: Uuid) -> bool {
        self.libraries
            .iter()
            .any(|l| l.user_id == user_id && l.game_id == game_id)
    }
}

/// In-process store for every repository trait
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `raw_key` so the auth middleware resolves it to `role`.
    pub fn insert_api_key(&self, raw_key: &str, role: Role, user_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.state().api_keys.push((
            hash_api_key(raw_key),
            ApiKeyRecord {
                id,
                name: format!("{role} key"),
                role,
                user_id,
                is_active: true,
            },
        ));
        id
    }

    pub fn library_len(&self) -> usize {
        self.state().libraries.len()
    }
}

#[async_trait]
impl GameRepository for InMemoryStore {
    async fn get_all(&self) -> Result<Vec<Game>, RepositoryError> {
        Ok(self.state().games.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Game>, RepositoryError> {
        Ok(self.state().game(id).cloned())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.state().game(id).is_some())
    }

    async fn create(&self, game: &Game) -> Result<(), RepositoryError> {
        let mut state = self.state();
        if state.game(game.id).is_some() {
            return Err(RepositoryError::UniqueViolation("games_pkey".into()));
        }
        state.games.push(game.clone());
        Ok(())
    }
}

#[async_trait]
impl PromotionRepository for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<PromotionDetails>, RepositoryError> {
        let state = self.state();
        Ok(state
            .promotions
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| state.promotion_details(p)))
    }

    async fn get_active(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionDetails>, RepositoryError> {
        let state = self.state();
        Ok(state
            .promotions
            .iter()
            .filter(|p| p.is_active_at(now))
            .filter_map(|p| state.promotion_details(p))
            .collect())
    }

    async fn get_active_for_game(
        &self,
        game_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionDetails>, RepositoryError> {
        let state = self.state();
        Ok(state
            .promotions
            .iter()
            .filter(|p| p.game_id == game_id && p.is_active_at(now))
            .filter_map(|p| state.promotion_details(p))
            .collect())
    }

    async fn create(&self, promotion: &Promotion) -> Result<(), RepositoryError> {
        let mut state = self.state();
        if state.game(promotion.game_id).is_none() {
            return Err(RepositoryError::ForeignKeyViolation("promotions_game_id_fkey".into()));
        }
        state.promotions.push(promotion.clone());
        Ok(())
    }

    async fn update(&self, promotion: &Promotion) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        if state.game(promotion.game_id).is_none() {
            return Err(RepositoryError::ForeignKeyViolation("promotions_game_id_fkey".into()));
        }
        match state.promotions.iter_mut().find(|p| p.id == promotion.id) {
            Some(existing) => {
                *existing = promotion.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        let before = state.promotions.len();
        state.promotions.retain(|p| p.id != id);
        Ok(state.promotions.len() < before)
    }
}

#[async_trait]
impl LibraryRepository for InMemoryStore {
    async fn get_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<LibraryEntryDetails>, RepositoryError> {
        let state = self.state();
        Ok(state
            .libraries
            .iter()
            .filter(|l| l.user_id == user_id)
            .filter_map(|l| state.library_details(l))
            .collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<LibraryEntryDetails>, RepositoryError> {
        let state = self.state();
        Ok(state
            .libraries
            .iter()
            .find(|l| l.id == id)
            .and_then(|l| state.library_details(l)))
    }

    async fn user_owns_game(&self, user_id: Uuid, game_id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.state().owns(user_id, game_id))
    }

    async fn create(&self, entry: &LibraryEntry) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.check_library_refs(entry)?;
        if state.owns(entry.user_id, entry.game_id) {
            return Err(RepositoryError::UniqueViolation("libraries_user_game_unique".into()));
        }
        state.libraries.push(entry.clone());
        Ok(())
    }

    async fn insert_if_absent(&self, entry: &LibraryEntry) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        state.check_library_refs(entry)?;
        if state.owns(entry.user_id, entry.game_id) {
            return Ok(false);
        }
        state.libraries.push(entry.clone());
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.state().user(id).cloned())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.state().user(id).is_some())
    }

    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::UniqueViolation("users_email_key".into()));
        }
        state.users.push(user.clone());
        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryStore {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, RepositoryError> {
        Ok(self
            .state()
            .api_keys
            .iter()
            .find(|(hash, _)| hash == key_hash)
            .map(|(_, record)| record.clone()))
    }
}
