//! Repository module
//!
//! Storage seams for the catalog, promotions, library, users and API keys.
//! Handlers depend on these traits; `postgres` backs them with sqlx and
//! `memory` backs them with in-process maps for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::{
    DomainError, Game, LibraryEntry, LibraryEntryDetails, Promotion, PromotionDetails, Role, User,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{
    PgApiKeyRepository, PgGameRepository, PgLibraryRepository, PgPromotionRepository,
    PgUserRepository,
};

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return Self::UniqueViolation(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return Self::ForeignKeyViolation(constraint);
            }
        }
        Self::Database(err)
    }
}

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(constraint) => {
                DomainError::Conflict(format!("duplicate record ({constraint})"))
            }
            RepositoryError::ForeignKeyViolation(constraint) => {
                DomainError::Validation(format!("referenced record does not exist ({constraint})"))
            }
            other => DomainError::Infrastructure(other.to_string()),
        }
    }
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Game>, RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Game>, RepositoryError>;

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError>;

    async fn create(&self, game: &Game) -> Result<(), RepositoryError>;
}

/// Promotion reads always join the discounted game.
#[async_trait]
pub trait PromotionRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<PromotionDetails>, RepositoryError>;

    /// Promotions flagged active whose window contains `now`, oldest first.
    async fn get_active(&self, now: DateTime<Utc>)
        -> Result<Vec<PromotionDetails>, RepositoryError>;

    async fn get_active_for_game(
        &self,
        game_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionDetails>, RepositoryError>;

    async fn create(&self, promotion: &Promotion) -> Result<(), RepositoryError>;

    /// Overwrite every field; returns false when the id is unknown.
    async fn update(&self, promotion: &Promotion) -> Result<bool, RepositoryError>;

    /// Returns false when the id is unknown.
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid)
        -> Result<Vec<LibraryEntryDetails>, RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<LibraryEntryDetails>, RepositoryError>;

    async fn user_owns_game(&self, user_id: Uuid, game_id: Uuid) -> Result<bool, RepositoryError>;

    /// Insert; a second entry for the same `(user_id, game_id)` fails with
    /// `RepositoryError::UniqueViolation`.
    async fn create(&self, entry: &LibraryEntry) -> Result<(), RepositoryError>;

    /// Insert unless `(user_id, game_id)` is already owned; returns whether a row was written.
    async fn insert_if_absent(&self, entry: &LibraryEntry) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Insert; a duplicate email fails with `RepositoryError::UniqueViolation`.
    async fn create(&self, user: &User) -> Result<(), RepositoryError>;
}

/// Stored API key, looked up by hash
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub user_id: Option<Uuid>,
    pub is_active: bool,
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, RepositoryError>;
}

/// Hex-encoded SHA-256 of a raw API key, as stored in `api_keys.key_hash`.
pub fn hash_api_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}
