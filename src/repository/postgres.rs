//! PostgreSQL repositories
//!
//! Runtime-checked sqlx queries against the schema in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Game, LibraryEntry, LibraryEntryDetails, Promotion, PromotionDetails, Role, User,
};

use super::{
    ApiKeyRecord, ApiKeyRepository, GameRepository, LibraryRepository, PromotionRepository,
    RepositoryError, UserRepository,
};

fn parse_role(role: &str) -> Result<Role, RepositoryError> {
    role.parse().map_err(RepositoryError::InvalidData)
}

// =========================================================================
// Games
// =========================================================================

#[derive(sqlx::FromRow)]
struct GameRow {
    id: Uuid,
    title: String,
    description: String,
    price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Game {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

/// Game catalog backed by the `games` table
#[derive(Debug, Clone)]
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
    async fn get_all(&self) -> Result<Vec<Game>, RepositoryError> {
        let rows: Vec<GameRow> = sqlx::query_as(
            "SELECT id, title, description, price, created_at FROM games ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Game::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Game>, RepositoryError> {
        let row: Option<GameRow> = sqlx::query_as(
            "SELECT id, title, description, price, created_at FROM games WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Game::from))
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM games WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn create(&self, game: &Game) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO games (id, title, description, price, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(game.id)
        .bind(&game.title)
        .bind(&game.description)
        .bind(game.price)
        .bind(game.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =========================================================================
// Promotions
// =========================================================================

const PROMOTION_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.description, p.discount_percentage, p.discount_amount,
        p.start_date, p.end_date, p.is_active, p.game_id,
        g.title AS game_title,
        g.description AS game_description,
        g.price AS game_price,
        g.created_at AS game_created_at
    FROM promotions p
    JOIN games g ON g.id = p.game_id
"#;

#[derive(sqlx::FromRow)]
struct PromotionRow {
    id: Uuid,
    title: String,
    description: String,
    discount_percentage: Option<Decimal>,
    discount_amount: Option<Decimal>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    game_id: Uuid,
    game_title: String,
    game_description: String,
    game_price: Decimal,
    game_created_at: DateTime<Utc>,
}

impl From<PromotionRow> for PromotionDetails {
    fn from(row: PromotionRow) -> Self {
        PromotionDetails {
            promotion: Promotion {
                id: row.id,
                title: row.title,
                description: row.description,
                discount_percentage: row.discount_percentage,
                discount_amount: row.discount_amount,
                start_date: row.start_date,
                end_date: row.end_date,
                is_active: row.is_active,
                game_id: row.game_id,
            },
            game: Game {
                id: row.game_id,
                title: row.game_title,
                description: row.game_description,
                price: row.game_price,
                created_at: row.game_created_at,
            },
        }
    }
}

/// Promotions backed by the `promotions` table, joined with `games` on read
#[derive(Debug, Clone)]
pub struct PgPromotionRepository {
    pool: PgPool,
}

impl PgPromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromotionRepository for PgPromotionRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<PromotionDetails>, RepositoryError> {
        let sql = format!("{PROMOTION_SELECT} WHERE p.id = $1");
        let row: Option<PromotionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PromotionDetails::from))
    }

    async fn get_active(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionDetails>, RepositoryError> {
        let sql = format!(
            "{PROMOTION_SELECT} WHERE p.is_active AND p.start_date <= $1 AND p.end_date >= $1 \
             ORDER BY p.created_at, p.id"
        );
        let rows: Vec<PromotionRow> = sqlx::query_as(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PromotionDetails::from).collect())
    }

    async fn get_active_for_game(
        &self,
        game_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionDetails>, RepositoryError> {
        let sql = format!(
            "{PROMOTION_SELECT} WHERE p.game_id = $1 AND p.is_active \
             AND p.start_date <= $2 AND p.end_date >= $2 \
             ORDER BY p.created_at, p.id"
        );
        let rows: Vec<PromotionRow> = sqlx::query_as(&sql)
            .bind(game_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PromotionDetails::from).collect())
    }

    async fn create(&self, promotion: &Promotion) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, title, description, discount_percentage, discount_amount,
                start_date, end_date, is_active, game_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(promotion.id)
        .bind(&promotion.title)
        .bind(&promotion.description)
        .bind(promotion.discount_percentage)
        .bind(promotion.discount_amount)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(promotion.is_active)
        .bind(promotion.game_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, promotion: &Promotion) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE promotions
            SET
                title = $2,
                description = $3,
                discount_percentage = $4,
                discount_amount = $5,
                start_date = $6,
                end_date = $7,
                is_active = $8,
                game_id = $9,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(promotion.id)
        .bind(&promotion.title)
        .bind(&promotion.description)
        .bind(promotion.discount_percentage)
        .bind(promotion.discount_amount)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(promotion.is_active)
        .bind(promotion.game_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM promotions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

// =========================================================================
// Library
// =========================================================================

const LIBRARY_SELECT: &str = r#"
    SELECT
        l.id, l.user_id, l.game_id, l.purchase_id, l.acquired_at, l.purchase_price,
        u.name AS user_name,
        u.email AS user_email,
        g.title AS game_title
    FROM libraries l
    JOIN users u ON u.id = l.user_id
    JOIN games g ON g.id = l.game_id
"#;

#[derive(sqlx::FromRow)]
struct LibraryRow {
    id: Uuid,
    user_id: Uuid,
    game_id: Uuid,
    purchase_id: Uuid,
    acquired_at: DateTime<Utc>,
    purchase_price: Option<Decimal>,
    user_name: String,
    user_email: String,
    game_title: String,
}

impl From<LibraryRow> for LibraryEntryDetails {
    fn from(row: LibraryRow) -> Self {
        LibraryEntryDetails {
            entry: LibraryEntry {
                id: row.id,
                user_id: row.user_id,
                game_id: row.game_id,
                purchase_id: row.purchase_id,
                acquired_at: row.acquired_at,
                purchase_price: row.purchase_price,
            },
            user_name: row.user_name,
            user_email: row.user_email,
            game_title: row.game_title,
        }
    }
}

/// Ownership records backed by the `libraries` table
#[derive(Debug, Clone)]
pub struct PgLibraryRepository {
    pool: PgPool,
}

impl PgLibraryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryRepository for PgLibraryRepository {
    async fn get_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<LibraryEntryDetails>, RepositoryError> {
        let sql = format!("{LIBRARY_SELECT} WHERE l.user_id = $1 ORDER BY l.acquired_at, l.id");
        let rows: Vec<LibraryRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LibraryEntryDetails::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<LibraryEntryDetails>, RepositoryError> {
        let sql = format!("{LIBRARY_SELECT} WHERE l.id = $1");
        let row: Option<LibraryRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LibraryEntryDetails::from))
    }

    async fn user_owns_game(&self, user_id: Uuid, game_id: Uuid) -> Result<bool, RepositoryError> {
        let owns: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM libraries WHERE user_id = $1 AND game_id = $2)",
        )
        .bind(user_id)
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(owns)
    }

    async fn create(&self, entry: &LibraryEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO libraries (id, user_id, game_id, purchase_id, acquired_at, purchase_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.game_id)
        .bind(entry.purchase_id)
        .bind(entry.acquired_at)
        .bind(entry.purchase_price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_if_absent(&self, entry: &LibraryEntry) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO libraries (id, user_id, game_id, purchase_id, acquired_at, purchase_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, game_id) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.game_id)
        .bind(entry.purchase_id)
        .bind(entry.acquired_at)
        .bind(entry.purchase_price)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}

// =========================================================================
// Users
// =========================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: parse_role(&row.role)?,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

/// Users backed by the `users` table
#[derive(Debug, Clone)]
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
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, role, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =========================================================================
// API keys
// =========================================================================

/// API keys backed by the `api_keys` table
#[derive(Debug, Clone)]
pub struct PgApiKeyRepository {
    pool: PgPool,
}

impl PgApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyRepository for PgApiKeyRepository {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, RepositoryError> {
        let record: Option<(Uuid, String, String, Option<Uuid>, bool)> = sqlx::query_as(
            r#"
            SELECT id, name, role, user_id, is_active
            FROM api_keys
            WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        record
            .map(|(id, name, role, user_id, is_active)| {
                Ok(ApiKeyRecord {
                    id,
                    name,
                    role: parse_role(&role)?,
                    user_id,
                    is_active,
                })
            })
            .transpose()
    }
}
