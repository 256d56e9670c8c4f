//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::domain::{
    CallerContext, DomainError, Game, LibraryEntry, LibraryEntryDetails, PromotionDetails,
    PromotionDraft, User,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{CreateGameCommand, CreateUserCommand, PurchaseGameCommand};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountedPriceResponse {
    pub game_id: Uuid,
    pub discounted_price: Decimal,
}

/// Compact library row for the per-user listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLibraryItem {
    pub user_email: String,
    pub user_name: String,
    pub game_id: Uuid,
    pub game_title: String,
}

impl From<LibraryEntryDetails> for UserLibraryItem {
    fn from(details: LibraryEntryDetails) -> Self {
        Self {
            user_email: details.user_email,
            user_name: details.user_name,
            game_id: details.entry.game_id,
            game_title: details.game_title,
        }
    }
}

/// Unwrap a JSON body, reporting malformed input through `AppError`.
fn body<T: DeserializeOwned>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

// =========================================================================
// API Router
// =========================================================================

/// Routes that require a resolved `CallerContext`
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // Game catalog
        .route("/api/game", get(list_games).post(create_game))
        .route("/api/game/:id", get(get_game))
        // Library
        .route("/api/library/user/:user_id", get(get_user_library))
        .route("/api/library/purchase", post(purchase_game))
        .route("/api/library/:id", get(get_library_entry))
        .route("/:user_id/library", get(get_user_library_items))
        // Promotions
        .route("/api/promotion", post(create_promotion))
        .route("/api/promotion/active", get(list_active_promotions))
        .route(
            "/api/promotion/:id",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
        .route(
            "/api/promotion/game/:game_id/active",
            get(list_active_promotions_for_game),
        )
        .route(
            "/api/promotion/game/:game_id/discounted-price",
            get(get_discounted_price),
        )
        // Users
        .route("/api/user/:id", get(get_user))
}

/// Routes reachable without an API key
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user", post(create_user))
        .route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

// =========================================================================
// Games
// =========================================================================

async fn list_games(State(state): State<AppState>) -> AppResult<Json<Vec<Game>>> {
    Ok(Json(state.games.get_all().await?))
}

async fn get_game(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Game>> {
    state
        .games
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::not_found("Game", id).into())
}

async fn create_game(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<CreateGameCommand>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Game>)> {
    caller.require_admin()?;
    let command = body(payload)?;

    let game = state.games.create(command).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

// =========================================================================
// Library
// =========================================================================

async fn get_user_library(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<LibraryEntryDetails>>> {
    Ok(Json(state.library.get_user_library(user_id).await?))
}

async fn get_user_library_items(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<UserLibraryItem>>> {
    let entries = state.library.get_user_library(user_id).await?;
    Ok(Json(entries.into_iter().map(UserLibraryItem::from).collect()))
}

async fn get_library_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LibraryEntryDetails>> {
    state
        .library
        .get_entry(id)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::not_found("LibraryEntry", id).into())
}

async fn purchase_game(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<PurchaseGameCommand>, JsonRejection>,
) -> AppResult<(StatusCode, Json<LibraryEntry>)> {
    caller.require_admin()?;
    let command = body(payload)?;

    let entry = state.library.purchase_game(command).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// =========================================================================
// Promotions
// =========================================================================

async fn list_active_promotions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PromotionDetails>>> {
    Ok(Json(state.promotions.get_active().await?))
}

async fn list_active_promotions_for_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> AppResult<Json<Vec<PromotionDetails>>> {
    Ok(Json(state.promotions.get_active_for_game(game_id).await?))
}

async fn get_promotion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PromotionDetails>> {
    state
        .promotions
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::not_found("Promotion", id).into())
}

async fn get_discounted_price(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> AppResult<Json<DiscountedPriceResponse>> {
    let discounted_price = state.promotions.discounted_price(game_id).await?;
    Ok(Json(DiscountedPriceResponse {
        game_id,
        discounted_price,
    }))
}

async fn create_promotion(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<PromotionDraft>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PromotionDetails>)> {
    caller.require_admin()?;
    let draft = body(payload)?;

    let promotion = state.promotions.create(draft).await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

async fn update_promotion(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<Uuid>,
    payload: Result<Json<PromotionDraft>, JsonRejection>,
) -> AppResult<Json<PromotionDetails>> {
    caller.require_admin()?;
    let draft = body(payload)?;

    Ok(Json(state.promotions.update(id, draft).await?))
}

async fn delete_promotion(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    caller.require_admin()?;

    state.promotions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Users
// =========================================================================

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserCommand>, JsonRejection>,
) -> AppResult<(StatusCode, Json<User>)> {
    let command = body(payload)?;

    let user = state.users.create(command).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<User>> {
    state
        .users
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::not_found("User", id).into())
}
