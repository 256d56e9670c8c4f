//! Shared handler state

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::Clock;
use crate::handlers::{GameCatalog, PromotionEngine, UserService};
use crate::projection::LibraryProjection;
use crate::repository::{
    ApiKeyRepository, GameRepository, InMemoryStore, LibraryRepository, PgApiKeyRepository,
    PgGameRepository, PgLibraryRepository, PgPromotionRepository, PgUserRepository,
    PromotionRepository, UserRepository,
};

/// Services reachable from every route
#[derive(Clone)]
pub struct AppState {
    pub games: GameCatalog,
    pub promotions: PromotionEngine,
    pub library: LibraryProjection,
    pub users: UserService,
    pub api_keys: Arc<dyn ApiKeyRepository>,
}

impl AppState {
    /// Wire every service to one set of repositories.
    pub fn new(
        games: Arc<dyn GameRepository>,
        promotions: Arc<dyn PromotionRepository>,
        library: Arc<dyn LibraryRepository>,
        users: Arc<dyn UserRepository>,
        api_keys: Arc<dyn ApiKeyRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let promotion_engine = PromotionEngine::new(promotions, games.clone(), clock.clone());
        let library = LibraryProjection::new(
            library,
            users.clone(),
            games.clone(),
            promotion_engine.clone(),
            clock.clone(),
        );

        Self {
            games: GameCatalog::new(games, clock.clone()),
            promotions: promotion_engine,
            library,
            users: UserService::new(users, clock),
            api_keys,
        }
    }

    pub fn postgres(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(PgGameRepository::new(pool.clone())),
            Arc::new(PgPromotionRepository::new(pool.clone())),
            Arc::new(PgLibraryRepository::new(pool.clone())),
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgApiKeyRepository::new(pool)),
            clock,
        )
    }

    pub fn in_memory(store: Arc<InMemoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            clock,
        )
    }
}
