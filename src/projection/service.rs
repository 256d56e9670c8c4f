//! Library Projection
//!
//! Maintains the `(user, game)` ownership records. Entries arrive either
//! from a direct purchase, priced through the promotion engine, or from a
//! purchase-completed event settled upstream.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    Clock, DomainError, LibraryEntry, LibraryEntryDetails, PurchaseCompletedEvent,
};
use crate::handlers::{PromotionEngine, PurchaseGameCommand};
use crate::repository::{GameRepository, LibraryRepository, RepositoryError, UserRepository};

/// Result of projecting a purchase-completed event
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionOutcome {
    /// A new library entry was written
    Created(LibraryEntry),
    /// The user already owned the game; nothing was written
    AlreadyOwned,
}

/// Projection service for library entries
#[derive(Clone)]
pub struct LibraryProjection {
    library: Arc<dyn LibraryRepository>,
    users: Arc<dyn UserRepository>,
    games: Arc<dyn GameRepository>,
    promotions: PromotionEngine,
    clock: Arc<dyn Clock>,
}

impl LibraryProjection {
    pub fn new(
        library: Arc<dyn LibraryRepository>,
        users: Arc<dyn UserRepository>,
        games: Arc<dyn GameRepository>,
        promotions: PromotionEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            library,
            users,
            games,
            promotions,
            clock,
        }
    }

    /// All games owned by a user, with display fields joined in.
    #[tracing::instrument(skip(self))]
    pub async fn get_user_library(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<LibraryEntryDetails>, DomainError> {
        if !self.users.exists(user_id).await? {
            return Err(DomainError::not_found("User", user_id));
        }

        Ok(self.library.get_by_user(user_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_entry(&self, id: Uuid) -> Result<Option<LibraryEntryDetails>, DomainError> {
        Ok(self.library.get_by_id(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn user_owns_game(&self, user_id: Uuid, game_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.library.user_owns_game(user_id, game_id).await?)
    }

    /// Record a direct purchase at the current discounted price.
    ///
    /// # Errors
    /// - `NotFound` when the user or the game does not exist
    /// - `Conflict` when the user already owns the game, including when a
    ///   concurrent purchase wins the insert
    /// - `Validation` when the resolved price is not positive
    #[tracing::instrument(
        skip(self, command),
        fields(user_id = %command.user_id, game_id = %command.game_id)
    )]
    pub async fn purchase_game(
        &self,
        command: PurchaseGameCommand,
    ) -> Result<LibraryEntry, DomainError> {
        if let Some(offered) = command.purchase_price {
            if offered < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "Purchase price cannot be negative (got {offered})"
                )));
            }
        }

        if !self.users.exists(command.user_id).await? {
            return Err(DomainError::not_found("User", command.user_id));
        }

        if !self.games.exists(command.game_id).await? {
            return Err(DomainError::not_found("Game", command.game_id));
        }

        if self
            .library
            .user_owns_game(command.user_id, command.game_id)
            .await?
        {
            return Err(already_owned(command.user_id, command.game_id));
        }

        let price = self.promotions.discounted_price(command.game_id).await?;
        if price <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "Resolved purchase price must be positive (got {price})"
            )));
        }

        if let Some(offered) = command.purchase_price.filter(|offered| *offered != price) {
            tracing::debug!(%offered, resolved = %price, "Client price differs from resolved price");
        }

        let entry = LibraryEntry::purchased(command.user_id, command.game_id, price, self.clock.now());
        match self.library.create(&entry).await {
            Ok(()) => {}
            Err(RepositoryError::UniqueViolation(_)) => {
                tracing::warn!("Concurrent purchase won the insert");
                return Err(already_owned(command.user_id, command.game_id));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(entry_id = %entry.id, %price, "Game purchased");
        Ok(entry)
    }

    /// Materialize a purchase-completed event into a library entry.
    ///
    /// Re-delivered events for an already owned pair are a no-op.
    #[tracing::instrument(
        skip(self, event),
        fields(purchase_id = %event.purchase_id, user_id = %event.user_id, game_id = %event.game_id)
    )]
    pub async fn project_from_event(
        &self,
        event: &PurchaseCompletedEvent,
    ) -> Result<ProjectionOutcome, DomainError> {
        let entry = LibraryEntry::from_event(event);

        if self.library.insert_if_absent(&entry).await? {
            tracing::info!(entry_id = %entry.id, "Library entry projected");
            Ok(ProjectionOutcome::Created(entry))
        } else {
            tracing::debug!("Game already in library; event skipped");
            Ok(ProjectionOutcome::AlreadyOwned)
        }
    }
}

fn already_owned(user_id: Uuid, game_id: Uuid) -> DomainError {
    DomainError::conflict(format!("User {user_id} already owns game {game_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FixedClock, Game, PromotionDraft, Role, User};
    use crate::repository::{InMemoryStore, PromotionRepository};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        projection: LibraryProjection,
        promotions: PromotionEngine,
        store: Arc<InMemoryStore>,
        user_id: Uuid,
        game_id: Uuid,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    async fn fixture(price: Decimal) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now()));

        let user = User::register("Ana", "ana@example.com", "longenough", Role::User, now()).unwrap();
        UserRepository::create(store.as_ref(), &user).await.unwrap();

        let game = Game {
            id: Uuid::new_v4(),
            title: "Hades".to_string(),
            description: String::new(),
            price,
            created_at: now(),
        };
        GameRepository::create(store.as_ref(), &game).await.unwrap();

        let promotions = PromotionEngine::new(store.clone(), store.clone(), clock.clone());
        let projection = LibraryProjection::new(
            store.clone(),
            store.clone(),
            store.clone(),
            promotions.clone(),
            clock,
        );

        Fixture {
            projection,
            promotions,
            store,
            user_id: user.id,
            game_id: game.id,
        }
    }

    #[tokio::test]
    async fn test_purchase_records_resolved_price() {
        let f = fixture(dec!(59.99)).await;
        f.promotions
            .create(PromotionDraft {
                title: "Spring Sale".to_string(),
                description: String::new(),
                discount_percentage: Some(dec!(10)),
                discount_amount: None,
                start_date: now(),
                end_date: now() + Duration::days(3),
                is_active: true,
                game_id: f.game_id,
            })
            .await
            .unwrap();

        let entry = f
            .projection
            .purchase_game(PurchaseGameCommand::new(f.user_id, f.game_id))
            .await
            .unwrap();

        assert_eq!(entry.purchase_price, Some(dec!(53.99)));
        assert_eq!(entry.acquired_at, now());
        assert!(f.projection.user_owns_game(f.user_id, f.game_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_second_purchase_conflicts_without_duplicate() {
        let f = fixture(dec!(19.99)).await;
        let command = PurchaseGameCommand::new(f.user_id, f.game_id);

        assert_ok!(f.projection.purchase_game(command.clone()).await);
        let err = assert_err!(f.projection.purchase_game(command).await);

        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(f.store.library_len(), 1);
    }

    /// Library whose ownership check always misses, as when two purchases
    /// race past the check before either inserts.
    struct RacingLibrary(Arc<InMemoryStore>);

    #[async_trait::async_trait]
    impl LibraryRepository for RacingLibrary {
        async fn get_by_user(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<LibraryEntryDetails>, RepositoryError> {
            LibraryRepository::get_by_user(self.0.as_ref(), user_id).await
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Option<LibraryEntryDetails>, RepositoryError> {
            LibraryRepository::get_by_id(self.0.as_ref(), id).await
        }

        async fn user_owns_game(&self, _: Uuid, _: Uuid) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn create(&self, entry: &LibraryEntry) -> Result<(), RepositoryError> {
            LibraryRepository::create(self.0.as_ref(), entry).await
        }

        async fn insert_if_absent(&self, entry: &LibraryEntry) -> Result<bool, RepositoryError> {
            LibraryRepository::insert_if_absent(self.0.as_ref(), entry).await
        }
    }

    #[tokio::test]
    async fn test_purchase_losing_insert_race_conflicts() {
        let f = fixture(dec!(19.99)).await;
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now()));
        let projection = LibraryProjection::new(
            Arc::new(RacingLibrary(f.store.clone())),
            f.store.clone(),
            f.store.clone(),
            f.promotions.clone(),
            clock,
        );
        let command = PurchaseGameCommand::new(f.user_id, f.game_id);

        assert_ok!(projection.purchase_game(command.clone()).await);
        let err = assert_err!(projection.purchase_game(command).await);

        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(f.store.library_len(), 1);
    }

    #[tokio::test]
    async fn test_purchase_unknown_user_or_game() {
        let f = fixture(dec!(19.99)).await;

        let err = f
            .projection
            .purchase_game(PurchaseGameCommand::new(Uuid::new_v4(), f.game_id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "User", .. }));

        let err = f
            .projection
            .purchase_game(PurchaseGameCommand::new(f.user_id, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Game", .. }));
    }

    #[tokio::test]
    async fn test_purchase_rejects_free_price() {
        let f = fixture(dec!(10)).await;
        let promotion = PromotionDraft {
            title: "Giveaway".to_string(),
            description: String::new(),
            discount_percentage: Some(dec!(100)),
            discount_amount: None,
            start_date: now(),
            end_date: now() + Duration::days(1),
            is_active: true,
            game_id: f.game_id,
        }
        .into_promotion(Uuid::new_v4());
        PromotionRepository::create(f.store.as_ref(), &promotion).await.unwrap();

        let err = f
            .projection
            .purchase_game(PurchaseGameCommand::new(f.user_id, f.game_id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(f.store.library_len(), 0);
    }

    #[tokio::test]
    async fn test_purchase_rejects_negative_offered_price() {
        let f = fixture(dec!(10)).await;
        let command = PurchaseGameCommand::new(f.user_id, f.game_id).with_purchase_price(dec!(-1));

        let err = f.projection.purchase_game(command).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_project_event_is_idempotent() {
        let f = fixture(dec!(29.99)).await;
        let event = PurchaseCompletedEvent {
            user_id: f.user_id,
            game_id: f.game_id,
            purchase_id: Uuid::new_v4(),
            processed_at: now() - Duration::minutes(5),
        };

        let outcome = f.projection.project_from_event(&event).await.unwrap();
        let ProjectionOutcome::Created(entry) = outcome else {
            panic!("expected a new entry");
        };
        assert_eq!(entry.user_id, event.user_id);
        assert_eq!(entry.game_id, event.game_id);
        assert_eq!(entry.purchase_id, event.purchase_id);
        assert_eq!(entry.acquired_at, event.processed_at);
        assert_eq!(entry.purchase_price, None);

        let again = f.projection.project_from_event(&event).await.unwrap();
        assert_eq!(again, ProjectionOutcome::AlreadyOwned);
        assert_eq!(f.store.library_len(), 1);
    }

    #[tokio::test]
    async fn test_project_event_for_unknown_user_fails() {
        let f = fixture(dec!(29.99)).await;
        let event = PurchaseCompletedEvent {
            user_id: Uuid::new_v4(),
            game_id: f.game_id,
            purchase_id: Uuid::new_v4(),
            processed_at: now(),
        };

        let err = f.projection.project_from_event(&event).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_user_library_lists_details() {
        let f = fixture(dec!(29.99)).await;
        f.projection
            .purchase_game(PurchaseGameCommand::new(f.user_id, f.game_id))
            .await
            .unwrap();

        let library = f.projection.get_user_library(f.user_id).await.unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library[0].game_title, "Hades");
        assert_eq!(library[0].user_email, "ana@example.com");

        let entry = f.projection.get_entry(library[0].entry.id).await.unwrap();
        assert_eq!(entry.as_ref(), Some(&library[0]));

        let err = f.projection.get_user_library(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
