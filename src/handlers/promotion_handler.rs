//! Promotion Engine
//!
//! Validates discount campaigns before they are stored and resolves the
//! best current price for a game.
//!
//! Every write runs all checks before touching storage. The active-promotion
//! limit is a check-then-act count and can be exceeded by concurrent writers;
//! it is a business guard, not a storage constraint.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    Clock, DomainError, PromotionDetails, PromotionDraft, MAX_ACTIVE_PROMOTIONS_PER_GAME,
};
use crate::repository::{GameRepository, PromotionRepository};

/// Promotion validation, storage and pricing
#[derive(Clone)]
pub struct PromotionEngine {
    promotions: Arc<dyn PromotionRepository>,
    games: Arc<dyn GameRepository>,
    clock: Arc<dyn Clock>,
}

impl PromotionEngine {
    pub fn new(
        promotions: Arc<dyn PromotionRepository>,
        games: Arc<dyn GameRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            promotions,
            games,
            clock,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<PromotionDetails>, DomainError> {
        Ok(self.promotions.get_by_id(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_active(&self) -> Result<Vec<PromotionDetails>, DomainError> {
        Ok(self.promotions.get_active(self.clock.now()).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_active_for_game(
        &self,
        game_id: Uuid,
    ) -> Result<Vec<PromotionDetails>, DomainError> {
        Ok(self
            .promotions
            .get_active_for_game(game_id, self.clock.now())
            .await?)
    }

    /// Validate and store a new promotion.
    ///
    /// # Errors
    /// `DomainError::Validation` when the window is inverted, the game does
    /// not exist, no discount is positive, the window exceeds 30 days, the
    /// start date is before today, or the game already holds the maximum
    /// number of active promotions.
    #[tracing::instrument(skip(self, draft), fields(game_id = %draft.game_id))]
    pub async fn create(&self, draft: PromotionDraft) -> Result<PromotionDetails, DomainError> {
        self.validate(&draft, None)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Rejected promotion"))?;

        let promotion = draft.into_promotion(Uuid::new_v4());
        self.promotions.create(&promotion).await?;

        tracing::info!(promotion_id = %promotion.id, "Promotion created");
        self.reload(promotion.id).await
    }

    /// Re-validate and overwrite every field of an existing promotion.
    ///
    /// # Errors
    /// `DomainError::NotFound` for an unknown id; otherwise the same
    /// validation errors as `create`, with this promotion excluded from the
    /// active-promotion count.
    #[tracing::instrument(skip(self, draft), fields(game_id = %draft.game_id))]
    pub async fn update(
        &self,
        id: Uuid,
        draft: PromotionDraft,
    ) -> Result<PromotionDetails, DomainError> {
        if self.promotions.get_by_id(id).await?.is_none() {
            return Err(DomainError::not_found("Promotion", id));
        }

        self.validate(&draft, Some(id))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Rejected promotion update"))?;

        let promotion = draft.into_promotion(id);
        if !self.promotions.update(&promotion).await? {
            return Err(DomainError::not_found("Promotion", id));
        }

        tracing::info!(promotion_id = %id, "Promotion updated");
        self.reload(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if self.promotions.get_by_id(id).await?.is_none() {
            return Err(DomainError::not_found("Promotion", id));
        }

        if !self.promotions.delete(id).await? {
            return Err(DomainError::not_found("Promotion", id));
        }

        tracing::info!(promotion_id = %id, "Promotion deleted");
        Ok(())
    }

    /// Currently active promotion yielding the lowest price for the game.
    ///
    /// Ties keep the first promotion returned by storage.
    #[tracing::instrument(skip(self))]
    pub async fn best_promotion(
        &self,
        game_id: Uuid,
    ) -> Result<Option<PromotionDetails>, DomainError> {
        let now = self.clock.now();
        let active = self.promotions.get_active_for_game(game_id, now).await?;

        let mut best: Option<(Decimal, PromotionDetails)> = None;
        for details in active {
            let price = details.discounted_price(now);
            match &best {
                Some((best_price, _)) if price >= *best_price => {}
                _ => best = Some((price, details)),
            }
        }

        Ok(best.map(|(_, details)| details))
    }

    /// Effective price of a game right now.
    ///
    /// # Errors
    /// `DomainError::NotFound` when the game does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn discounted_price(&self, game_id: Uuid) -> Result<Decimal, DomainError> {
        let game = self
            .games
            .get_by_id(game_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Game", game_id))?;

        let price = match self.best_promotion(game_id).await? {
            Some(best) => best.promotion.discounted_price(game.price, self.clock.now()),
            None => game.price,
        };

        tracing::debug!(base_price = %game.price, discounted_price = %price, "Resolved price");
        Ok(price)
    }

    async fn validate(
        &self,
        draft: &PromotionDraft,
        exclude: Option<Uuid>,
    ) -> Result<(), DomainError> {
        draft.check_window()?;

        if !self.games.exists(draft.game_id).await? {
            return Err(DomainError::validation(format!(
                "Game {} does not exist",
                draft.game_id
            )));
        }

        draft.check_discount()?;
        draft.check_text()?;
        draft.check_duration()?;

        let now = self.clock.now();
        draft.check_start_not_past(now)?;

        let active = self
            .promotions
            .get_active_for_game(draft.game_id, now)
            .await?
            .into_iter()
            .filter(|p| Some(p.promotion.id) != exclude)
            .count();

        if active >= MAX_ACTIVE_PROMOTIONS_PER_GAME {
            return Err(DomainError::validation(format!(
                "Game already has the maximum of {MAX_ACTIVE_PROMOTIONS_PER_GAME} active promotions; \
                 deactivate one before adding another"
            )));
        }

        Ok(())
    }

    async fn reload(&self, id: Uuid) -> Result<PromotionDetails, DomainError> {
        self.promotions
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Promotion", id))
    }
}
