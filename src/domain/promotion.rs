//! Promotion entity and discount rules
//!
//! A promotion discounts one game for a bounded window. The pricing rules
//! live here so they can be evaluated without storage; the checks that need
//! storage (game existence, active-promotion limit) live in `PromotionEngine`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::game::{check_length, DESCRIPTION_MAX};
use super::price::{round_price, MAX_PRICE, PRICE_SCALE};
use super::{DomainError, Game};

/// Longest allowed window between start and end
pub const MAX_PROMOTION_DURATION_DAYS: i64 = 30;

/// Concurrently active promotions a single game may hold
pub const MAX_ACTIVE_PROMOTIONS_PER_GAME: usize = 3;

pub const PROMOTION_TITLE_MIN: usize = 2;
pub const PROMOTION_TITLE_MAX: usize = 200;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A discount campaign tied to one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub discount_percentage: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub game_id: Uuid,
}

impl Promotion {
    /// Active means flagged active and `now` inside `[start_date, end_date]`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    /// Price of a game costing `base` under this promotion at `now`.
    ///
    /// A positive fixed amount takes precedence over the percentage. The
    /// result is clamped to `[0, base]` and rounded to the catalog precision.
    /// Lapsed or inactive promotions return `base` unchanged.
    pub fn discounted_price(&self, base: Decimal, now: DateTime<Utc>) -> Decimal {
        if !self.is_active_at(now) {
            return base;
        }

        let discounted = match (self.fixed_amount(), self.discount_percentage) {
            (Some(amount), _) => base - amount,
            (None, Some(percentage)) => base - base * percentage / ONE_HUNDRED,
            (None, None) => base,
        };

        round_price(discounted.max(Decimal::ZERO).min(base))
    }

    fn fixed_amount(&self) -> Option<Decimal> {
        self.discount_amount.filter(|amount| *amount > Decimal::ZERO)
    }
}

/// Promotion joined with the game it discounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDetails {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub game: Game,
}

impl PromotionDetails {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.promotion.is_active_at(now)
    }

    /// Discounted price of the joined game at `now`.
    pub fn discounted_price(&self, now: DateTime<Utc>) -> Decimal {
        self.promotion.discounted_price(self.game.price, now)
    }
}

/// Unvalidated promotion fields, as submitted for create or update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    pub game_id: Uuid,
}

fn default_is_active() -> bool {
    true
}

impl PromotionDraft {
    /// Reject windows where start is not strictly before end.
    pub fn check_window(&self) -> Result<(), DomainError> {
        if self.start_date >= self.end_date {
            return Err(DomainError::validation(
                "Promotion start date must be before its end date",
            ));
        }
        Ok(())
    }

    /// Reject promotions that discount nothing, or discount out of range.
    pub fn check_discount(&self) -> Result<(), DomainError> {
        let positive = |value: Option<Decimal>| value.is_some_and(|v| v > Decimal::ZERO);

        if !positive(self.discount_percentage) && !positive(self.discount_amount) {
            return Err(DomainError::validation(
                "Either a discount percentage or a discount amount must be positive",
            ));
        }

        if let Some(percentage) = self.discount_percentage {
            check_scale("Discount percentage", percentage)?;
            if percentage < Decimal::ZERO || percentage > ONE_HUNDRED {
                return Err(DomainError::validation(format!(
                    "Discount percentage must be between 0 and 100 (got {percentage})"
                )));
            }
        }

        if let Some(amount) = self.discount_amount {
            check_scale("Discount amount", amount)?;
            if amount < Decimal::ZERO || amount > MAX_PRICE {
                return Err(DomainError::validation(format!(
                    "Discount amount must be between 0 and {MAX_PRICE} (got {amount})"
                )));
            }
        }

        Ok(())
    }

    /// Reject windows longer than `MAX_PROMOTION_DURATION_DAYS`.
    pub fn check_duration(&self) -> Result<(), DomainError> {
        if self.end_date - self.start_date > Duration::days(MAX_PROMOTION_DURATION_DAYS) {
            return Err(DomainError::validation(format!(
                "Promotion duration cannot exceed {MAX_PROMOTION_DURATION_DAYS} days"
            )));
        }
        Ok(())
    }

    /// Reject a start date before today (UTC day granularity).
    pub fn check_start_not_past(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.start_date.date_naive() < now.date_naive() {
            return Err(DomainError::validation(
                "Promotion start date cannot be in the past",
            ));
        }
        Ok(())
    }

    pub fn check_text(&self) -> Result<(), DomainError> {
        check_length(
            "title",
            self.title.trim(),
            PROMOTION_TITLE_MIN,
            PROMOTION_TITLE_MAX,
        )?;
        check_length("description", &self.description, 0, DESCRIPTION_MAX)
    }

    /// Build the stored promotion under `id`.
    pub fn into_promotion(self, id: Uuid) -> Promotion {
        Promotion {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            discount_percentage: self.discount_percentage,
            discount_amount: self.discount_amount,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            game_id: self.game_id,
        }
    }
}

/// Discounts carry the catalog precision; trailing zeros are ignored.
fn check_scale(field: &str, value: Decimal) -> Result<(), DomainError> {
    if value.normalize().scale() > PRICE_SCALE {
        return Err(DomainError::validation(format!(
            "{field} has too many decimal places (max {PRICE_SCALE}, got {value})"
        )));
    }
    Ok(())
}
