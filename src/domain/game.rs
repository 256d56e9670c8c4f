//! Game catalog entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DomainError, Price};

pub const GAME_TITLE_MIN: usize = 2;
pub const GAME_TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 1000;

/// A game in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Validated input for a catalog write
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub title: String,
    pub description: String,
    pub price: Price,
}

impl NewGame {
    /// Validate raw catalog input.
    ///
    /// # Errors
    /// `DomainError::Validation` when the title is blank or outside 2..=100
    /// characters, the description exceeds 1000 characters, or the price is
    /// not a valid `Price`.
    pub fn new(title: &str, description: &str, price: Decimal) -> Result<Self, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("Game title is required"));
        }
        check_length("title", title, GAME_TITLE_MIN, GAME_TITLE_MAX)?;
        check_length("description", description, 0, DESCRIPTION_MAX)?;

        let price = Price::new(price).map_err(|e| DomainError::validation(e.to_string()))?;

        Ok(Self {
            title: title.to_string(),
            description: description.to_string(),
            price,
        })
    }

    /// Materialize the game with a fresh identifier.
    pub fn into_game(self, created_at: DateTime<Utc>) -> Game {
        Game {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            price: self.price.value(),
            created_at,
        }
    }
}

/// Check that `value` holds between `min` and `max` characters.
pub(crate) fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), DomainError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}
