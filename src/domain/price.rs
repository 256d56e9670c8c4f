//! Price type
//!
//! Domain primitive for catalog prices with business rule validation.
//! Prices are validated at construction time, ensuring invalid values
//! cannot exist in the catalog.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum catalog price
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000, 0, 0, false, 2);

/// Fractional digits kept for every stored or computed price
pub const PRICE_SCALE: u32 = 2;

/// Price represents a validated game price.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 2 decimal places
/// - Maximum value is 1000.00
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use game_store::domain::Price;
///
/// let price = Price::new(Decimal::new(5999, 2)).unwrap();
/// assert_eq!(price.value(), Decimal::new(5999, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

/// Errors that can occur when creating a Price
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("Price must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Price has too many decimal places (max 2, got {0})")]
    TooManyDecimals(u32),

    #[error("Price exceeds maximum allowed value (1000.00)")]
    Overflow,

    #[error("Invalid price format: {0}")]
    ParseError(String),
}

impl Price {
    /// Create a new Price with validation.
    ///
    /// Trailing zeros do not count against the scale limit, so `10.500`
    /// is accepted and stored as `10.50`.
    pub fn new(value: Decimal) -> Result<Self, PriceError> {
        if value <= Decimal::ZERO {
            return Err(PriceError::NotPositive(value));
        }

        let normalized = value.normalize();
        if normalized.scale() > PRICE_SCALE {
            return Err(PriceError::TooManyDecimals(normalized.scale()));
        }

        if value > MAX_PRICE {
            return Err(PriceError::Overflow);
        }

        let mut stored = normalized;
        stored.rescale(PRICE_SCALE);
        Ok(Self(stored))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Round a computed amount to the catalog precision.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|e| PriceError::ParseError(e.to_string()))?;
        Price::new(decimal)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}
