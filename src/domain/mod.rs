//! Domain module
//!
//! Core domain types and business rules.

pub mod clock;
pub mod context;
pub mod error;
pub mod game;
pub mod library;
pub mod price;
pub mod promotion;
pub mod user;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{AdminRequired, CallerContext, Role};
pub use error::DomainError;
pub use game::{Game, NewGame};
pub use library::{LibraryEntry, LibraryEntryDetails, PurchaseCompletedEvent};
pub use price::{Price, PriceError};
pub use promotion::{
    Promotion, PromotionDetails, PromotionDraft, MAX_ACTIVE_PROMOTIONS_PER_GAME,
    MAX_PROMOTION_DURATION_DAYS,
};
pub use user::User;
