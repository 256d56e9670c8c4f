//! Command Handlers module
//!
//! Services that validate commands and coordinate the repositories.
//! Each handler owns the business rules for one part of the store.

mod commands;
mod game_handler;
mod promotion_handler;
mod user_handler;

pub use commands::*;
pub use game_handler::GameCatalog;
pub use promotion_handler::PromotionEngine;
pub use user_handler::UserService;
