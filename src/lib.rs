//! Game Store Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod consumer;
pub mod domain;
pub mod handlers;
pub mod projection;
pub mod repository;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{CallerContext, DomainError, Price, Role};
pub use error::{AppError, AppResult};
