//! Projection module
//!
//! Maintains the library read model from purchases and purchase events.

mod service;

pub use service::{LibraryProjection, ProjectionOutcome};
