//! Shared domain types for the Reel movie service.

pub mod clock;
pub mod config;
pub mod events;
pub mod movie;

mod errors;

pub use errors::{ReelError, Result};
