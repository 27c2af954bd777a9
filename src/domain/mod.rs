//! Domain layer - Pure business abstractions
//!
//! Trait definitions and domain error types shared by services and handlers.

pub mod errors;
pub mod repositories;

pub use errors::DomainError;
pub use repositories::*;
