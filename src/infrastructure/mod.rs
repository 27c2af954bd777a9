//! Framework-facing pieces of the store: SQLite schema and seed data,
//! environment configuration, JWT and API-key authentication, the
//! SeaORM repositories and the shared `AppState` handed to every handler.

pub mod auth;
pub mod config;
pub mod db;
pub mod repositories;
pub mod seed;
pub mod server;
pub mod state;

pub use repositories::*;
pub use state::AppState;
