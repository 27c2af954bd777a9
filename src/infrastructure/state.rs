//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{LocationRepository, UserRepository};
use crate::infrastructure::config::Config;
use crate::infrastructure::{SeaOrmLocationRepository, SeaOrmUserRepository};
use crate::middleware::RequestGuard;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Outbound client for carriers and OAuth providers
    pub http: reqwest::Client,
    pub user_repo: Arc<dyn UserRepository>,
    pub location_repo: Arc<dyn LocationRepository>,
    /// Per-IP request counters and suspicion scores
    pub guard: Arc<RequestGuard>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("owlstore/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        let user_repo = Arc::new(SeaOrmUserRepository::new(db.clone()));
        let location_repo = Arc::new(SeaOrmLocationRepository::new(db.clone()));
        let guard = Arc::new(RequestGuard::new(config.rate_limit_per_minute));

        Self {
            db,
            config: Arc::new(config),
            http,
            user_repo,
            location_repo,
            guard,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
