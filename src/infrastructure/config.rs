use secrecy::Secret;
use std::collections::HashMap;
use std::env;

use crate::modules::integrations::oauth::{ProviderEndpoints, default_endpoints};

pub const OAUTH_PROVIDERS: &[&str] = &["google", "github", "facebook", "apple", "discord"];

/// Client credentials taken from `{PROVIDER}_CLIENT_ID` / `{PROVIDER}_CLIENT_SECRET`
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
    pub frontend_url: String,
    pub oauth_callback_url: String,
    pub ghn_api_url: String,
    pub ghn_api_token: Option<Secret<String>>,
    pub rate_limit_per_minute: u32,
    pub oauth_credentials: HashMap<String, OAuthCredentials>,
    pub oauth_endpoints: HashMap<String, ProviderEndpoints>,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://owlstore.db?mode=rwc".to_string()
            } else {
                format!("sqlite://owlstore_{}.db?mode=rwc", profile)
            }
        });

        let frontend_url = env::var("FRONTEND_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "https://owls.vn".to_string());

        let oauth_callback_url = env::var("OAUTH_CALLBACK_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("{}/auth/callback", frontend_url));

        let oauth_credentials = OAUTH_PROVIDERS
            .iter()
            .filter_map(|provider| {
                let prefix = provider.to_uppercase();
                let client_id = env::var(format!("{}_CLIENT_ID", prefix)).ok()?;
                let client_secret = env::var(format!("{}_CLIENT_SECRET", prefix)).ok()?;
                Some((
                    provider.to_string(),
                    OAuthCredentials {
                        client_id,
                        client_secret: Secret::new(client_secret),
                    },
                ))
            })
            .collect();

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            profile,
            frontend_url,
            oauth_callback_url,
            ghn_api_url: env::var("GHN_API_URL").unwrap_or_else(|_| {
                "https://online-gateway.ghn.vn/shiip/public-api/master-data".to_string()
            }),
            ghn_api_token: env::var("GHN_API_TOKEN").ok().map(Secret::new),
            rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            oauth_credentials,
            oauth_endpoints: default_endpoints(),
        }
    }
}
