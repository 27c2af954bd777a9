//! OAuth Service - social login, registration and account linking
//!
//! Authorization-code flow with single-use state tokens. Provider
//! credentials come from the `oauth_provider_configs` table first and the
//! environment second.

use chrono::Duration;
use sea_orm::*;
use secrecy::{ExposeSecret, Secret};
use serde_json::{Value, json};

use crate::domain::{DomainError, NewUser};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::issue_token_pair;
use crate::infrastructure::config::OAUTH_PROVIDERS;
use crate::models::oauth_provider_config::{self, Entity as OAuthProviderConfig};
use crate::models::oauth_state::{self, ACTION_LINK, ACTION_LOGIN, ACTION_REGISTER, Entity as OAuthState};
use crate::models::social_connection::{self, Entity as SocialConnection};
use crate::models::social_login_log;
use crate::models::user::{self, ROLE_CUSTOMER};
use crate::modules::integrations::oauth::{
    ProviderEndpoints, SocialProfile, TokenResponse, exchange_code, fetch_userinfo,
    normalize_profile,
};
use crate::services::security_service::random_url_token;
use crate::utils::net::ClientInfo;
use crate::utils::time::{from_now, now_str};

const STATE_TTL_MINUTES: i64 = 10;
const STATE_BYTES: usize = 32;

pub fn button_color(provider: &str) -> &'static str {
    match provider {
        "google" => "#4285F4",
        "github" => "#24292E",
        "facebook" => "#1877F2",
        "apple" => "#000000",
        "discord" => "#5865F2",
        _ => "#333333",
    }
}

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

pub struct ResolvedProvider {
    pub name: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub endpoints: ProviderEndpoints,
}

async fn stored_config(
    db: &DatabaseConnection,
    provider: &str,
) -> Result<Option<oauth_provider_config::Model>, DomainError> {
    Ok(OAuthProviderConfig::find_by_id(provider.to_string())
        .filter(oauth_provider_config::Column::IsActive.eq(true))
        .one(db)
        .await?)
}

pub async fn resolve_provider(state: &AppState, provider: &str) -> Result<ResolvedProvider, DomainError> {
    if !OAUTH_PROVIDERS.contains(&provider) {
        return Err(DomainError::oauth(
            "invalid_provider",
            format!("Unknown provider: {}", provider),
        ));
    }
    let Some(base) = state.config.oauth_endpoints.get(provider) else {
        return Err(DomainError::oauth(
            "provider_not_supported",
            format!("{} login is not supported yet", provider),
        ));
    };
    let mut endpoints = base.clone();

    let (client_id, client_secret) = match stored_config(state.db(), provider).await? {
        Some(row) => {
            if let Some(scopes) = row.scopes.as_deref().filter(|s| !s.trim().is_empty()) {
                endpoints.scopes = scopes.split_whitespace().map(str::to_string).collect();
            }
            (row.client_id, Secret::new(row.client_secret))
        }
        None => match state.config.oauth_credentials.get(provider) {
            Some(creds) => (creds.client_id.clone(), creds.client_secret.clone()),
            None => {
                return Err(DomainError::oauth(
                    "provider_not_configured",
                    format!("{} login is not configured", provider),
                ));
            }
        },
    };

    Ok(ResolvedProvider {
        name: provider.to_string(),
        client_id,
        client_secret,
        endpoints,
    })
}

/// Providers with credentials, as login button metadata.
pub async fn providers(state: &AppState) -> Result<Vec<Value>, DomainError> {
    let stored: Vec<String> = OAuthProviderConfig::find()
        .filter(oauth_provider_config::Column::IsActive.eq(true))
        .all(state.db())
        .await?
        .into_iter()
        .map(|row| row.provider)
        .collect();

    Ok(OAUTH_PROVIDERS
        .iter()
        .filter(|p| stored.iter().any(|s| s.as_str() == **p) || state.config.oauth_credentials.contains_key(**p))
        .map(|p| {
            json!({
                "name": p,
                "icon_url": format!("/icons/{}.svg", p),
                "button_color": button_color(p),
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

pub fn redirect_uri(state: &AppState, provider: &str) -> String {
    format!("{}/{}", state.config.oauth_callback_url, provider)
}

pub fn authorization_url(
    provider: &ResolvedProvider,
    redirect_uri: &str,
    state_token: &str,
) -> Result<String, DomainError> {
    let scope = provider.endpoints.scope();
    let mut params: Vec<(&str, &str)> = vec![
        ("client_id", provider.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", scope.as_str()),
        ("state", state_token),
    ];
    match provider.name.as_str() {
        "google" => {
            params.push(("access_type", "offline"));
            params.push(("prompt", "consent"));
        }
        "github" => params.push(("allow_signup", "true")),
        _ => {}
    }

    url::Url::parse_with_params(&provider.endpoints.authorize_url, &params)
        .map(|u| u.to_string())
        .map_err(|e| DomainError::Internal(format!("bad authorize url: {}", e)))
}

pub async fn authorize(
    state: &AppState,
    provider: &str,
    action: &str,
    user_id: Option<&str>,
    next_url: Option<&str>,
) -> Result<Value, DomainError> {
    if ![ACTION_LOGIN, ACTION_REGISTER, ACTION_LINK].contains(&action) {
        return Err(DomainError::Validation(format!("Invalid action: {}", action)));
    }
    if action == ACTION_LINK && user_id.is_none() {
        return Err(DomainError::auth(
            "INVALID_TOKEN",
            "Sign in to link a social account",
        ));
    }
    let resolved = resolve_provider(state, provider).await?;
    let db = state.db();

    OAuthState::delete_many()
        .filter(oauth_state::Column::ExpiresAt.lt(now_str()))
        .exec(db)
        .await?;

    let token = random_url_token(STATE_BYTES);
    let redirect = redirect_uri(state, provider);
    OAuthState::insert(oauth_state::ActiveModel {
        state: Set(token.clone()),
        provider: Set(provider.to_string()),
        user_id: Set(user_id.map(str::to_string)),
        redirect_uri: Set(redirect.clone()),
        next_url: Set(next_url.filter(|n| !n.is_empty()).unwrap_or("/").to_string()),
        action: Set(action.to_string()),
        expires_at: Set(from_now(Duration::minutes(STATE_TTL_MINUTES))),
        created_at: Set(now_str()),
    })
    .exec_without_returning(db)
    .await?;

    Ok(json!({
        "authorization_url": authorization_url(&resolved, &redirect, &token)?,
        "state": token,
    }))
}

/// Fetch and delete the state row. Expired or foreign states are rejected.
/// Only the caller whose delete removes the row may continue.
async fn consume_state(
    db: &DatabaseConnection,
    token: &str,
    provider: &str,
) -> Result<oauth_state::Model, DomainError> {
    let invalid = || DomainError::oauth("invalid_state", "Invalid or expired state");
    let row = OAuthState::find_by_id(token.to_string())
        .one(db)
        .await?
        .ok_or_else(invalid)?;
    let deleted = OAuthState::delete_by_id(token.to_string()).exec(db).await?;
    if deleted.rows_affected != 1 {
        return Err(invalid());
    }

    if row.expires_at < now_str() {
        return Err(invalid());
    }
    if row.provider != provider {
        return Err(DomainError::oauth("provider_mismatch", "Provider mismatch"));
    }
    Ok(row)
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

fn token_expiry(tokens: &TokenResponse) -> Option<String> {
    tokens
        .expires_in
        .filter(|s| *s > 0)
        .map(|s| from_now(Duration::seconds(s)))
}

async fn find_connection(
    db: &DatabaseConnection,
    provider: &str,
    provider_user_id: &str,
) -> Result<Option<social_connection::Model>, DomainError> {
    Ok(SocialConnection::find()
        .filter(social_connection::Column::Provider.eq(provider))
        .filter(social_connection::Column::ProviderUserId.eq(provider_user_id))
        .one(db)
        .await?)
}

async fn refresh_connection(
    db: &DatabaseConnection,
    existing: social_connection::Model,
    profile: &SocialProfile,
    tokens: &TokenResponse,
) -> Result<social_connection::Model, DomainError> {
    let now = now_str();
    let mut active: social_connection::ActiveModel = existing.into();
    active.access_token = Set(tokens.access_token.clone());
    if tokens.refresh_token.is_some() {
        active.refresh_token = Set(tokens.refresh_token.clone());
    }
    active.token_expires_at = Set(token_expiry(tokens));
    active.email = Set(profile.email.clone());
    active.name = Set(Some(profile.name.clone()));
    active.avatar_url = Set(profile.avatar_url.clone());
    active.extra_data = Set(profile.raw.to_string());
    active.last_login_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    Ok(active.update(db).await?)
}

async fn create_connection(
    db: &DatabaseConnection,
    user_id: &str,
    provider: &str,
    profile: &SocialProfile,
    tokens: &TokenResponse,
    is_primary: bool,
) -> Result<social_connection::Model, DomainError> {
    let now = now_str();
    let created = social_connection::ActiveModel {
        user_id: Set(user_id.to_string()),
        provider: Set(provider.to_string()),
        provider_user_id: Set(profile.provider_user_id.clone()),
        email: Set(profile.email.clone()),
        name: Set(Some(profile.name.clone())),
        avatar_url: Set(profile.avatar_url.clone()),
        access_token: Set(tokens.access_token.clone()),
        refresh_token: Set(tokens.refresh_token.clone()),
        token_expires_at: Set(token_expiry(tokens)),
        is_primary: Set(is_primary),
        last_login_at: Set(Some(now.clone())),
        extra_data: Set(profile.raw.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("Linked {} account to user {}", provider, user_id);
    Ok(created)
}

async fn has_connections(db: &DatabaseConnection, user_id: &str) -> Result<bool, DomainError> {
    Ok(SocialConnection::find()
        .filter(social_connection::Column::UserId.eq(user_id))
        .count(db)
        .await?
        > 0)
}

/// Attach the provider account to `user_id`, refreshing an existing link.
pub async fn link_account(
    db: &DatabaseConnection,
    user_id: &str,
    provider: &str,
    profile: &SocialProfile,
    tokens: &TokenResponse,
) -> Result<social_connection::Model, DomainError> {
    if let Some(existing) = find_connection(db, provider, &profile.provider_user_id).await? {
        if existing.user_id != user_id {
            return Err(DomainError::oauth(
                "already_linked",
                format!("This {} account is already linked to another user", provider),
            ));
        }
        return refresh_connection(db, existing, profile, tokens).await;
    }
    let primary = !has_connections(db, user_id).await?;
    create_connection(db, user_id, provider, profile, tokens, primary).await
}

/// Returns the user and whether it was created.
pub async fn login_or_register(
    state: &AppState,
    provider: &str,
    profile: &SocialProfile,
    tokens: &TokenResponse,
) -> Result<(user::Model, bool), DomainError> {
    let db = state.db();

    if let Some(existing) = find_connection(db, provider, &profile.provider_user_id).await? {
        let user = state
            .user_repo
            .find_by_id(&existing.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;
        refresh_connection(db, existing, profile, tokens).await?;
        return Ok((user, false));
    }

    let email = profile
        .email
        .clone()
        .ok_or_else(|| DomainError::oauth("email_required", "Email required for registration"))?;

    if let Some(user) = state.user_repo.find_by_email(&email).await? {
        link_account(db, &user.id, provider, profile, tokens).await?;
        return Ok((user, false));
    }

    let user = state
        .user_repo
        .create(NewUser {
            email,
            password_hash: None,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            role: ROLE_CUSTOMER.to_string(),
            is_email_verified: profile.email_verified,
        })
        .await?;
    create_connection(db, &user.id, provider, profile, tokens, true).await?;
    tracing::info!("Registered user {} through {}", user.id, provider);
    Ok((user, true))
}

async fn log_attempt(
    db: &DatabaseConnection,
    user_id: Option<&str>,
    provider: &str,
    action: &str,
    error: Option<&DomainError>,
    client: &ClientInfo,
) {
    let result = social_login_log::Entity::insert(social_login_log::ActiveModel {
        user_id: Set(user_id.map(str::to_string)),
        provider: Set(provider.to_string()),
        action: Set(action.to_string()),
        success: Set(error.is_none()),
        error_message: Set(error.map(|e| e.public_message())),
        ip_address: Set(client.ip.clone()),
        user_agent: Set(client.user_agent.clone()),
        created_at: Set(now_str()),
        ..Default::default()
    })
    .exec_without_returning(db)
    .await;
    if let Err(e) = result {
        tracing::error!("Failed to write social login log: {}", e);
    }
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

async fn run_callback(
    state: &AppState,
    provider: &str,
    code: &str,
    state_row: &oauth_state::Model,
) -> Result<Value, DomainError> {
    let resolved = resolve_provider(state, provider).await?;
    let tokens = exchange_code(
        &state.http,
        &resolved.endpoints,
        &resolved.client_id,
        resolved.client_secret.expose_secret(),
        code,
        &state_row.redirect_uri,
    )
    .await?;
    let raw = fetch_userinfo(&state.http, &resolved.endpoints, &tokens.access_token).await?;
    let profile = normalize_profile(provider, raw);
    if profile.provider_user_id.is_empty() {
        return Err(DomainError::oauth("userinfo_error", "Failed to get user info"));
    }

    let user = if state_row.action == ACTION_LINK {
        let user_id = state_row
            .user_id
            .as_deref()
            .ok_or_else(|| DomainError::oauth("invalid_state", "Invalid or expired state"))?;
        link_account(state.db(), user_id, provider, &profile, &tokens).await?;
        state
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?
    } else {
        login_or_register(state, provider, &profile, &tokens).await?.0
    };

    if !user.is_active {
        return Err(DomainError::auth("ACCOUNT_DISABLED", "Account is disabled"));
    }
    state.user_repo.touch_last_login(&user.id).await?;
    let pair = issue_token_pair(&user)?;

    Ok(json!({
        "access_token": pair.access_token,
        "refresh_token": pair.refresh_token,
        "next_url": state_row.next_url,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.full_name(),
        },
        "action": state_row.action,
    }))
}

pub async fn callback(
    state: &AppState,
    provider: &str,
    code: &str,
    state_token: &str,
    client: &ClientInfo,
) -> Result<Value, DomainError> {
    let db = state.db();
    let state_row = match consume_state(db, state_token, provider).await {
        Ok(row) => row,
        Err(e) => {
            log_attempt(db, None, provider, ACTION_LOGIN, Some(&e), client).await;
            tracing::warn!("OAuth callback for {} rejected: {}", provider, e);
            return Err(e);
        }
    };

    match run_callback(state, provider, code, &state_row).await {
        Ok(body) => {
            let user_id = body["user"]["id"].as_str();
            log_attempt(db, user_id, provider, &state_row.action, None, client).await;
            Ok(body)
        }
        Err(e) => {
            log_attempt(
                db,
                state_row.user_id.as_deref(),
                provider,
                &state_row.action,
                Some(&e),
                client,
            )
            .await;
            tracing::warn!("OAuth {} callback failed: {}", provider, e);
            Err(e)
        }
    }
}

pub async fn connections(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<social_connection::Model>, DomainError> {
    Ok(SocialConnection::find()
        .filter(social_connection::Column::UserId.eq(user_id))
        .order_by_asc(social_connection::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Remove a provider link, refusing to strip a user's last way to sign in.
pub async fn disconnect(
    db: &DatabaseConnection,
    user: &user::Model,
    provider: &str,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;
    let all = SocialConnection::find()
        .filter(social_connection::Column::UserId.eq(user.id.as_str()))
        .order_by_asc(social_connection::Column::CreatedAt)
        .all(&txn)
        .await?;
    let Some(target) = all.iter().find(|c| c.provider == provider).cloned() else {
        return Err(DomainError::oauth("not_found", "Connection not found"));
    };
    if user.password_hash.is_none() && all.len() <= 1 {
        return Err(DomainError::oauth(
            "cannot_disconnect",
            "Cannot disconnect only login method",
        ));
    }

    SocialConnection::delete_by_id(target.id).exec(&txn).await?;
    if target.is_primary
        && let Some(next) = all.iter().find(|c| c.id != target.id)
    {
        let mut active: social_connection::ActiveModel = next.clone().into();
        active.is_primary = Set(true);
        active.updated_at = Set(now_str());
        active.update(&txn).await?;
    }
    txn.commit().await?;

    tracing::info!("User {} disconnected {}", user.id, provider);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn github() -> ResolvedProvider {
        let endpoints: HashMap<String, ProviderEndpoints> =
            crate::modules::integrations::oauth::default_endpoints();
        ResolvedProvider {
            name: "github".into(),
            client_id: "cid".into(),
            client_secret: Secret::new("shh".into()),
            endpoints: endpoints["github"].clone(),
        }
    }

    #[test]
    fn authorize_url_carries_provider_extras() {
        let url = authorization_url(&github(), "https://owls.vn/auth/callback/github", "abc").unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let q: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(parsed.host_str(), Some("github.com"));
        assert_eq!(q["client_id"], "cid");
        assert_eq!(q["response_type"], "code");
        assert_eq!(q["scope"], "user:email");
        assert_eq!(q["state"], "abc");
        assert_eq!(q["allow_signup"], "true");
        assert!(!q.contains_key("prompt"));
    }

    #[test]
    fn colors_have_a_default() {
        assert_eq!(button_color("discord"), "#5865F2");
        assert_eq!(button_color("myspace"), "#333333");
    }
}
