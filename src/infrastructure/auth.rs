use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{Method, request::Parts},
};
use std::net::SocketAddr;

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::user;
use crate::services::security_service;
use crate::utils::net::client_ip;

pub const TOKEN_ACCESS: &str = "access";
pub const TOKEN_REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: String,
    pub typ: String, // 'access' | 'refresh'
    pub exp: usize,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            DomainError::auth("INVALID_TOKEN", "Missing or malformed Authorization header")
        })?;

        let claims = decode_jwt(token)
            .map_err(|_| DomainError::auth("INVALID_TOKEN", "Invalid or expired token"))?;

        if claims.typ != TOKEN_ACCESS {
            return Err(DomainError::auth("INVALID_TOKEN", "Invalid or expired token"));
        }
        Ok(claims)
    }
}

/// Authenticated caller, identified by a bearer JWT or an `X-API-Key` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: user::Model,
    /// Permission of the API key used, `None` for JWT sessions
    pub api_key_permission: Option<String>,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
            && self
                .api_key_permission
                .as_deref()
                .is_none_or(|p| p == "admin")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        if let Some(raw_key) = parts.headers.get("X-API-Key").and_then(|h| h.to_str().ok()) {
            let remote = parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0);
            let ip = client_ip(&parts.headers, remote);
            let key = security_service::verify_api_key(app.db(), raw_key, &ip)
                .await?
                .ok_or_else(|| DomainError::auth("INVALID_TOKEN", "Invalid API key"))?;

            if key.permission == "read" && !matches!(parts.method, Method::GET | Method::HEAD) {
                return Err(DomainError::PermissionDenied(
                    "API key does not allow write access".to_string(),
                ));
            }

            let user = load_active_user(&app, &key.user_id).await?;
            return Ok(AuthUser {
                user,
                api_key_permission: Some(key.permission),
            });
        }

        let claims = Claims::from_request_parts(parts, state).await?;
        let user = load_active_user(&app, &claims.sub).await?;
        Ok(AuthUser {
            user,
            api_key_permission: None,
        })
    }
}

async fn load_active_user(app: &AppState, user_id: &str) -> Result<user::Model, DomainError> {
    let user = app
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::auth("INVALID_TOKEN", "User no longer exists"))?;

    if !user.is_active {
        return Err(DomainError::auth("ACCOUNT_DISABLED", "Account is disabled"));
    }
    Ok(user)
}

/// Authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.is_admin() {
            return Err(DomainError::PermissionDenied(
                "Admin access required".to_string(),
            ));
        }
        Ok(AdminUser(auth))
    }
}

/// Optional identity for endpoints that behave differently when signed in.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let has_credentials =
            parts.headers.contains_key("Authorization") || parts.headers.contains_key("X-API-Key");
        if !has_credentials {
            return Ok(MaybeUser(None));
        }
        AuthUser::from_request_parts(parts, state)
            .await
            .map(|u| MaybeUser(Some(u)))
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn encode_claims(user_id: &str, role: &str, typ: &str, ttl: Duration) -> Result<String, String> {
    let secret = get_jwt_secret();
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| "token lifetime overflows".to_string())?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_owned(),
        role: role.to_owned(),
        typ: typ.to_owned(),
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

/// Short-lived access token.
pub fn create_jwt(user_id: &str, role: &str) -> Result<String, String> {
    let minutes = env_i64("JWT_ACCESS_MINUTES", 60);
    encode_claims(user_id, role, TOKEN_ACCESS, Duration::minutes(minutes))
}

pub fn create_refresh_jwt(user_id: &str, role: &str) -> Result<String, String> {
    let days = env_i64("JWT_REFRESH_DAYS", 7);
    encode_claims(user_id, role, TOKEN_REFRESH, Duration::days(days))
}

pub fn issue_token_pair(user: &user::Model) -> Result<TokenPair, DomainError> {
    let access_token = create_jwt(&user.id, &user.role).map_err(DomainError::Internal)?;
    let refresh_token = create_refresh_jwt(&user.id, &user.role).map_err(DomainError::Internal)?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

pub fn decode_jwt(token: &str) -> Result<Claims, String> {
    let secret = get_jwt_secret();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
