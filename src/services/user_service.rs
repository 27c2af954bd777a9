//! User Service - registration, login (lockout + 2FA) and password changes

use serde_json::json;

use crate::domain::{DomainError, NewUser};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{
    TOKEN_REFRESH, TokenPair, decode_jwt, hash_password, issue_token_pair, verify_password,
};
use crate::models::security_audit_log as audit;
use crate::models::user::{self, ROLE_CUSTOMER};
use crate::services::security_service;
use crate::utils::net::ClientInfo;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub enum LoginOutcome {
    Authenticated {
        user: user::Model,
        tokens: TokenPair,
    },
    TwoFactorRequired {
        user_id: String,
        method: String,
    },
}

pub struct SecondFactor {
    pub user_id: String,
    pub code: String,
    pub is_backup: bool,
    pub trust_device: bool,
    pub device_name: Option<String>,
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn invalid_credentials() -> DomainError {
    DomainError::auth("INVALID_CREDENTIALS", "Invalid email or password")
}

pub async fn register(
    state: &AppState,
    input: Registration,
) -> Result<(user::Model, TokenPair), DomainError> {
    let email = input.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation("A valid email is required".to_string()));
    }
    validate_password(&input.password)?;

    let password_hash = hash_password(&input.password).map_err(DomainError::Internal)?;
    let user = state
        .user_repo
        .create(NewUser {
            email,
            password_hash: Some(password_hash),
            first_name: input.first_name.unwrap_or_default().trim().to_string(),
            last_name: input.last_name.unwrap_or_default().trim().to_string(),
            role: ROLE_CUSTOMER.to_string(),
            is_email_verified: false,
        })
        .await?;

    tracing::info!("Registered user {}", user.id);
    let tokens = issue_token_pair(&user)?;
    Ok((user, tokens))
}

async fn finish_login(
    state: &AppState,
    user: user::Model,
    client: &ClientInfo,
    method: &str,
) -> Result<LoginOutcome, DomainError> {
    let db = state.db();
    security_service::record_login_attempt(db, &user.email, Some(&user.id), client, None).await?;
    state.user_repo.touch_last_login(&user.id).await?;
    security_service::audit(
        db,
        Some(&user.id),
        audit::LOGIN_SUCCESS,
        audit::SEVERITY_INFO,
        client,
        json!({ "method": method }),
    )
    .await;

    let tokens = issue_token_pair(&user)?;
    tracing::info!("User {} logged in", user.id);
    Ok(LoginOutcome::Authenticated { user, tokens })
}

async fn ensure_can_login(
    state: &AppState,
    user: &user::Model,
    client: &ClientInfo,
) -> Result<(), DomainError> {
    let db = state.db();
    if security_service::active_lockout(db, &user.id).await?.is_some() {
        security_service::record_login_attempt(
            db,
            &user.email,
            Some(&user.id),
            client,
            Some("account_locked"),
        )
        .await?;
        tracing::warn!("Login refused for locked account {}", user.email);
        return Err(DomainError::auth(
            "ACCOUNT_LOCKED",
            "Account is temporarily locked due to too many failed login attempts",
        ));
    }

    if !user.is_active {
        security_service::record_login_attempt(
            db,
            &user.email,
            Some(&user.id),
            client,
            Some("account_disabled"),
        )
        .await?;
        return Err(DomainError::auth("ACCOUNT_DISABLED", "Account is disabled"));
    }
    Ok(())
}

pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    device_token: Option<&str>,
    client: &ClientInfo,
) -> Result<LoginOutcome, DomainError> {
    let db = state.db();
    let email = email.trim().to_lowercase();

    let Some(user) = state.user_repo.find_by_email(&email).await? else {
        security_service::record_login_attempt(db, &email, None, client, Some("unknown_email"))
            .await?;
        return Err(invalid_credentials());
    };

    ensure_can_login(state, &user, client).await?;

    let password_ok = match &user.password_hash {
        Some(hash) => verify_password(password, hash).map_err(DomainError::Internal)?,
        None => false,
    };
    if !password_ok {
        security_service::record_login_attempt(
            db,
            &email,
            Some(&user.id),
            client,
            Some("invalid_password"),
        )
        .await?;
        security_service::audit(
            db,
            Some(&user.id),
            audit::LOGIN_FAILED,
            audit::SEVERITY_WARNING,
            client,
            json!({ "reason": "invalid_password" }),
        )
        .await;
        security_service::lock_if_over_limit(db, &user, client).await?;
        return Err(invalid_credentials());
    }

    if let Some(config) = security_service::get_2fa_config(db, &user.id).await?
        && config.is_enabled
    {
        let trusted = match device_token {
            Some(token) => security_service::validate_trusted_device(db, &user.id, token).await?,
            None => false,
        };
        if !trusted {
            return Ok(LoginOutcome::TwoFactorRequired {
                user_id: user.id,
                method: config.method,
            });
        }
    }

    finish_login(state, user, client, "password").await
}

/// Second step of a 2FA login. Returns the outcome and, when requested, a trusted device token.
pub async fn login_second_factor(
    state: &AppState,
    input: SecondFactor,
    client: &ClientInfo,
) -> Result<(LoginOutcome, Option<String>), DomainError> {
    let db = state.db();
    let user = state
        .user_repo
        .find_by_id(&input.user_id)
        .await?
        .ok_or_else(invalid_credentials)?;

    ensure_can_login(state, &user, client).await?;

    let valid = if input.is_backup {
        security_service::verify_backup_code(db, &user.id, &input.code).await?
    } else {
        security_service::is_2fa_enabled(db, &user.id).await?
            && security_service::verify_totp(db, &user.id, &input.code).await?
    };

    if !valid {
        security_service::record_login_attempt(
            db,
            &user.email,
            Some(&user.id),
            client,
            Some("invalid_2fa_code"),
        )
        .await?;
        security_service::lock_if_over_limit(db, &user, client).await?;
        return Err(DomainError::auth("INVALID_2FA_CODE", "Invalid verification code"));
    }

    let device_token = if input.trust_device {
        let name = input
            .device_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown device".to_string());
        let device =
            security_service::create_trusted_device(db, &user.id, &name, &client.ip).await?;
        Some(device.device_token)
    } else {
        None
    };

    let method = if input.is_backup { "backup_code" } else { "totp" };
    let outcome = finish_login(state, user, client, method).await?;
    Ok((outcome, device_token))
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<TokenPair, DomainError> {
    let claims = decode_jwt(refresh_token)
        .map_err(|_| DomainError::auth("INVALID_TOKEN", "Invalid or expired refresh token"))?;
    if claims.typ != TOKEN_REFRESH {
        return Err(DomainError::auth("INVALID_TOKEN", "Invalid or expired refresh token"));
    }

    let user = state
        .user_repo
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| DomainError::auth("INVALID_TOKEN", "User no longer exists"))?;
    if !user.is_active {
        return Err(DomainError::auth("ACCOUNT_DISABLED", "Account is disabled"));
    }
    issue_token_pair(&user)
}

pub async fn logout(state: &AppState, user: &user::Model, client: &ClientInfo) {
    security_service::audit(
        state.db(),
        Some(&user.id),
        audit::LOGOUT,
        audit::SEVERITY_INFO,
        client,
        json!({}),
    )
    .await;
}

/// Accounts created through social login have no password; they may set one
/// without supplying the old password.
pub async fn change_password(
    state: &AppState,
    user: &user::Model,
    old_password: &str,
    new_password: &str,
    client: &ClientInfo,
) -> Result<(), DomainError> {
    if let Some(hash) = &user.password_hash
        && !verify_password(old_password, hash).map_err(DomainError::Internal)?
    {
        return Err(DomainError::Validation("Password incorrect".to_string()));
    }
    validate_password(new_password)?;

    let new_hash = hash_password(new_password).map_err(DomainError::Internal)?;
    state.user_repo.set_password_hash(&user.id, &new_hash).await?;

    tracing::info!("Password changed for user {}", user.id);
    security_service::audit(
        state.db(),
        Some(&user.id),
        audit::PASSWORD_CHANGED,
        audit::SEVERITY_INFO,
        client,
        json!({}),
    )
    .await;
    Ok(())
}
