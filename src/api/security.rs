use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{AdminUser, AuthUser};
use crate::models::{
    api_key, ip_blacklist, login_attempt, security_audit_log as audit_log, trusted_device,
};
use crate::services::security_service::{self, TwoFactorSetup};
use crate::utils::net::ClientInfo;
use crate::utils::pagination::{Page, PageParams};

// ---------------------------------------------------------------------------
// Two-factor authentication
// ---------------------------------------------------------------------------

pub async fn two_factor_status(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        security_service::two_factor_status(state.db(), auth.id()).await?,
    ))
}

pub async fn two_factor_setup(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<TwoFactorSetup>> {
    Ok(Json(security_service::setup_2fa(state.db(), &auth.user).await?))
}

#[derive(Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

pub async fn two_factor_enable(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(payload): Json<CodeRequest>,
) -> ApiResult<Json<Value>> {
    let backup_codes =
        security_service::enable_2fa(state.db(), &auth.user, &payload.code, &client).await?;
    Ok(Json(json!({ "enabled": true, "backup_codes": backup_codes })))
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub password: String,
}

pub async fn two_factor_disable(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(payload): Json<PasswordRequest>,
) -> ApiResult<Json<Value>> {
    security_service::disable_2fa(state.db(), &auth.user, &payload.password, &client).await?;
    Ok(Json(json!({ "enabled": false })))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub user_id: String,
    pub code: String,
    #[serde(default)]
    pub is_backup: bool,
}

pub async fn two_factor_verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let valid = if payload.is_backup {
        security_service::verify_backup_code(state.db(), &payload.user_id, &payload.code).await?
    } else {
        security_service::verify_totp(state.db(), &payload.user_id, &payload.code).await?
    };
    Ok(Json(json!({ "valid": valid })))
}

pub async fn backup_codes_remaining(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let remaining = security_service::get_2fa_config(state.db(), auth.id())
        .await?
        .filter(|c| c.is_enabled)
        .map(|c| c.backup_codes_count)
        .unwrap_or(0);
    Ok(Json(json!({ "remaining": remaining })))
}

pub async fn backup_codes_regenerate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<PasswordRequest>,
) -> ApiResult<Json<Value>> {
    let codes =
        security_service::regenerate_backup_codes(state.db(), &auth.user, &payload.password)
            .await?;
    Ok(Json(json!({ "backup_codes": codes })))
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

pub async fn list_api_keys(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Value>>> {
    let keys = security_service::list_api_keys(state.db(), auth.id()).await?;
    Ok(Json(keys.iter().map(api_key::Model::to_dto).collect()))
}

#[derive(Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub permission: Option<String>,
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    pub expires_days: Option<i64>,
}

pub async fn create_api_key(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(payload): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let created = security_service::create_api_key(
        state.db(),
        &auth.user,
        &payload.name,
        payload.permission.as_deref().unwrap_or("read"),
        payload.allowed_ips,
        payload.expires_days,
        &client,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": created.key.id,
            "name": created.key.name,
            "key": created.raw_key,
            "permission": created.key.permission,
            "expires_at": created.key.expires_at,
        })),
    ))
}

pub async fn revoke_api_key(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    client: ClientInfo,
) -> ApiResult<Json<Value>> {
    security_service::revoke_api_key(state.db(), auth.id(), &id, &client).await?;
    Ok(Json(json!({ "message": "API key revoked" })))
}

// ---------------------------------------------------------------------------
// Trusted devices
// ---------------------------------------------------------------------------

pub async fn trusted_devices(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<trusted_device::Model>>> {
    Ok(Json(
        security_service::list_trusted_devices(state.db(), auth.id()).await?,
    ))
}

pub async fn revoke_trusted_device(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    security_service::revoke_trusted_device(state.db(), auth.id(), id).await?;
    Ok(Json(json!({ "message": "Device revoked" })))
}

pub async fn revoke_all_trusted_devices(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let revoked = security_service::revoke_all_trusted_devices(state.db(), auth.id()).await?;
    Ok(Json(json!({ "revoked": revoked })))
}

// ---------------------------------------------------------------------------
// History and overview
// ---------------------------------------------------------------------------

pub async fn login_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<login_attempt::Model>>> {
    Ok(Json(
        security_service::login_history(state.db(), &auth.user, 50).await?,
    ))
}

pub async fn audit_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<audit_log::Model>>> {
    Ok(Json(
        security_service::audit_history(state.db(), auth.id(), 100).await?,
    ))
}

pub async fn overview(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    Ok(Json(security_service::overview(state.db(), &auth.user).await?))
}

// ---------------------------------------------------------------------------
// IP checks, CSP reports and the honeypot
// ---------------------------------------------------------------------------

pub async fn check_ip(State(state): State<AppState>, client: ClientInfo) -> ApiResult<Json<Value>> {
    let blocked = security_service::is_ip_blocked(state.db(), &client.ip).await?;
    Ok(Json(json!({ "ip": client.ip, "blocked": blocked })))
}

pub async fn csp_report(
    State(state): State<AppState>,
    client: ClientInfo,
    body: Bytes,
) -> ApiResult<StatusCode> {
    // Browsers post `application/csp-report`, so the body is parsed by hand
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| DomainError::Validation("Invalid CSP report".to_string()))?;
    security_service::store_csp_report(state.db(), &payload, &client.ip).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Trap for scanners: nothing legitimate links here.
pub async fn honeypot(
    State(state): State<AppState>,
    client: ClientInfo,
) -> (StatusCode, Json<Value>) {
    tracing::warn!("Honeypot hit from {} ({})", client.ip, client.user_agent);
    security_service::audit(
        state.db(),
        None,
        audit_log::SUSPICIOUS,
        audit_log::SEVERITY_CRITICAL,
        &client,
        json!({ "trigger": "honeypot" }),
    )
    .await;

    if let Err(e) = security_service::block_ip(
        state.db(),
        &client.ip,
        "abuse",
        "Honeypot access",
        Some(Duration::hours(24)),
    )
    .await
    {
        tracing::error!("Failed to block honeypot caller {}: {}", client.ip, e);
    }

    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Access denied" })),
    )
}

// ---------------------------------------------------------------------------
// Admin IP blacklist
// ---------------------------------------------------------------------------

pub async fn list_blacklist(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<ip_blacklist::Model>>> {
    Ok(Json(security_service::list_blacklist(state.db(), &params).await?))
}

#[derive(Deserialize)]
pub struct BlockRequest {
    pub ip_address: String,
    pub reason: Option<String>,
    #[serde(default)]
    pub description: String,
    pub hours: Option<i64>,
}

pub async fn block_ip(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<BlockRequest>,
) -> ApiResult<(StatusCode, Json<ip_blacklist::Model>)> {
    let ip = payload.ip_address.trim();
    if ip.parse::<std::net::IpAddr>().is_err() {
        return Err(DomainError::Validation(format!("Invalid IP address: {}", ip)));
    }
    if let Some(hours) = payload.hours
        && hours <= 0
    {
        return Err(DomainError::Validation("hours must be positive".to_string()));
    }

    let entry = security_service::block_ip(
        state.db(),
        ip,
        payload.reason.as_deref().unwrap_or("manual"),
        &payload.description,
        payload.hours.map(Duration::hours),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(ip): Path<String>,
) -> ApiResult<Json<Value>> {
    security_service::unblock_ip(state.db(), &ip).await?;
    Ok(Json(json!({ "message": "IP unblocked" })))
}
