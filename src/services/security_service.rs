//! Security Service - audit trail, IP blacklist, 2FA, API keys and trusted devices

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use serde::Serialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use totp_rs::{Algorithm, Secret as TotpSecret, TOTP};

use crate::domain::DomainError;
use crate::infrastructure::auth::verify_password;
use crate::models::account_lockout::{self, Entity as AccountLockout};
use crate::models::api_key::{self, Entity as ApiKey};
use crate::models::csp_report;
use crate::models::ip_blacklist::{self, Entity as IpBlacklist};
use crate::models::login_attempt::{self, Entity as LoginAttempt};
use crate::models::security_audit_log::{self as audit_log, Entity as AuditLog};
use crate::models::trusted_device::{self, Entity as TrustedDevice};
use crate::models::two_factor_config::{self, Entity as TwoFactorConfig};
use crate::models::user;
use crate::utils::net::ClientInfo;
use crate::utils::pagination::{Page, PageParams, paginate};
use crate::utils::time::{from_now, now_str, parse_ts, to_ts};

pub const TOTP_ISSUER: &str = "OWLS Store";
pub const BACKUP_CODE_COUNT: usize = 10;
pub const API_KEY_PREFIX: &str = "owls_";
pub const MAX_FAILED_LOGINS: u64 = 5;
pub const LOCKOUT_MINUTES: i64 = 30;
pub const TRUSTED_DEVICE_DAYS: i64 = 30;

/// Random bytes rendered as unpadded url-safe base64.
pub fn random_url_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

/// Append an audit event. Failures are logged and never reach the caller.
pub async fn audit<C: ConnectionTrait>(
    db: &C,
    user_id: Option<&str>,
    event_type: &str,
    severity: &str,
    client: &ClientInfo,
    details: Value,
) {
    let entry = audit_log::ActiveModel {
        user_id: Set(user_id.map(str::to_string)),
        event_type: Set(event_type.to_string()),
        severity: Set(severity.to_string()),
        ip_address: Set(client.ip.clone()),
        user_agent: Set(client.user_agent.clone()),
        details: Set(details.to_string()),
        created_at: Set(now_str()),
        ..Default::default()
    };

    if let Err(e) = AuditLog::insert(entry).exec_without_returning(db).await {
        tracing::error!("Failed to write audit event {}: {}", event_type, e);
    }
}

pub async fn audit_history(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
) -> Result<Vec<audit_log::Model>, DomainError> {
    Ok(AuditLog::find()
        .filter(audit_log::Column::UserId.eq(user_id))
        .order_by_desc(audit_log::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?)
}

// ---------------------------------------------------------------------------
// IP blacklist
// ---------------------------------------------------------------------------

pub async fn is_ip_blocked(db: &DatabaseConnection, ip: &str) -> Result<bool, DomainError> {
    let now = now_str();
    let hit = IpBlacklist::find()
        .filter(ip_blacklist::Column::IpAddress.eq(ip))
        .filter(
            Condition::any()
                .add(ip_blacklist::Column::IsPermanent.eq(true))
                .add(ip_blacklist::Column::BlockedUntil.gt(now)),
        )
        .one(db)
        .await?;
    Ok(hit.is_some())
}

/// Block an address. `duration` of `None` makes the block permanent.
pub async fn block_ip(
    db: &DatabaseConnection,
    ip: &str,
    reason: &str,
    description: &str,
    duration: Option<Duration>,
) -> Result<ip_blacklist::Model, DomainError> {
    if !ip_blacklist::REASONS.contains(&reason) {
        return Err(DomainError::Validation(format!("Invalid block reason: {}", reason)));
    }

    let now = now_str();
    let blocked_until = duration.map(|d| to_ts(Utc::now() + d));
    let existing = IpBlacklist::find()
        .filter(ip_blacklist::Column::IpAddress.eq(ip))
        .one(db)
        .await?;

    let model = match existing {
        Some(entry) => {
            let block_count = entry.block_count + 1;
            let mut active: ip_blacklist::ActiveModel = entry.into();
            active.reason = Set(reason.to_string());
            active.description = Set(description.to_string());
            active.is_permanent = Set(blocked_until.is_none());
            active.blocked_until = Set(blocked_until);
            active.block_count = Set(block_count);
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            ip_blacklist::ActiveModel {
                ip_address: Set(ip.to_string()),
                reason: Set(reason.to_string()),
                description: Set(description.to_string()),
                is_permanent: Set(blocked_until.is_none()),
                blocked_until: Set(blocked_until),
                block_count: Set(1),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    tracing::warn!("Blocked IP {} ({}): {}", ip, reason, description);
    Ok(model)
}

pub async fn unblock_ip(db: &DatabaseConnection, ip: &str) -> Result<(), DomainError> {
    let result = IpBlacklist::delete_many()
        .filter(ip_blacklist::Column::IpAddress.eq(ip))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Blocked IP"));
    }
    tracing::info!("Unblocked IP {}", ip);
    Ok(())
}

pub async fn list_blacklist(
    db: &DatabaseConnection,
    params: &PageParams,
) -> Result<Page<ip_blacklist::Model>, DomainError> {
    paginate(
        IpBlacklist::find().order_by_desc(ip_blacklist::Column::UpdatedAt),
        db,
        params,
    )
    .await
}

// ---------------------------------------------------------------------------
// Login attempts and lockouts
// ---------------------------------------------------------------------------

pub async fn record_login_attempt(
    db: &DatabaseConnection,
    email: &str,
    user_id: Option<&str>,
    client: &ClientInfo,
    failure_reason: Option<&str>,
) -> Result<(), DomainError> {
    let attempt = login_attempt::ActiveModel {
        email: Set(email.to_string()),
        user_id: Set(user_id.map(str::to_string)),
        ip_address: Set(client.ip.clone()),
        user_agent: Set(client.user_agent.clone()),
        success: Set(failure_reason.is_none()),
        failure_reason: Set(failure_reason.map(str::to_string)),
        created_at: Set(now_str()),
        ..Default::default()
    };
    LoginAttempt::insert(attempt).exec_without_returning(db).await?;
    Ok(())
}

pub async fn active_lockout(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<account_lockout::Model>, DomainError> {
    Ok(AccountLockout::find_by_id(user_id.to_string())
        .filter(account_lockout::Column::LockedUntil.gt(now_str()))
        .one(db)
        .await?)
}

/// Lock the account once the failure budget for the window is spent.
/// Returns true when a lock was placed.
pub async fn lock_if_over_limit(
    db: &DatabaseConnection,
    user: &user::Model,
    client: &ClientInfo,
) -> Result<bool, DomainError> {
    let since = from_now(-Duration::minutes(LOCKOUT_MINUTES));
    let failures = LoginAttempt::find()
        .filter(login_attempt::Column::Email.eq(user.email.as_str()))
        .filter(login_attempt::Column::Success.eq(false))
        .filter(login_attempt::Column::CreatedAt.gte(since))
        .count(db)
        .await?;

    if failures < MAX_FAILED_LOGINS {
        return Ok(false);
    }

    let lockout = account_lockout::ActiveModel {
        user_id: Set(user.id.clone()),
        locked_until: Set(from_now(Duration::minutes(LOCKOUT_MINUTES))),
        reason: Set("Too many failed login attempts".to_string()),
        failed_attempts: Set(failures as i32),
        created_at: Set(now_str()),
    };
    AccountLockout::insert(lockout)
        .on_conflict(
            OnConflict::column(account_lockout::Column::UserId)
                .update_columns([
                    account_lockout::Column::LockedUntil,
                    account_lockout::Column::Reason,
                    account_lockout::Column::FailedAttempts,
                    account_lockout::Column::CreatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    tracing::warn!("Locked account {} after {} failed logins", user.email, failures);
    audit(
        db,
        Some(&user.id),
        audit_log::ACCOUNT_LOCKED,
        audit_log::SEVERITY_WARNING,
        client,
        json!({ "failed_attempts": failures }),
    )
    .await;
    Ok(true)
}

pub async fn login_history(
    db: &DatabaseConnection,
    user: &user::Model,
    limit: u64,
) -> Result<Vec<login_attempt::Model>, DomainError> {
    Ok(LoginAttempt::find()
        .filter(
            Condition::any()
                .add(login_attempt::Column::UserId.eq(user.id.as_str()))
                .add(login_attempt::Column::Email.eq(user.email.as_str())),
        )
        .order_by_desc(login_attempt::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?)
}

// ---------------------------------------------------------------------------
// Two-factor authentication
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TwoFactorSetup {
    pub secret: String,
    pub qr_uri: String,
    pub method: String,
}

fn build_totp(secret: &str, account: &str) -> Result<TOTP, DomainError> {
    let bytes = TotpSecret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| DomainError::Internal(format!("Invalid TOTP secret: {:?}", e)))?;
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        bytes,
        Some(TOTP_ISSUER.to_string()),
        account.to_string(),
    )
    .map_err(|e| DomainError::Internal(format!("Invalid TOTP parameters: {}", e)))
}

/// Uppercase hex `XXXXXXXX-XXXXXXXX` codes.
pub fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            let mut buf = [0u8; 8];
            rng.fill_bytes(&mut buf);
            let code = hex::encode_upper(buf);
            format!("{}-{}", &code[..8], &code[8..])
        })
        .collect()
}

pub fn hash_backup_code(code: &str) -> String {
    let normalized: String = code
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    sha256_hex(&normalized)
}

pub async fn get_2fa_config(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<two_factor_config::Model>, DomainError> {
    Ok(TwoFactorConfig::find_by_id(user_id.to_string()).one(db).await?)
}

pub async fn is_2fa_enabled(db: &DatabaseConnection, user_id: &str) -> Result<bool, DomainError> {
    Ok(get_2fa_config(db, user_id)
        .await?
        .is_some_and(|c| c.is_enabled))
}

pub async fn two_factor_status(db: &DatabaseConnection, user_id: &str) -> Result<Value, DomainError> {
    let config = get_2fa_config(db, user_id).await?;
    Ok(match config {
        Some(c) => json!({
            "enabled": c.is_enabled,
            "method": c.method,
            "backup_codes_remaining": c.backup_codes_count,
            "last_used_at": c.last_used_at,
            "setup_completed_at": c.setup_completed_at,
        }),
        None => json!({
            "enabled": false,
            "method": null,
            "backup_codes_remaining": 0,
            "last_used_at": null,
            "setup_completed_at": null,
        }),
    })
}

pub async fn setup_2fa(
    db: &DatabaseConnection,
    user: &user::Model,
) -> Result<TwoFactorSetup, DomainError> {
    let existing = get_2fa_config(db, &user.id).await?;
    if existing.as_ref().is_some_and(|c| c.is_enabled) {
        return Err(DomainError::BusinessRule("2FA is already enabled".to_string()));
    }

    let secret = TotpSecret::generate_secret().to_encoded().to_string();
    let totp = build_totp(&secret, &user.email)?;
    let now = now_str();

    match existing {
        Some(config) => {
            let mut active: two_factor_config::ActiveModel = config.into();
            active.secret = Set(secret.clone());
            active.method = Set("totp".to_string());
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            two_factor_config::ActiveModel {
                user_id: Set(user.id.clone()),
                is_enabled: Set(false),
                method: Set("totp".to_string()),
                secret: Set(secret.clone()),
                backup_codes: Set("[]".to_string()),
                backup_codes_count: Set(0),
                last_used_at: Set(None),
                setup_completed_at: Set(None),
                created_at: Set(now.clone()),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
        }
    }

    Ok(TwoFactorSetup {
        secret,
        qr_uri: totp.get_url(),
        method: "totp".to_string(),
    })
}

/// Check a TOTP code against the user's stored secret.
pub async fn verify_totp(
    db: &DatabaseConnection,
    user_id: &str,
    code: &str,
) -> Result<bool, DomainError> {
    let Some(config) = get_2fa_config(db, user_id).await? else {
        return Ok(false);
    };
    let totp = build_totp(&config.secret, user_id)?;
    let valid = totp
        .check_current(code.trim())
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    if valid && config.is_enabled {
        let mut active: two_factor_config::ActiveModel = config.into();
        active.last_used_at = Set(Some(now_str()));
        active.update(db).await?;
    }
    Ok(valid)
}

async fn store_backup_codes(
    db: &DatabaseConnection,
    config: two_factor_config::Model,
    enable: bool,
) -> Result<Vec<String>, DomainError> {
    let codes = generate_backup_codes();
    let hashes: Vec<String> = codes.iter().map(|c| hash_backup_code(c)).collect();
    let now = now_str();

    let mut active: two_factor_config::ActiveModel = config.into();
    active.backup_codes = Set(json!(hashes).to_string());
    active.backup_codes_count = Set(codes.len() as i32);
    active.updated_at = Set(now.clone());
    if enable {
        active.is_enabled = Set(true);
        active.setup_completed_at = Set(Some(now));
    }
    active.update(db).await?;
    Ok(codes)
}

pub async fn enable_2fa(
    db: &DatabaseConnection,
    user: &user::Model,
    code: &str,
    client: &ClientInfo,
) -> Result<Vec<String>, DomainError> {
    let config = get_2fa_config(db, &user.id)
        .await?
        .ok_or_else(|| DomainError::BusinessRule("2FA setup has not been started".to_string()))?;

    if !verify_totp(db, &user.id, code).await? {
        return Err(DomainError::auth("INVALID_2FA_CODE", "Invalid verification code"));
    }

    let codes = store_backup_codes(db, config, true).await?;
    tracing::info!("2FA enabled for user {}", user.id);
    audit(
        db,
        Some(&user.id),
        audit_log::TWO_FA_ENABLED,
        audit_log::SEVERITY_INFO,
        client,
        json!({ "method": "totp" }),
    )
    .await;
    Ok(codes)
}

fn check_password(user: &user::Model, password: &str) -> Result<(), DomainError> {
    let ok = match &user.password_hash {
        Some(hash) => verify_password(password, hash).map_err(DomainError::Internal)?,
        None => false,
    };
    if !ok {
        return Err(DomainError::Validation("Password incorrect".to_string()));
    }
    Ok(())
}

pub async fn disable_2fa(
    db: &DatabaseConnection,
    user: &user::Model,
    password: &str,
    client: &ClientInfo,
) -> Result<(), DomainError> {
    check_password(user, password)?;

    TwoFactorConfig::delete_by_id(user.id.clone()).exec(db).await?;
    tracing::info!("2FA disabled for user {}", user.id);
    audit(
        db,
        Some(&user.id),
        audit_log::TWO_FA_DISABLED,
        audit_log::SEVERITY_WARNING,
        client,
        json!({}),
    )
    .await;
    Ok(())
}

/// Consume a backup code. Dashes and case are ignored.
pub async fn verify_backup_code(
    db: &DatabaseConnection,
    user_id: &str,
    code: &str,
) -> Result<bool, DomainError> {
    let Some(config) = get_2fa_config(db, user_id).await? else {
        return Ok(false);
    };
    if !config.is_enabled {
        return Ok(false);
    }

    let digest = hash_backup_code(code);
    let mut hashes = config.backup_hashes();
    let Some(pos) = hashes.iter().position(|h| *h == digest) else {
        return Ok(false);
    };
    hashes.remove(pos);

    let mut active: two_factor_config::ActiveModel = config.into();
    active.backup_codes_count = Set(hashes.len() as i32);
    active.backup_codes = Set(json!(hashes).to_string());
    active.last_used_at = Set(Some(now_str()));
    active.update(db).await?;
    Ok(true)
}

pub async fn regenerate_backup_codes(
    db: &DatabaseConnection,
    user: &user::Model,
    password: &str,
) -> Result<Vec<String>, DomainError> {
    let config = get_2fa_config(db, &user.id)
        .await?
        .filter(|c| c.is_enabled)
        .ok_or_else(|| DomainError::BusinessRule("2FA is not enabled".to_string()))?;
    check_password(user, password)?;
    store_backup_codes(db, config, false).await
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

pub struct CreatedApiKey {
    pub key: api_key::Model,
    /// Shown once, never stored
    pub raw_key: String,
}

pub async fn create_api_key(
    db: &DatabaseConnection,
    user: &user::Model,
    name: &str,
    permission: &str,
    allowed_ips: Vec<String>,
    expires_days: Option<i64>,
    client: &ClientInfo,
) -> Result<CreatedApiKey, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("Name is required".to_string()));
    }
    if !api_key::PERMISSIONS.contains(&permission) {
        return Err(DomainError::Validation(format!("Invalid permission: {}", permission)));
    }
    if permission == "admin" && !user.is_admin() {
        return Err(DomainError::PermissionDenied(
            "Only admins can create admin keys".to_string(),
        ));
    }
    if let Some(days) = expires_days
        && days <= 0
    {
        return Err(DomainError::Validation("expires_days must be positive".to_string()));
    }

    let raw_key = format!("{}{}", API_KEY_PREFIX, random_url_token(32));
    let key = api_key::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user.id.clone()),
        name: Set(name.to_string()),
        key_prefix: Set(raw_key[..12].to_string()),
        key_hash: Set(sha256_hex(&raw_key)),
        permission: Set(permission.to_string()),
        allowed_ips: Set(json!(allowed_ips).to_string()),
        rate_limit: Set(1000),
        expires_at: Set(expires_days.map(|d| from_now(Duration::days(d)))),
        is_active: Set(true),
        usage_count: Set(0),
        last_used_at: Set(None),
        created_at: Set(now_str()),
    }
    .insert(db)
    .await?;

    tracing::info!("API key {} created for user {}", key.key_prefix, user.id);
    audit(
        db,
        Some(&user.id),
        audit_log::API_KEY_CREATED,
        audit_log::SEVERITY_INFO,
        client,
        json!({ "key_id": key.id, "name": key.name, "permission": key.permission }),
    )
    .await;

    Ok(CreatedApiKey { key, raw_key })
}

/// Resolve a raw key, enforcing status, expiry and the IP allow-list.
pub async fn verify_api_key(
    db: &DatabaseConnection,
    raw_key: &str,
    ip: &str,
) -> Result<Option<api_key::Model>, DomainError> {
    if !raw_key.starts_with(API_KEY_PREFIX) || raw_key.len() < 12 {
        return Ok(None);
    }

    let Some(key) = ApiKey::find()
        .filter(api_key::Column::KeyPrefix.eq(&raw_key[..12]))
        .filter(api_key::Column::KeyHash.eq(sha256_hex(raw_key)))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if !key.is_active {
        return Ok(None);
    }
    if let Some(expires_at) = key.expires_at.as_deref().and_then(parse_ts)
        && expires_at <= Utc::now()
    {
        return Ok(None);
    }
    let allowed = key.allowed_ip_list();
    if !allowed.is_empty() && !allowed.iter().any(|a| a == ip) {
        tracing::warn!("API key {} used from disallowed IP {}", key.key_prefix, ip);
        return Ok(None);
    }

    ApiKey::update_many()
        .col_expr(
            api_key::Column::UsageCount,
            Expr::col(api_key::Column::UsageCount).add(1),
        )
        .col_expr(api_key::Column::LastUsedAt, Expr::value(now_str()))
        .filter(api_key::Column::Id.eq(key.id.as_str()))
        .exec(db)
        .await?;

    Ok(Some(key))
}

pub async fn list_api_keys(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<api_key::Model>, DomainError> {
    Ok(ApiKey::find()
        .filter(api_key::Column::UserId.eq(user_id))
        .filter(api_key::Column::IsActive.eq(true))
        .order_by_desc(api_key::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn revoke_api_key(
    db: &DatabaseConnection,
    user_id: &str,
    key_id: &str,
    client: &ClientInfo,
) -> Result<(), DomainError> {
    let key = ApiKey::find_by_id(key_id.to_string())
        .filter(api_key::Column::UserId.eq(user_id))
        .filter(api_key::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("API key"))?;

    let prefix = key.key_prefix.clone();
    let mut active: api_key::ActiveModel = key.into();
    active.is_active = Set(false);
    active.update(db).await?;

    tracing::info!("API key {} revoked", prefix);
    audit(
        db,
        Some(user_id),
        audit_log::API_KEY_REVOKED,
        audit_log::SEVERITY_INFO,
        client,
        json!({ "key_id": key_id }),
    )
    .await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Trusted devices
// ---------------------------------------------------------------------------

pub async fn create_trusted_device(
    db: &DatabaseConnection,
    user_id: &str,
    device_name: &str,
    ip: &str,
) -> Result<trusted_device::Model, DomainError> {
    let now = now_str();
    Ok(trusted_device::ActiveModel {
        user_id: Set(user_id.to_string()),
        device_token: Set(random_url_token(32)),
        device_name: Set(device_name.to_string()),
        ip_address: Set(ip.to_string()),
        trusted_until: Set(from_now(Duration::days(TRUSTED_DEVICE_DAYS))),
        last_used_at: Set(Some(now.clone())),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// True when `token` is a live trusted device of the user; touches `last_used_at`.
pub async fn validate_trusted_device(
    db: &DatabaseConnection,
    user_id: &str,
    token: &str,
) -> Result<bool, DomainError> {
    let device = TrustedDevice::find()
        .filter(trusted_device::Column::UserId.eq(user_id))
        .filter(trusted_device::Column::DeviceToken.eq(token))
        .filter(trusted_device::Column::TrustedUntil.gt(now_str()))
        .one(db)
        .await?;

    match device {
        Some(device) => {
            let mut active: trusted_device::ActiveModel = device.into();
            active.last_used_at = Set(Some(now_str()));
            active.update(db).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

pub async fn list_trusted_devices(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<trusted_device::Model>, DomainError> {
    Ok(TrustedDevice::find()
        .filter(trusted_device::Column::UserId.eq(user_id))
        .filter(trusted_device::Column::TrustedUntil.gt(now_str()))
        .order_by_desc(trusted_device::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn revoke_trusted_device(
    db: &DatabaseConnection,
    user_id: &str,
    device_id: i32,
) -> Result<(), DomainError> {
    let result = TrustedDevice::delete_many()
        .filter(trusted_device::Column::Id.eq(device_id))
        .filter(trusted_device::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Device"));
    }
    Ok(())
}

pub async fn revoke_all_trusted_devices(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<u64, DomainError> {
    let result = TrustedDevice::delete_many()
        .filter(trusted_device::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

// ---------------------------------------------------------------------------
// Overview and reports
// ---------------------------------------------------------------------------

pub async fn overview(db: &DatabaseConnection, user: &user::Model) -> Result<Value, DomainError> {
    let config = get_2fa_config(db, &user.id).await?;
    let trusted_devices_count = TrustedDevice::find()
        .filter(trusted_device::Column::UserId.eq(user.id.as_str()))
        .filter(trusted_device::Column::TrustedUntil.gt(now_str()))
        .count(db)
        .await?;
    let api_keys_count = ApiKey::find()
        .filter(api_key::Column::UserId.eq(user.id.as_str()))
        .filter(api_key::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let last_login = LoginAttempt::find()
        .filter(login_attempt::Column::UserId.eq(user.id.as_str()))
        .filter(login_attempt::Column::Success.eq(true))
        .order_by_desc(login_attempt::Column::CreatedAt)
        .one(db)
        .await?;

    Ok(json!({
        "two_factor_enabled": config.as_ref().is_some_and(|c| c.is_enabled),
        "backup_codes_remaining": config.as_ref().map(|c| c.backup_codes_count).unwrap_or(0),
        "trusted_devices_count": trusted_devices_count,
        "api_keys_count": api_keys_count,
        "last_login": last_login.map(|l| json!({
            "at": l.created_at,
            "ip_address": l.ip_address,
            "user_agent": l.user_agent,
        })),
    }))
}

/// Store a browser CSP violation report (`{"csp-report": {...}}` or a bare object).
pub async fn store_csp_report(
    db: &DatabaseConnection,
    payload: &Value,
    ip: &str,
) -> Result<(), DomainError> {
    let report = payload.get("csp-report").unwrap_or(payload);
    let field = |key: &str| {
        report
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .chars()
            .take(500)
            .collect::<String>()
    };

    let row = csp_report::ActiveModel {
        document_uri: Set(field("document-uri")),
        violated_directive: Set(field("violated-directive")),
        blocked_uri: Set(field("blocked-uri")),
        source_file: Set(report
            .get("source-file")
            .and_then(|v| v.as_str())
            .map(str::to_string)),
        line_number: Set(report
            .get("line-number")
            .and_then(|v| v.as_i64())
            .map(|n| n as i32)),
        raw_report: Set(payload.to_string()),
        ip_address: Set(ip.to_string()),
        created_at: Set(now_str()),
        ..Default::default()
    };
    csp_report::Entity::insert(row).exec_without_returning(db).await?;
    tracing::debug!("CSP violation reported from {}", ip);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_code_shape() {
        let codes = generate_backup_codes();
        assert_eq!(codes.len(), BACKUP_CODE_COUNT);
        for code in &codes {
            assert_eq!(code.len(), 17);
            assert_eq!(&code[8..9], "-");
            assert!(
                code.chars()
                    .filter(|c| *c != '-')
                    .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
            );
        }
    }

    #[test]
    fn backup_hash_ignores_dash_and_case() {
        assert_eq!(
            hash_backup_code("ABCDEF01-23456789"),
            hash_backup_code("abcdef0123456789")
        );
        assert_eq!(hash_backup_code("ABCDEF0123456789"), sha256_hex("ABCDEF0123456789"));
    }

    #[test]
    fn url_tokens_have_expected_length() {
        assert_eq!(random_url_token(32).len(), 43);
        assert_ne!(random_url_token(32), random_url_token(32));
    }

    #[test]
    fn totp_accepts_current_code() {
        let secret = TotpSecret::generate_secret().to_encoded().to_string();
        let totp = build_totp(&secret, "lan@example.vn").unwrap();
        let code = totp.generate_current().unwrap();
        assert!(totp.check_current(&code).unwrap());
        assert!(totp.get_url().contains("OWLS"));
    }
}
