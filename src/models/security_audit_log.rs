use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const LOGIN_SUCCESS: &str = "login_success";
pub const LOGIN_FAILED: &str = "login_failed";
pub const LOGOUT: &str = "logout";
pub const TWO_FA_ENABLED: &str = "2fa_enabled";
pub const TWO_FA_DISABLED: &str = "2fa_disabled";
pub const PASSWORD_CHANGED: &str = "password_changed";
pub const PASSWORD_RESET: &str = "password_reset";
pub const ACCOUNT_LOCKED: &str = "account_locked";
pub const ACCOUNT_UNLOCKED: &str = "account_unlocked";
pub const API_KEY_CREATED: &str = "api_key_created";
pub const API_KEY_REVOKED: &str = "api_key_revoked";
pub const SUSPICIOUS: &str = "suspicious";
pub const IP_BLOCKED: &str = "ip_blocked";

pub const SEVERITY_INFO: &str = "info";
pub const SEVERITY_WARNING: &str = "warning";
pub const SEVERITY_CRITICAL: &str = "critical";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "security_audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Option<String>,
    pub event_type: String,
    pub severity: String,
    pub ip_address: String,
    pub user_agent: String,
    pub details: String, // JSON object
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
