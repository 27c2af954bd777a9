use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const PERMISSIONS: &[&str] = &["read", "write", "admin"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub key_prefix: String,
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub permission: String,
    pub allowed_ips: String, // JSON array, empty = any
    pub rate_limit: i32,     // requests per hour
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub usage_count: i32,
    pub last_used_at: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn allowed_ip_list(&self) -> Vec<String> {
        serde_json::from_str(&self.allowed_ips).unwrap_or_default()
    }

    pub fn to_dto(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "key_prefix": self.key_prefix,
            "permission": self.permission,
            "allowed_ips": self.allowed_ip_list(),
            "rate_limit": self.rate_limit,
            "expires_at": self.expires_at,
            "usage_count": self.usage_count,
            "last_used_at": self.last_used_at,
            "created_at": self.created_at,
        })
    }
}
