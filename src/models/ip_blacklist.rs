use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const REASONS: &[&str] = &["brute_force", "spam", "abuse", "fraud", "manual"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ip_blacklist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub ip_address: String,
    pub reason: String,
    pub description: String,
    pub is_permanent: bool,
    pub blocked_until: Option<String>,
    pub block_count: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
