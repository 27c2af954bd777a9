use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const REASONS: &[&str] = &["spam", "offensive", "fake", "irrelevant", "other"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub review_id: String,
    pub user_id: String,
    pub reason: String,
    pub description: String,
    pub status: String, // 'pending', 'reviewed', 'resolved', 'dismissed'
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
