use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provider credentials managed from the admin, taking precedence over env vars
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_provider_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub scopes: Option<String>, // space separated override
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
