use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ACTION_LOGIN: &str = "login";
pub const ACTION_REGISTER: &str = "register";
pub const ACTION_LINK: &str = "link";

/// Single-use CSRF token for an authorization round trip
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub state: String,
    pub provider: String,
    pub user_id: Option<String>,
    pub redirect_uri: String,
    pub next_url: String,
    pub action: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
