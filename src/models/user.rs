use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // None for accounts created through social login
    pub first_name: String,
    pub last_name: String,
    pub role: String, // 'customer', 'admin'
    pub is_active: bool,
    pub is_email_verified: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// "Lan N." style name shown next to public content.
    pub fn display_name(&self) -> String {
        let last_initial = self.last_name.chars().next();
        match (self.first_name.is_empty(), last_initial) {
            (false, Some(initial)) => format!("{} {}.", self.first_name, initial),
            (false, None) => self.first_name.clone(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub role: String,
    pub is_email_verified: bool,
    pub has_password: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<&Model> for UserDto {
    fn from(u: &Model) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            name: u.full_name(),
            role: u.role.clone(),
            is_email_verified: u.is_email_verified,
            has_password: u.password_hash.is_some(),
            last_login_at: u.last_login_at.clone(),
            created_at: u.created_at.clone(),
        }
    }
}
