use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const FAIL_REASONS: &[&str] = &[
    "not_home",
    "wrong_address",
    "phone_unreachable",
    "refused",
    "insufficient_cod",
    "rescheduled",
    "weather",
    "other",
];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub shipment_id: String,
    pub attempt_number: i32, // unique per shipment
    pub attempted_at: String,
    pub fail_reason: String,
    pub notes: Option<String>,
    pub rescheduled_to: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
