use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUSES: &[&str] = &["pending", "confirmed", "transferred", "disputed"];

/// Carrier COD settlement for one day
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cod_reconciliations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub provider: String,
    pub reconciliation_date: String, // YYYY-MM-DD, unique with provider
    pub status: String,
    pub total_orders: i32,
    pub total_cod: i64,
    pub total_shipping_fee: i64,
    pub net_amount: i64,
    pub transferred_at: Option<String>,
    pub transfer_reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
