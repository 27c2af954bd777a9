use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUSES: &[&str] = &[
    "pending",
    "confirmed",
    "processing",
    "ready_to_ship",
    "shipping",
    "delivered",
    "completed",
    "cancelled",
    "refunded",
    "failed",
];
pub const PAYMENT_METHODS: &[&str] = &["cod", "vnpay", "momo", "stripe"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub order_number: String,
    pub user_id: Option<String>,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String, // 'unpaid', 'pending', 'paid', 'failed', 'refunded'
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub total: i64,
    pub coupon_code: Option<String>,
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub ward_code: Option<String>,
    pub delivered_at: Option<String>,
    pub paid_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
