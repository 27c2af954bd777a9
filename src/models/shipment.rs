use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::time::parse_ts;

pub const PROVIDERS: &[&str] = &["ghn", "ghtk", "vtp", "vnpost", "jnt", "ninjavan", "manual"];
pub const DEFAULT_PROVIDER: &str = "ghn";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PICKING: &str = "picking";
pub const STATUS_PICKED_UP: &str = "picked_up";
pub const STATUS_IN_TRANSIT: &str = "in_transit";
pub const STATUS_SORTING: &str = "sorting";
pub const STATUS_OUT_FOR_DELIVERY: &str = "out_for_delivery";
pub const STATUS_DELIVERED: &str = "delivered";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_WAITING_RETURN: &str = "waiting_return";
pub const STATUS_RETURNING: &str = "returning";
pub const STATUS_RETURNED: &str = "returned";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_EXCEPTION: &str = "exception";

pub const STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_PICKING,
    STATUS_PICKED_UP,
    STATUS_IN_TRANSIT,
    STATUS_SORTING,
    STATUS_OUT_FOR_DELIVERY,
    STATUS_DELIVERED,
    STATUS_FAILED,
    STATUS_WAITING_RETURN,
    STATUS_RETURNING,
    STATUS_RETURNED,
    STATUS_CANCELLED,
    STATUS_EXCEPTION,
];

pub const ACTIVE_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_PICKING,
    STATUS_PICKED_UP,
    STATUS_IN_TRANSIT,
    STATUS_SORTING,
    STATUS_OUT_FOR_DELIVERY,
];
pub const FINAL_STATUSES: &[&str] = &[STATUS_DELIVERED, STATUS_RETURNED, STATUS_CANCELLED];
pub const FAILED_STATUSES: &[&str] = &[STATUS_FAILED, STATUS_EXCEPTION];
pub const RETURN_STATUSES: &[&str] = &[STATUS_WAITING_RETURN, STATUS_RETURNING, STATUS_RETURNED];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub order_id: String,
    pub provider: String,
    #[sea_orm(unique)]
    pub tracking_code: String,
    pub provider_order_id: Option<String>,
    pub status: String,
    pub provider_status: Option<String>,
    pub weight: i32, // grams
    pub dimensions: Option<String>,
    pub shipping_fee: i64,
    pub insurance_fee: i64,
    pub cod_fee: i64,
    pub total_fee: i64,
    pub cod_amount: i64,
    pub cod_collected: bool,
    pub cod_transferred: bool,
    pub cod_transfer_date: Option<String>,
    pub service_id: Option<i32>,
    pub service_type: Option<String>,
    pub expected_delivery: Option<String>,
    pub delivery_attempts: i32,
    pub max_delivery_attempts: i32,
    pub required_note: String,
    pub note: Option<String>,
    pub picked_up_at: Option<String>,
    pub delivered_at: Option<String>,
    pub returned_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub last_location: Option<String>,
    pub last_status_update: Option<String>,
    pub fail_reason: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(has_many = "super::shipment_event::Entity")]
    Events,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::shipment_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_delivered(&self) -> bool {
        self.status == STATUS_DELIVERED
    }

    pub fn is_failed(&self) -> bool {
        FAILED_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_returned(&self) -> bool {
        RETURN_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_final(&self) -> bool {
        FINAL_STATUSES.contains(&self.status.as_str())
    }

    pub fn can_cancel(&self) -> bool {
        self.status == STATUS_PENDING || self.status == STATUS_PICKING
    }

    pub fn can_retry(&self) -> bool {
        self.status == STATUS_FAILED && self.delivery_attempts < self.max_delivery_attempts
    }

    /// Whole days since pickup, up to delivery if it happened.
    pub fn days_in_transit(&self) -> Option<i64> {
        let picked = parse_ts(self.picked_up_at.as_deref()?)?;
        let end = self
            .delivered_at
            .as_deref()
            .and_then(parse_ts)
            .unwrap_or_else(Utc::now);
        Some((end - picked).num_days())
    }

    pub fn tracking_url(&self) -> String {
        let code = urlencoding::encode(&self.tracking_code);
        match self.provider.as_str() {
            "ghn" => format!("https://donhang.ghn.vn/?order_code={}", code),
            "ghtk" => format!("https://i.ghtk.vn/{}", code),
            "vtp" => format!("https://viettelpost.vn/tra-cuu?code={}", code),
            _ => String::new(),
        }
    }

    pub fn to_dto(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("tracking_url".into(), self.tracking_url().into());
            obj.insert("is_final".into(), self.is_final().into());
            obj.insert("can_cancel".into(), self.can_cancel().into());
            obj.insert("can_retry".into(), self.can_retry().into());
            obj.insert("days_in_transit".into(), self.days_in_transit().into());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample(status: &str) -> Model {
        Model {
            id: "s1".into(),
            order_id: "o1".into(),
            provider: "ghn".into(),
            tracking_code: "SHPABC12345".into(),
            provider_order_id: None,
            status: status.into(),
            provider_status: None,
            weight: 500,
            dimensions: None,
            shipping_fee: 30000,
            insurance_fee: 0,
            cod_fee: 0,
            total_fee: 30000,
            cod_amount: 0,
            cod_collected: false,
            cod_transferred: false,
            cod_transfer_date: None,
            service_id: None,
            service_type: None,
            expected_delivery: None,
            delivery_attempts: 0,
            max_delivery_attempts: 3,
            required_note: "CHOTHUHANG".into(),
            note: None,
            picked_up_at: None,
            delivered_at: None,
            returned_at: None,
            cancelled_at: None,
            last_location: None,
            last_status_update: None,
            fail_reason: None,
            cancel_reason: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn status_groups() {
        assert!(sample(STATUS_PICKING).can_cancel());
        assert!(!sample(STATUS_IN_TRANSIT).can_cancel());
        assert!(sample(STATUS_EXCEPTION).is_failed());
        assert!(sample(STATUS_RETURNING).is_returned());
        assert!(sample(STATUS_CANCELLED).is_final());
        assert!(sample(STATUS_PENDING).is_active());
    }

    #[test]
    fn retry_respects_attempt_budget() {
        let mut s = sample(STATUS_FAILED);
        s.delivery_attempts = 2;
        assert!(s.can_retry());
        s.delivery_attempts = 3;
        assert!(!s.can_retry());
    }

    #[test]
    fn tracking_urls_per_provider() {
        let mut s = sample(STATUS_PENDING);
        assert_eq!(
            s.tracking_url(),
            "https://donhang.ghn.vn/?order_code=SHPABC12345"
        );
        s.provider = "vtp".into();
        assert_eq!(s.tracking_url(), "https://viettelpost.vn/tra-cuu?code=SHPABC12345");
        s.provider = "manual".into();
        assert_eq!(s.tracking_url(), "");
    }

    #[test]
    fn transit_days_stop_at_delivery() {
        let mut s = sample(STATUS_DELIVERED);
        s.picked_up_at = Some("2024-03-01T08:00:00.000000Z".into());
        s.delivered_at = Some("2024-03-04T09:00:00.000000Z".into());
        assert_eq!(s.days_in_transit(), Some(3));
    }
}
