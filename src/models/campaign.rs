use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::round2;

pub const TYPES: &[&str] = &["email", "sms", "push", "social", "ads"];
pub const STATUSES: &[&str] = &["draft", "scheduled", "active", "paused", "completed"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub campaign_type: String,
    pub status: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub budget: i64,
    pub target_audience: String, // JSON object
    pub coupon_id: Option<i32>,
    pub sent_count: i32,
    pub open_count: i32,
    pub click_count: i32,
    pub conversion_count: i32,
    pub revenue: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn rate(numerator: i32, denominator: i32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(f64::from(numerator) / f64::from(denominator) * 100.0)
}

impl Model {
    pub fn open_rate(&self) -> f64 {
        rate(self.open_count, self.sent_count)
    }

    pub fn click_rate(&self) -> f64 {
        rate(self.click_count, self.open_count)
    }

    pub fn conversion_rate(&self) -> f64 {
        rate(self.conversion_count, self.click_count)
    }

    pub fn to_dto(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "target_audience".into(),
                serde_json::from_str(&self.target_audience).unwrap_or_default(),
            );
            obj.insert("open_rate".into(), self.open_rate().into());
            obj.insert("click_rate".into(), self.click_rate().into());
            obj.insert("conversion_rate".into(), self.conversion_rate().into());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn funnel_rates() {
        let c = Model {
            id: "c".into(),
            name: "Tet".into(),
            description: String::new(),
            campaign_type: "email".into(),
            status: "active".into(),
            start_date: None,
            end_date: None,
            budget: 0,
            target_audience: "{}".into(),
            coupon_id: None,
            sent_count: 200,
            open_count: 50,
            click_count: 15,
            conversion_count: 2,
            revenue: 0,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(c.open_rate(), 25.0);
        assert_eq!(c.click_rate(), 30.0);
        assert_eq!(c.conversion_rate(), 13.33);
    }
}
