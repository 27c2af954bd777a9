use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::text::format_thousands;
use crate::utils::time::parse_ts;

pub const TYPE_PERCENTAGE: &str = "percentage";
pub const TYPE_FIXED: &str = "fixed";
pub const TYPE_FREE_SHIPPING: &str = "free_shipping";
pub const DISCOUNT_TYPES: &[&str] = &[TYPE_PERCENTAGE, TYPE_FIXED, TYPE_FREE_SHIPPING];
pub const APPLY_TO: &[&str] = &["all", "category", "product"];

pub const UNLIMITED_USES: i64 = 999_999;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String, // stored uppercase
    pub name: String,
    pub description: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub min_order_value: i64,
    pub max_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: i32,
    pub used_count: i32,
    pub valid_from: String,
    pub valid_until: String,
    pub apply_to: String,
    pub first_order_only: bool,
    pub is_active: bool,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Per-user facts needed to decide whether a coupon applies.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsageContext {
    pub user_usage_count: i64,
    pub has_previous_orders: bool,
    /// None when the coupon is not restricted to specific users
    pub user_is_listed: Option<bool>,
}

impl Model {
    /// Checks run in a fixed order; the first failure is reported.
    pub fn check_usable(
        &self,
        now: DateTime<Utc>,
        order_total: i64,
        ctx: UsageContext,
    ) -> Result<(), String> {
        if !self.is_active {
            return Err("Coupon is not active".into());
        }
        if parse_ts(&self.valid_from).is_some_and(|from| now < from) {
            return Err("Coupon is not yet valid".into());
        }
        if parse_ts(&self.valid_until).is_some_and(|until| now > until) {
            return Err("Coupon has expired".into());
        }
        if let Some(limit) = self.usage_limit
            && self.used_count >= limit
        {
            return Err("Coupon usage limit reached".into());
        }
        if order_total < self.min_order_value {
            return Err(format!(
                "Minimum order value: {}₫",
                format_thousands(self.min_order_value)
            ));
        }
        if ctx.user_usage_count >= i64::from(self.usage_limit_per_user) {
            return Err("You have reached usage limit for this coupon".into());
        }
        if self.first_order_only && ctx.has_previous_orders {
            return Err("This coupon is for first order only".into());
        }
        if ctx.user_is_listed == Some(false) {
            return Err("Invalid coupon code".into());
        }
        Ok(())
    }

    pub fn calculate_discount(&self, order_total: i64, shipping_fee: i64) -> i64 {
        if order_total < self.min_order_value {
            return 0;
        }

        let discount = match self.discount_type.as_str() {
            TYPE_PERCENTAGE => order_total * self.discount_value / 100,
            TYPE_FREE_SHIPPING => shipping_fee,
            _ => self.discount_value,
        };

        match self.max_discount {
            Some(cap) => discount.min(cap),
            None => discount,
        }
    }

    pub fn discount_display(&self) -> String {
        match self.discount_type.as_str() {
            TYPE_PERCENTAGE => format!("{}%", self.discount_value),
            TYPE_FREE_SHIPPING => "Free Shipping".to_string(),
            _ => format!("{}₫", format_thousands(self.discount_value)),
        }
    }

    pub fn remaining_uses(&self) -> i64 {
        match self.usage_limit {
            Some(limit) => i64::from((limit - self.used_count).max(0)),
            None => UNLIMITED_USES,
        }
    }

    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        parse_ts(&self.valid_until)
            .map(|until| (until - now).num_days().max(0))
            .unwrap_or(0)
    }

    pub fn to_dto(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "code": self.code,
            "name": self.name,
            "description": self.description,
            "discount_type": self.discount_type,
            "discount_value": self.discount_value,
            "discount_display": self.discount_display(),
            "min_order_value": self.min_order_value,
            "max_discount": self.max_discount,
            "valid_from": self.valid_from,
            "valid_until": self.valid_until,
            "remaining_uses": self.remaining_uses(),
            "days_until_expiry": self.days_until_expiry(Utc::now()),
            "first_order_only": self.first_order_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(kind: &str, value: i64) -> Model {
        Model {
            id: 1,
            code: "WELCOME".into(),
            name: "Welcome".into(),
            description: String::new(),
            discount_type: kind.into(),
            discount_value: value,
            min_order_value: 100_000,
            max_discount: None,
            usage_limit: Some(10),
            usage_limit_per_user: 1,
            used_count: 0,
            valid_from: "2020-01-01T00:00:00.000000Z".into(),
            valid_until: "2099-01-01T00:00:00.000000Z".into(),
            apply_to: "all".into(),
            first_order_only: false,
            is_active: true,
            is_public: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn percentage_discount_is_capped() {
        let mut c = coupon(TYPE_PERCENTAGE, 10);
        assert_eq!(c.calculate_discount(500_000, 30_000), 50_000);
        c.max_discount = Some(20_000);
        assert_eq!(c.calculate_discount(500_000, 30_000), 20_000);
        assert_eq!(c.calculate_discount(50_000, 30_000), 0);
    }

    #[test]
    fn free_shipping_and_fixed() {
        assert_eq!(coupon(TYPE_FREE_SHIPPING, 0).calculate_discount(200_000, 35_000), 35_000);
        assert_eq!(coupon(TYPE_FIXED, 25_000).calculate_discount(200_000, 35_000), 25_000);
    }

    #[test]
    fn display_strings() {
        assert_eq!(coupon(TYPE_PERCENTAGE, 15).discount_display(), "15%");
        assert_eq!(coupon(TYPE_FIXED, 50_000).discount_display(), "50,000₫");
        assert_eq!(coupon(TYPE_FREE_SHIPPING, 0).discount_display(), "Free Shipping");
    }

    #[test]
    fn usability_checks_in_order() {
        let now = Utc::now();
        let mut c = coupon(TYPE_FIXED, 10_000);
        let ctx = UsageContext::default();

        assert_eq!(
            c.check_usable(now, 50_000, ctx).unwrap_err(),
            "Minimum order value: 100,000₫"
        );

        c.used_count = 10;
        assert_eq!(
            c.check_usable(now, 50_000, ctx).unwrap_err(),
            "Coupon usage limit reached"
        );

        c.is_active = false;
        assert_eq!(c.check_usable(now, 50_000, ctx).unwrap_err(), "Coupon is not active");
    }

    #[test]
    fn per_user_rules() {
        let now = Utc::now();
        let mut c = coupon(TYPE_FIXED, 10_000);
        let used = UsageContext {
            user_usage_count: 1,
            ..Default::default()
        };
        assert_eq!(
            c.check_usable(now, 200_000, used).unwrap_err(),
            "You have reached usage limit for this coupon"
        );

        c.first_order_only = true;
        let returning = UsageContext {
            has_previous_orders: true,
            ..Default::default()
        };
        assert_eq!(
            c.check_usable(now, 200_000, returning).unwrap_err(),
            "This coupon is for first order only"
        );

        c.first_order_only = false;
        let unlisted = UsageContext {
            user_is_listed: Some(false),
            ..Default::default()
        };
        assert_eq!(c.check_usable(now, 200_000, unlisted).unwrap_err(), "Invalid coupon code");
        assert!(c.check_usable(now, 200_000, UsageContext::default()).is_ok());
    }

    #[test]
    fn unlimited_coupon_reports_sentinel() {
        let mut c = coupon(TYPE_FIXED, 1);
        c.usage_limit = None;
        assert_eq!(c.remaining_uses(), UNLIMITED_USES);
    }
}
