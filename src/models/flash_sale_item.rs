use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const UNLIMITED_REMAINING: i64 = 999_999;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flash_sale_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub flash_sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub flash_price: i64,
    pub original_price: i64,
    pub quantity_limit: i32, // 0 = unlimited
    pub quantity_sold: i32,
    pub per_user_limit: i32,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::flash_sale::Entity",
        from = "Column::FlashSaleId",
        to = "super::flash_sale::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    FlashSale,
}

impl Related<super::flash_sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FlashSale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn discount_percentage(&self) -> i64 {
        if self.original_price <= 0 {
            return 0;
        }
        (self.original_price - self.flash_price) * 100 / self.original_price
    }

    pub fn remaining(&self) -> i64 {
        if self.quantity_limit == 0 {
            return UNLIMITED_REMAINING;
        }
        i64::from((self.quantity_limit - self.quantity_sold).max(0))
    }

    pub fn is_sold_out(&self) -> bool {
        self.quantity_limit > 0 && self.quantity_sold >= self.quantity_limit
    }

    pub fn sold_percentage(&self) -> i64 {
        if self.quantity_limit == 0 {
            return 0;
        }
        (i64::from(self.quantity_sold) * 100 / i64::from(self.quantity_limit)).min(100)
    }

    pub fn to_dto(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "flash_sale_id": self.flash_sale_id,
            "product_id": self.product_id,
            "product_name": self.product_name,
            "flash_price": self.flash_price,
            "original_price": self.original_price,
            "discount_percentage": self.discount_percentage(),
            "quantity_limit": self.quantity_limit,
            "quantity_sold": self.quantity_sold,
            "remaining_quantity": self.remaining(),
            "is_sold_out": self.is_sold_out(),
            "sold_percentage": self.sold_percentage(),
            "per_user_limit": self.per_user_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(limit: i32, sold: i32) -> Model {
        Model {
            id: 1,
            flash_sale_id: "f".into(),
            product_id: "p".into(),
            product_name: "Owl mug".into(),
            flash_price: 70_000,
            original_price: 100_000,
            quantity_limit: limit,
            quantity_sold: sold,
            per_user_limit: 2,
            is_active: true,
            sort_order: 0,
        }
    }

    #[test]
    fn stock_figures() {
        let i = item(10, 4);
        assert_eq!(i.discount_percentage(), 30);
        assert_eq!(i.remaining(), 6);
        assert_eq!(i.sold_percentage(), 40);
        assert!(!i.is_sold_out());
        assert!(item(10, 10).is_sold_out());
    }

    #[test]
    fn unlimited_stock() {
        let i = item(0, 500);
        assert_eq!(i.remaining(), UNLIMITED_REMAINING);
        assert_eq!(i.sold_percentage(), 0);
        assert!(!i.is_sold_out());
    }
}
