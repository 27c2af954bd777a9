use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::round2;

pub const POSITIONS: &[&str] = &["hero", "sidebar", "category", "popup", "footer"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "banners")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: String,
    pub image_mobile: Option<String>,
    pub link_url: Option<String>,
    pub link_text: Option<String>,
    pub position: String,
    pub category_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub view_count: i32,
    pub click_count: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn click_rate(&self) -> f64 {
        if self.view_count == 0 {
            return 0.0;
        }
        round2(f64::from(self.click_count) / f64::from(self.view_count) * 100.0)
    }

    pub fn to_dto(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("click_rate".into(), self.click_rate().into());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_rate_rounds() {
        let banner = Model {
            id: 1,
            title: "Sale".into(),
            subtitle: None,
            image: "/b.jpg".into(),
            image_mobile: None,
            link_url: None,
            link_text: None,
            position: "hero".into(),
            category_id: None,
            start_date: None,
            end_date: None,
            is_active: true,
            sort_order: 0,
            view_count: 3,
            click_count: 1,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(banner.click_rate(), 33.33);
    }
}
