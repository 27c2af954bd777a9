use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Denormalised rating aggregate, rebuilt after each review mutation
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review_summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: String,
    pub total_reviews: i32,
    pub average_rating: f64,
    pub rating_1: i32,
    pub rating_2: i32,
    pub rating_3: i32,
    pub rating_4: i32,
    pub rating_5: i32,
    pub avg_quality: Option<f64>,
    pub avg_value: Option<f64>,
    pub avg_delivery: Option<f64>,
    pub verified_count: i32,
    pub with_images_count: i32,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn empty(product_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            total_reviews: 0,
            average_rating: 0.0,
            rating_1: 0,
            rating_2: 0,
            rating_3: 0,
            rating_4: 0,
            rating_5: 0,
            avg_quality: None,
            avg_value: None,
            avg_delivery: None,
            verified_count: 0,
            with_images_count: 0,
            updated_at: String::new(),
        }
    }

    /// Whole-number share of each star rating.
    pub fn rating_distribution(&self) -> serde_json::Value {
        let pct = |n: i32| {
            if self.total_reviews == 0 {
                0
            } else {
                n * 100 / self.total_reviews
            }
        };
        serde_json::json!({
            "5": pct(self.rating_5),
            "4": pct(self.rating_4),
            "3": pct(self.rating_3),
            "2": pct(self.rating_2),
            "1": pct(self.rating_1),
        })
    }

    pub fn to_dto(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("rating_distribution".into(), self.rating_distribution());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_is_integer_percent() {
        let mut s = Model::empty("p");
        s.total_reviews = 3;
        s.rating_5 = 2;
        s.rating_1 = 1;
        let d = s.rating_distribution();
        assert_eq!(d["5"], 66);
        assert_eq!(d["1"], 33);
        assert_eq!(d["3"], 0);
    }
}
