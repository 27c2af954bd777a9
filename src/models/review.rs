use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const MAX_IMAGES: usize = 5;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub product_id: String, // unique with user_id
    pub order_id: Option<String>,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub quality_rating: Option<i32>,
    pub value_rating: Option<i32>,
    pub delivery_rating: Option<i32>,
    pub is_verified_purchase: bool,
    pub is_approved: bool,
    pub is_rejected: bool,
    pub rejection_reason: Option<String>,
    pub moderated_by: Option<String>,
    pub moderated_at: Option<String>,
    pub helpful_count: i32,
    pub not_helpful_count: i32,
    pub is_featured: bool,
    pub is_pinned: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review_image::Entity")]
    Images,
}

impl Related<super::review_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn helpfulness_score(&self) -> i32 {
        self.helpful_count - self.not_helpful_count
    }

    pub fn helpful_percentage(&self) -> i32 {
        let total = self.helpful_count + self.not_helpful_count;
        if total == 0 {
            return 0;
        }
        self.helpful_count * 100 / total
    }

    pub fn moderation_status(&self) -> &'static str {
        if self.is_approved {
            "approved"
        } else if self.is_rejected {
            "rejected"
        } else {
            "pending"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpfulness() {
        let review = Model {
            id: "r".into(),
            user_id: "u".into(),
            product_id: "p".into(),
            order_id: None,
            rating: 5,
            title: String::new(),
            comment: String::new(),
            quality_rating: None,
            value_rating: None,
            delivery_rating: None,
            is_verified_purchase: false,
            is_approved: false,
            is_rejected: true,
            rejection_reason: None,
            moderated_by: None,
            moderated_at: None,
            helpful_count: 3,
            not_helpful_count: 1,
            is_featured: false,
            is_pinned: false,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(review.helpfulness_score(), 2);
        assert_eq!(review.helpful_percentage(), 75);
        assert_eq!(review.moderation_status(), "rejected");
    }
}
