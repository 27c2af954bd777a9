use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "districts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub province_code: String,
    pub name: String,
    pub name_with_type: String,
    pub slug: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub division_type: String,
    pub search_slug: String,
    pub path: String,
    pub path_with_type: String,
    pub ghn_id: Option<i32>,
    pub ghtk_id: Option<String>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::province::Entity",
        from = "Column::ProvinceCode",
        to = "super::province::Column::Code",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Province,
    #[sea_orm(has_many = "super::ward::Entity")]
    Wards,
}

impl Related<super::province::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Province.def()
    }
}

impl Related<super::ward::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
