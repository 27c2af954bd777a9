use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub district_code: String,
    pub name: String,
    pub name_with_type: String,
    pub slug: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub division_type: String,
    pub search_slug: String,
    pub path: String,
    pub path_with_type: String,
    pub ghn_code: Option<String>,
    pub ghtk_id: Option<String>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::district::Entity",
        from = "Column::DistrictCode",
        to = "super::district::Column::Code",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    District,
}

impl Related<super::district::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::District.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
