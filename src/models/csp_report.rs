use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "csp_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub document_uri: String,
    pub violated_directive: String,
    pub blocked_uri: String,
    pub source_file: Option<String>,
    pub line_number: Option<i32>,
    pub raw_report: String,
    pub ip_address: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
