//! Tag entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Default display color for tags created without one
pub const DEFAULT_TAG_COLOR: &str = "#6B7280";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    #[sea_orm(column_type = "String(StringLen::N(7))")]
    pub color: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper_tag::Entity")]
    PaperTags,
}

impl Related<super::paper_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
