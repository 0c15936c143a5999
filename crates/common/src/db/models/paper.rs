//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub abstract_text: Option<String>,

    pub publication_year: i32,

    /// Unique when present; case-insensitive matching is done at query time
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub doi: Option<String>,

    pub citation_count: i32,

    pub venue_id: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub pdf_file_path: Option<String>,

    pub file_size: Option<i64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub url: Option<String>,

    pub keywords: Option<Vec<String>>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::venue::Entity",
        from = "Column::VenueId",
        to = "super::venue::Column::Id"
    )]
    Venue,

    #[sea_orm(has_many = "super::paper_author::Entity")]
    PaperAuthors,

    #[sea_orm(has_many = "super::paper_tag::Entity")]
    PaperTags,
}

impl Related<super::venue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Venue.def()
    }
}

impl Related<super::paper_author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperAuthors.def()
    }
}

impl Related<super::paper_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
