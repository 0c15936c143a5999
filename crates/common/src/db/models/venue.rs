//! Venue entity (journal or conference)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "venues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub kind: VenueKind,

    #[sea_orm(column_type = "Decimal(Some((5, 3)))", nullable)]
    pub impact_factor: Option<Decimal>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    #[sea_orm(string_value = "journal")]
    Journal,
    #[sea_orm(string_value = "conference")]
    Conference,
}

impl VenueKind {
    /// Map a publication-type cell (Web of Science style) onto a venue kind.
    /// `P` / `PROCEEDINGS` mark conference proceedings; everything else is a journal.
    pub fn from_publication_type(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "P" | "PROCEEDINGS" => VenueKind::Conference,
            _ => VenueKind::Journal,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper::Entity")]
    Papers,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Papers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publication_type_mapping() {
        assert_eq!(VenueKind::from_publication_type("P"), VenueKind::Conference);
        assert_eq!(VenueKind::from_publication_type("proceedings"), VenueKind::Conference);
        assert_eq!(VenueKind::from_publication_type("J"), VenueKind::Journal);
        assert_eq!(VenueKind::from_publication_type(""), VenueKind::Journal);
    }
}
