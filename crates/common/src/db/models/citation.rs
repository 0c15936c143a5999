//! Citation edge between two papers (citing -> cited)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "citations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub citing_paper_id: i32,

    pub cited_paper_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::CitingPaperId",
        to = "super::paper::Column::Id"
    )]
    CitingPaper,

    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::CitedPaperId",
        to = "super::paper::Column::Id"
    )]
    CitedPaper,
}

impl ActiveModelBehavior for ActiveModel {}
