//! SeaORM entity models
//!
//! Database entities for the PaperDesk catalog

pub mod author;
pub mod citation;
pub mod paper;
pub mod paper_author;
pub mod paper_tag;
pub mod tag;
pub mod venue;

pub use paper::{
    ActiveModel as PaperActiveModel, Column as PaperColumn, Entity as PaperEntity, Model as Paper,
};

pub use author::{
    ActiveModel as AuthorActiveModel, Column as AuthorColumn, Entity as AuthorEntity,
    Model as Author,
};

pub use venue::{
    ActiveModel as VenueActiveModel, Column as VenueColumn, Entity as VenueEntity, Model as Venue,
    VenueKind,
};

pub use tag::{
    ActiveModel as TagActiveModel, Column as TagColumn, Entity as TagEntity, Model as Tag,
    DEFAULT_TAG_COLOR,
};

pub use paper_author::{
    ActiveModel as PaperAuthorActiveModel, Column as PaperAuthorColumn,
    Entity as PaperAuthorEntity, Model as PaperAuthor,
};

pub use paper_tag::{
    ActiveModel as PaperTagActiveModel, Column as PaperTagColumn, Entity as PaperTagEntity,
    Model as PaperTag,
};

pub use citation::{
    ActiveModel as CitationActiveModel, Column as CitationColumn, Entity as CitationEntity,
    Model as Citation,
};
