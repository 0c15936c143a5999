//! Bulk import from tabular files
//!
//! A two-step flow: upload once for preview (headers + sample rows + the
//! default column mapping), then commit by upload id with a possibly edited
//! mapping. Rows import strictly sequentially with partial-failure
//! semantics: a bad row is recorded and skipped, committed rows stay.

pub mod pipeline;
pub mod session;
pub mod tabular;

pub use pipeline::{import_file, import_rows, FieldMapping, ImportReport};
pub use session::{StoredUpload, UploadSessionStore};
pub use tabular::{preview, TabularFile, TabularPreview};
