//! Best-effort PDF metadata extraction
//!
//! Text comes out of the first few pages via lopdf; heuristics then guess
//! title, authors, identifiers, year, abstract, keywords and venue. Every
//! field is optional; callers must tolerate empty and partial results.

mod extract;
mod heuristics;

pub use extract::extract_text;
pub use heuristics::{guess_metadata, PdfMetadata};

use crate::errors::Result;

/// Parse raw PDF bytes into guessed metadata
pub fn parse_pdf_metadata(bytes: &[u8]) -> Result<PdfMetadata> {
    let text = extract_text(bytes)?;
    Ok(guess_metadata(&text))
}
