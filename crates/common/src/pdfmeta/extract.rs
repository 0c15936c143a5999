//! PDF text extraction
//!
//! Pulls text out of PDF content streams. Only the leading pages are read;
//! the metadata heuristics work off the document head anyway.

use crate::errors::{AppError, Result};
use tracing::{debug, warn};

/// Pages read from the top of the document
const MAX_PAGES: usize = 4;

/// Extract text from the first [`MAX_PAGES`] pages of a PDF.
///
/// Text blocks are separated by newlines so line-oriented heuristics (title
/// and author guessing) keep something resembling layout. An unparseable
/// document is an error; a parseable document with no text is not.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| AppError::PdfParse {
        message: format!("failed to load PDF: {}", e),
    })?;

    let mut text = String::new();
    let mut pages_read = 0usize;

    for (index, page_id) in doc.page_iter().enumerate() {
        if index >= MAX_PAGES {
            break;
        }
        pages_read += 1;

        match doc.get_page_content(page_id) {
            Ok(content) => {
                text.push_str(&content_stream_text(&content));
                text.push('\n');
            }
            Err(e) => {
                warn!(page = index + 1, error = %e, "Failed to read page content, skipping");
            }
        }
    }

    let cleaned = clean_text(&text);
    debug!(pages_read, extracted_len = cleaned.len(), "PDF text extraction complete");

    Ok(cleaned)
}

/// Extract text between BT and ET operators of one content stream.
/// Each text block ends a line.
fn content_stream_text(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        match trimmed {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                if !current.trim().is_empty() {
                    text.push_str(current.trim());
                    text.push('\n');
                }
                current.clear();
            }
            _ if in_text_block => {
                if let Some(shown) = operator_text(trimmed) {
                    current.push_str(&shown);
                }
            }
            _ => {}
        }
    }

    text
}

/// Text carried by a Tj / TJ / quote show operator, if any
fn operator_text(line: &str) -> Option<String> {
    // (text) Tj and the single/double quote variants
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        let start = line.find('(')?;
        let end = line.rfind(')')?;
        if start < end {
            return Some(decode_pdf_string(&line[start + 1..end]));
        }
        return None;
    }

    // [(text) kern (text)] TJ
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => in_paren = true,
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Undo PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse space runs within lines, keep the line structure
fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_stream_text_reads_tj_blocks() {
        let content = b"BT\n(Deep Learning) Tj\nET\nBT\n(Yann LeCun) Tj\nET\n";
        let text = content_stream_text(content);
        assert_eq!(text, "Deep Learning\nYann LeCun\n");
    }

    #[test]
    fn test_content_stream_text_reads_tj_arrays() {
        let content = b"BT\n[(Atten) -20 (tion)] TJ\nET\n";
        assert_eq!(content_stream_text(content), "Attention\n");
    }

    #[test]
    fn test_decode_pdf_string_escapes() {
        assert_eq!(decode_pdf_string("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(decode_pdf_string("Test\\(paren\\)"), "Test(paren)");
    }

    #[test]
    fn test_clean_text_preserves_lines() {
        assert_eq!(clean_text("a   b\n\nc  d"), "a b\n\nc d");
    }

    #[test]
    fn test_garbage_bytes_are_a_parse_error() {
        assert!(extract_text(b"not a pdf at all").is_err());
    }
}
