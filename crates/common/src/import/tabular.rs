//! Tabular-file collaborator
//!
//! Raw bytes + declared extension in, string-keyed row maps out.
//! xlsx/xls go through calamine, csv/tsv through the csv crate. An
//! unreadable file is a whole-file failure; there is no partial parse.

use crate::errors::{AppError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// A fully parsed tabular file
#[derive(Debug, Clone)]
pub struct TabularFile {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

/// Header + sample rows shown before an import is committed
#[derive(Debug, Clone, serde::Serialize)]
pub struct TabularPreview {
    pub headers: Vec<String>,
    pub total_rows: usize,
    pub rows: Vec<HashMap<String, String>>,
}

/// Parse a file according to its declared extension
pub fn parse(bytes: &[u8], filename: &str) -> Result<TabularFile> {
    match extension(filename).as_deref() {
        Some("xlsx") | Some("xls") => parse_workbook(bytes),
        Some("csv") => parse_delimited(bytes, b','),
        Some("tsv") => parse_delimited(bytes, b'\t'),
        _ => Err(AppError::ImportFile {
            message: format!(
                "unsupported file type: {} (expected .xlsx, .xls, .csv or .tsv)",
                filename
            ),
        }),
    }
}

/// Parse just enough of a file for the preview step
pub fn preview(bytes: &[u8], filename: &str, max_rows: usize) -> Result<TabularPreview> {
    let parsed = parse(bytes, filename)?;
    let total_rows = parsed.rows.len();
    Ok(TabularPreview {
        headers: parsed.headers,
        total_rows,
        rows: parsed.rows.into_iter().take(max_rows).collect(),
    })
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn parse_workbook(bytes: &[u8]) -> Result<TabularFile> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|e| AppError::ImportFile {
        message: format!("unreadable workbook: {}", e),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ImportFile {
            message: "workbook has no sheets".to_string(),
        })?
        .map_err(|e| AppError::ImportFile {
            message: format!("unreadable sheet: {}", e),
        })?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = row_iter
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::ImportFile {
            message: "missing header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for row in row_iter {
        let mut map = HashMap::new();
        for (index, cell) in row.iter().enumerate() {
            if let Some(header) = headers.get(index) {
                if !header.is_empty() {
                    map.insert(header.clone(), cell_to_string(cell));
                }
            }
        }
        if map.values().any(|v| !v.trim().is_empty()) {
            rows.push(map);
        }
    }

    Ok(TabularFile { headers, rows })
}

/// Spreadsheet cells holding whole numbers render without the trailing `.0`
/// pandas-style exports are known for
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            format!("{}", *f as i64)
        }
        other => other.to_string().trim().to_string(),
    }
}

fn parse_delimited(bytes: &[u8], delimiter: u8) -> Result<TabularFile> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::ImportFile {
            message: format!("unreadable header row: {}", e),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::ImportFile {
            message: "missing header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::ImportFile {
            message: format!("unreadable record: {}", e),
        })?;

        let mut map = HashMap::new();
        for (index, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(index) {
                if !header.is_empty() {
                    map.insert(header.clone(), value.trim().to_string());
                }
            }
        }
        if map.values().any(|v| !v.is_empty()) {
            rows.push(map);
        }
    }

    Ok(TabularFile { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &[u8] = b"Article Title,Publication Year,DOI\nDeep Learning,2015,10.1038/nature14539\nAttention Is All You Need,2017,\n";

    #[test]
    fn test_parse_csv() {
        let parsed = parse(CSV, "papers.csv").unwrap();
        assert_eq!(
            parsed.headers,
            vec!["Article Title", "Publication Year", "DOI"]
        );
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0]["Article Title"], "Deep Learning");
        assert_eq!(parsed.rows[1]["DOI"], "");
    }

    #[test]
    fn test_parse_tsv() {
        let tsv = b"Article Title\tPublication Year\nDeep Learning\t2015\n";
        let parsed = parse(tsv, "papers.tsv").unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0]["Publication Year"], "2015");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let parsed = parse(CSV, "PAPERS.CSV").unwrap();
        assert_eq!(parsed.rows.len(), 2);
    }

    #[test]
    fn test_unsupported_extension_is_whole_file_failure() {
        let err = parse(CSV, "papers.pdf").unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let csv = b"Article Title,DOI\nDeep Learning,x\n,\n  ,\n";
        let parsed = parse(csv, "papers.csv").unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_preview_caps_rows() {
        let previewed = preview(CSV, "papers.csv", 1).unwrap();
        assert_eq!(previewed.total_rows, 2);
        assert_eq!(previewed.rows.len(), 1);
    }

    #[test]
    fn test_garbage_workbook_is_whole_file_failure() {
        assert!(parse(b"definitely not a zip", "papers.xlsx").is_err());
    }
}
