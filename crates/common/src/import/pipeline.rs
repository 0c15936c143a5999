//! Row-by-row import pipeline
//!
//! Each row is mapped onto a paper draft via a configurable column mapping,
//! checked against the catalog for DOI and exact-title duplicates, then
//! persisted. Rows are processed strictly sequentially; a failing row is
//! recorded in the report and the loop moves on.

use super::tabular;
use crate::db::models::VenueKind;
use crate::db::{PaperDetails, PaperDraft, Repository};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Column mapping from catalog fields to spreadsheet headers.
/// Defaults follow the Web of Science export format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub title: String,
    pub abstract_text: String,
    pub doi: String,
    pub publication_year: String,
    pub publication_date: String,
    pub citation_count: String,
    pub venue: String,
    pub venue_kind: String,
    pub authors: String,
    pub author_keywords: String,
    pub keywords_plus: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            title: "Article Title".to_string(),
            abstract_text: "Abstract".to_string(),
            doi: "DOI".to_string(),
            publication_year: "Publication Year".to_string(),
            publication_date: "Publication Date".to_string(),
            citation_count: "Times Cited, WoS Core".to_string(),
            venue: "Source Title".to_string(),
            venue_kind: "Publication Type".to_string(),
            authors: "Authors".to_string(),
            author_keywords: "Author Keywords".to_string(),
            keywords_plus: "Keywords Plus".to_string(),
        }
    }
}

/// Outcome of one import batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub successful_imports: usize,
    pub failed_imports: usize,
    pub errors: Vec<String>,
    pub imported_papers: Vec<PaperDetails>,
}

/// A row lowered onto catalog fields, before id resolution
#[derive(Debug, Clone)]
struct ParsedRow {
    title: String,
    abstract_text: Option<String>,
    doi: Option<String>,
    publication_year: i32,
    citation_count: i32,
    venue: Option<(String, VenueKind)>,
    keywords: Vec<String>,
    author_names: Vec<String>,
}

/// A cell cleaned of blank and NaN-ish noise
fn clean_cell(row: &HashMap<String, String>, column: &str) -> Option<String> {
    let value = row.get(column)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split an author cell on semicolons (Web of Science style:
/// `Author1, A; Author2, B`)
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a keyword cell on semicolons
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})\b").expect("year regex compiles"))
}

/// Pull a 4-digit year out of a free-form date string
pub fn extract_year(raw: &str) -> Option<i32> {
    year_re()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn char_truncate(raw: &str, max_chars: usize) -> &str {
    match raw.char_indices().nth(max_chars) {
        Some((index, _)) => &raw[..index],
        None => raw,
    }
}

fn parse_row(row: &HashMap<String, String>, mapping: &FieldMapping) -> Result<ParsedRow, String> {
    let title = clean_cell(row, &mapping.title).ok_or_else(|| "title is empty".to_string())?;

    let publication_year = clean_cell(row, &mapping.publication_year)
        .and_then(|raw| raw.parse::<i32>().ok().or_else(|| extract_year(&raw)))
        .or_else(|| clean_cell(row, &mapping.publication_date).and_then(|raw| extract_year(&raw)))
        .ok_or_else(|| "publication year could not be determined".to_string())?;

    let citation_count = clean_cell(row, &mapping.citation_count)
        .and_then(|raw| raw.parse::<i32>().ok())
        .unwrap_or(0)
        .max(0);

    let venue = clean_cell(row, &mapping.venue).map(|name| {
        let kind = clean_cell(row, &mapping.venue_kind)
            .map(|raw| VenueKind::from_publication_type(&raw))
            .unwrap_or(VenueKind::Journal);
        (name, kind)
    });

    // Author keywords first, then Keywords Plus, first occurrence wins
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for column in [&mapping.author_keywords, &mapping.keywords_plus] {
        if let Some(raw) = clean_cell(row, column) {
            for keyword in split_keywords(&raw) {
                if seen.insert(keyword.to_lowercase()) {
                    keywords.push(keyword);
                }
            }
        }
    }

    let author_names = clean_cell(row, &mapping.authors)
        .map(|raw| split_authors(&raw))
        .unwrap_or_default();

    Ok(ParsedRow {
        title,
        abstract_text: clean_cell(row, &mapping.abstract_text),
        doi: clean_cell(row, &mapping.doi),
        publication_year,
        citation_count,
        venue,
        keywords,
        author_names,
    })
}

/// Resolve author and venue names into ids, creating records on miss
async fn resolve_row(repo: &Repository, parsed: ParsedRow) -> Result<PaperDraft, String> {
    let mut author_ids = Vec::new();
    for name in &parsed.author_names {
        let author = repo
            .get_or_create_author(name)
            .await
            .map_err(|e| format!("author {}: {}", name, e))?;
        author_ids.push(author.id);
    }

    let venue_id = match parsed.venue {
        Some((name, kind)) => Some(
            repo.get_or_create_venue(&name, kind)
                .await
                .map_err(|e| format!("venue {}: {}", name, e))?
                .id,
        ),
        None => None,
    };

    Ok(PaperDraft {
        title: parsed.title,
        abstract_text: parsed.abstract_text,
        publication_year: parsed.publication_year,
        doi: parsed.doi,
        citation_count: parsed.citation_count,
        venue_id,
        url: None,
        keywords: parsed.keywords,
        author_ids,
        tag_ids: Vec::new(),
    })
}

async fn import_one(
    repo: &Repository,
    row: &HashMap<String, String>,
    mapping: &FieldMapping,
) -> Result<PaperDetails, String> {
    let parsed = parse_row(row, mapping)?;

    if let Some(ref doi) = parsed.doi {
        match repo.find_paper_by_doi_ci(doi).await {
            Ok(Some(_)) => return Err(format!("DOI {} already exists", doi)),
            Ok(None) => {}
            Err(e) => return Err(e.to_string()),
        }
    }

    match repo.find_paper_by_exact_title(&parsed.title).await {
        Ok(Some(_)) => {
            return Err(format!(
                "title '{}...' already exists",
                char_truncate(&parsed.title, 50)
            ))
        }
        Ok(None) => {}
        Err(e) => return Err(e.to_string()),
    }

    let draft = resolve_row(repo, parsed).await?;
    repo.create_paper(draft).await.map_err(|e| e.to_string())
}

/// Import rows strictly sequentially with partial-failure semantics
pub async fn import_rows(
    repo: &Repository,
    rows: &[HashMap<String, String>],
    mapping: &FieldMapping,
) -> ImportReport {
    let mut report = ImportReport {
        total_rows: rows.len(),
        ..Default::default()
    };

    for (index, row) in rows.iter().enumerate() {
        match import_one(repo, row, mapping).await {
            Ok(details) => {
                report.successful_imports += 1;
                report.imported_papers.push(details);
            }
            Err(message) => {
                report.failed_imports += 1;
                report.errors.push(format!("row {}: {}", index + 1, message));
            }
        }
    }

    tracing::info!(
        total = report.total_rows,
        ok = report.successful_imports,
        failed = report.failed_imports,
        "Import batch finished"
    );

    report
}

/// Import a whole file. An unreadable file aborts with an empty result and
/// a single top-level error; it never partially imports.
pub async fn import_file(
    repo: &Repository,
    bytes: &[u8],
    filename: &str,
    mapping: &FieldMapping,
) -> ImportReport {
    let parsed = match tabular::parse(bytes, filename) {
        Ok(parsed) => parsed,
        Err(err) => {
            return ImportReport {
                errors: vec![format!("failed to read {}: {}", filename, err)],
                ..Default::default()
            }
        }
    };

    import_rows(repo, &parsed.rows, mapping).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> HashMap<String, String> {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_split_authors_on_semicolons() {
        assert_eq!(
            split_authors("Vaswani, A; Shazeer, N;  ; Parmar, N"),
            vec!["Vaswani, A", "Shazeer, N", "Parmar, N"]
        );
        assert!(split_authors("").is_empty());
    }

    #[test]
    fn test_extract_year_from_date_string() {
        assert_eq!(extract_year("DEC 2017"), Some(2017));
        assert_eq!(extract_year("2015-06-01"), Some(2015));
        assert_eq!(extract_year("June"), None);
    }

    #[test]
    fn test_parse_row_requires_title() {
        let err = parse_row(&row(&[("Publication Year", "2020")]), &FieldMapping::default())
            .unwrap_err();
        assert_eq!(err, "title is empty");
    }

    #[test]
    fn test_parse_row_requires_some_year() {
        let err = parse_row(&row(&[("Article Title", "T")]), &FieldMapping::default()).unwrap_err();
        assert!(err.contains("publication year"));
    }

    #[test]
    fn test_parse_row_year_falls_back_to_date_column() {
        let parsed = parse_row(
            &row(&[("Article Title", "T"), ("Publication Date", "NOV 2019")]),
            &FieldMapping::default(),
        )
        .unwrap();
        assert_eq!(parsed.publication_year, 2019);
    }

    #[test]
    fn test_parse_row_nan_cells_are_blank() {
        let parsed = parse_row(
            &row(&[
                ("Article Title", "T"),
                ("Publication Year", "2020"),
                ("Abstract", "NaN"),
                ("DOI", "nan"),
            ]),
            &FieldMapping::default(),
        )
        .unwrap();
        assert!(parsed.abstract_text.is_none());
        assert!(parsed.doi.is_none());
    }

    #[test]
    fn test_parse_row_unparseable_citations_default_to_zero() {
        let parsed = parse_row(
            &row(&[
                ("Article Title", "T"),
                ("Publication Year", "2020"),
                ("Times Cited, WoS Core", "n/a"),
            ]),
            &FieldMapping::default(),
        )
        .unwrap();
        assert_eq!(parsed.citation_count, 0);
    }

    #[test]
    fn test_parse_row_merges_and_dedups_keywords() {
        let parsed = parse_row(
            &row(&[
                ("Article Title", "T"),
                ("Publication Year", "2020"),
                ("Author Keywords", "attention; transformers"),
                ("Keywords Plus", "Transformers; BLEU"),
            ]),
            &FieldMapping::default(),
        )
        .unwrap();
        assert_eq!(parsed.keywords, vec!["attention", "transformers", "BLEU"]);
    }

    #[test]
    fn test_parse_row_proceedings_become_conference_venue() {
        let parsed = parse_row(
            &row(&[
                ("Article Title", "T"),
                ("Publication Year", "2020"),
                ("Source Title", "NeurIPS"),
                ("Publication Type", "P"),
            ]),
            &FieldMapping::default(),
        )
        .unwrap();
        assert_eq!(
            parsed.venue,
            Some(("NeurIPS".to_string(), VenueKind::Conference))
        );
    }

    #[test]
    fn test_custom_mapping_reads_renamed_columns() {
        let mapping = FieldMapping {
            title: "Titel".to_string(),
            publication_year: "Jahr".to_string(),
            ..Default::default()
        };
        let parsed = parse_row(&row(&[("Titel", "T"), ("Jahr", "1999")]), &mapping).unwrap();
        assert_eq!(parsed.title, "T");
        assert_eq!(parsed.publication_year, 1999);
    }
}
