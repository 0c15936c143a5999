//! Duplicate detection for candidate papers
//!
//! DOI is the authoritative natural key: an exact case-insensitive DOI hit
//! short-circuits all further matching. Without one, candidates are matched
//! on normalized titles, exactly or by a fixed-length substring probe.

pub mod merge;

use crate::db::models::Paper;
use crate::db::{PaperDraft, Repository};
use crate::errors::Result;
use unicode_normalization::UnicodeNormalization;

/// Length in characters of the fuzzy title probe. A heuristic threshold,
/// tunable, not a semantic guarantee; counted in chars so multi-byte titles
/// never split a code point.
pub const TITLE_PROBE_LEN: usize = 20;

/// Canonical form used for title comparison: Unicode NFC, every whitespace
/// run (including non-breaking variants) collapsed to one ASCII space,
/// trimmed, lowercased. Applied to stored titles at comparison time, never
/// at write time.
pub fn normalize_title(raw: &str) -> String {
    raw.nfc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First [`TITLE_PROBE_LEN`] characters of a normalized title
pub fn title_probe(normalized: &str) -> String {
    normalized.chars().take(TITLE_PROBE_LEN).collect()
}

/// Result of a related-record search.
///
/// `matched == false` means the fallback path fired: the papers are
/// arbitrary recent records kept so a merge UI has something to compare
/// against. Callers must not treat them as found duplicates.
#[derive(Debug, Clone)]
pub struct RelatedPapers {
    pub papers: Vec<Paper>,
    pub matched: bool,
}

/// Finds records a candidate draft may duplicate
pub struct DuplicateResolver<'a> {
    repo: &'a Repository,
}

impl<'a> DuplicateResolver<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Strict priority order, short-circuiting:
    /// 1. exact case-insensitive DOI match (authoritative, returns alone)
    /// 2. exact normalized-title match OR fuzzy probe containment
    /// 3. fallback: arbitrary recent records, flagged `matched = false`
    pub async fn find_related(&self, candidate: &PaperDraft, limit: u64) -> Result<RelatedPapers> {
        if let Some(doi) = candidate
            .doi
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            if let Some(paper) = self.repo.find_paper_by_doi_ci(doi).await? {
                return Ok(RelatedPapers {
                    papers: vec![paper],
                    matched: true,
                });
            }
        }

        let normalized = normalize_title(&candidate.title);
        if !normalized.is_empty() {
            let probe = title_probe(&normalized);
            let hits = self
                .repo
                .find_papers_by_normalized_title(&normalized, &probe, limit)
                .await?;
            if !hits.is_empty() {
                return Ok(RelatedPapers {
                    papers: hits,
                    matched: true,
                });
            }
        }

        let papers = self.repo.recent_papers(limit).await?;
        Ok(RelatedPapers {
            papers,
            matched: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_variants() {
        assert_eq!(normalize_title("Foo\u{00a0}Bar"), normalize_title("Foo Bar"));
        assert_eq!(normalize_title("Foo\u{202f}Bar"), normalize_title("Foo Bar"));
        assert_eq!(normalize_title("  Foo \t\n Bar  "), "foo bar");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "Attention Is\u{00a0}All You Need",
            "  Ünïcode   Título\u{202f}Test ",
            "plain",
        ] {
            let once = normalize_title(raw);
            assert_eq!(normalize_title(&once), once);
        }
    }

    #[test]
    fn test_normalize_composes_and_lowercases() {
        // decomposed e + combining acute vs precomposed
        assert_eq!(normalize_title("Cafe\u{0301}"), normalize_title("Café"));
        assert_eq!(normalize_title("DEEP LEARNING"), "deep learning");
    }

    #[test]
    fn test_probe_counts_chars_not_bytes() {
        let normalized = normalize_title("深層学習による論文検索システムの評価と改善に関する研究");
        let probe = title_probe(&normalized);
        assert_eq!(probe.chars().count(), TITLE_PROBE_LEN);
    }

    #[test]
    fn test_probe_of_short_title_is_whole_title() {
        assert_eq!(title_probe("short title"), "short title");
    }
}
