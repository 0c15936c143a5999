//! Metadata guessing over extracted PDF text
//!
//! Line- and marker-based heuristics tuned for the head matter of academic
//! papers. All output is best-effort; any field may come back empty.

use regex_lite::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Snippet kept from the document head for marker searches
const MAX_SNIPPET_CHARS: usize = 3000;
/// Lines longer than this are never part of a title
const MAX_TITLE_LINE_CHARS: usize = 150;
/// Lines longer than this are never an author line
const MAX_AUTHOR_LINE_CHARS: usize = 200;
const MAX_AUTHORS: usize = 5;
const MAX_KEYWORDS: usize = 10;
const MAX_ABSTRACT_CHARS: usize = 2000;
/// Years are only trusted near the top of the document
const YEAR_WINDOW_CHARS: usize = 800;

/// Best-effort metadata guessed from PDF text
#[derive(Debug, Clone, Default, Serialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub venue: Option<String>,
    pub text_snippet: String,
}

fn doi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(10\.\d{4,9}/[^\s"'<>]*)"#).expect("doi regex compiles"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(19|20)\d{2}").expect("year regex compiles"))
}

fn isbn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)ISBN(?:-1[03])?\s*:?\s*([0-9Xx-]{10,17})").expect("isbn regex compiles")
    })
}

fn institution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(University|Institute|Department|College|School|Laboratory|Center)")
            .expect("institution regex compiles")
    })
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email regex compiles")
    })
}

fn author_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[;,]| and | & ").expect("author split regex compiles"))
}

fn venue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(Journal|Conference|Proceedings of the|IEEE|ACM|Nature|Science)[\w \-]*")
            .expect("venue regex compiles")
    })
}

/// Guess every metadata field from extracted text
pub fn guess_metadata(text: &str) -> PdfMetadata {
    let snippet = char_prefix(text, MAX_SNIPPET_CHARS).trim().to_string();
    let lines: Vec<&str> = snippet
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let (title, title_lines) = guess_title(&lines);
    let authors = if title.is_some() {
        guess_authors(&lines, title_lines)
    } else {
        Vec::new()
    };

    let abstract_text = guess_abstract(text);

    PdfMetadata {
        title,
        authors,
        doi: doi_re()
            .captures(&snippet)
            .map(|caps| caps[1].trim().to_string()),
        isbn: isbn_re()
            .captures(&snippet)
            .map(|caps| caps[1].trim().to_string()),
        publication_year: guess_year(&snippet),
        keywords: guess_keywords(text, abstract_text.as_deref()),
        abstract_text,
        venue: venue_re()
            .find(&snippet)
            .map(|m| m.as_str().trim().to_string()),
        text_snippet: snippet,
    }
}

/// First short line, joined with the second short line unless that one
/// already reads like a name list. Returns the guessed title and how many
/// lines it consumed.
fn guess_title(lines: &[&str]) -> (Option<String>, usize) {
    let Some(first) = lines.first().filter(|l| l.chars().count() < MAX_TITLE_LINE_CHARS) else {
        return (None, 0);
    };

    if let Some(second) = lines.get(1) {
        let looks_like_names = second.contains(',') || second.contains(" and ");
        if second.chars().count() < MAX_TITLE_LINE_CHARS && !looks_like_names {
            return (Some(format!("{} {}", first, second)), 2);
        }
    }

    (Some(first.to_string()), 1)
}

/// The line right after the title, with institution lines skipped and
/// superscripts, emails and bracket noise stripped
fn guess_authors(lines: &[&str], start: usize) -> Vec<String> {
    let candidates: Vec<&str> = lines[start..]
        .iter()
        .filter(|line| line.chars().count() < MAX_AUTHOR_LINE_CHARS)
        .copied()
        .collect();

    let Some(mut author_line) = candidates.first().copied() else {
        return Vec::new();
    };

    if institution_re().is_match(author_line) {
        match candidates.get(1) {
            Some(next) => author_line = next,
            None => return Vec::new(),
        }
    }

    let cleaned = clean_author_line(author_line);

    let authors: Vec<String> = author_split_re()
        .split(&cleaned)
        .map(str::trim)
        .filter(|candidate| {
            let len = candidate.chars().count();
            len > 2 && len < 80 && !institution_re().is_match(candidate)
        })
        .map(str::to_string)
        .take(MAX_AUTHORS)
        .collect();

    if authors.is_empty() && !cleaned.is_empty() {
        vec![cleaned]
    } else {
        authors
    }
}

/// Strip emails, superscript markers, digits and brackets
fn clean_author_line(line: &str) -> String {
    let without_emails = email_re().replace_all(line, "");
    without_emails
        .chars()
        .filter(|c| !matches!(c, '*' | '†' | '‡' | '(' | ')' | '[' | ']' | '{' | '}') && !c.is_ascii_digit())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Most recent plausible year near the top of the document
fn guess_year(snippet: &str) -> Option<i32> {
    let window = char_prefix(snippet, YEAR_WINDOW_CHARS);
    year_re()
        .find_iter(window)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .max()
}

/// Text between an Abstract marker and the next section marker
fn guess_abstract(text: &str) -> Option<String> {
    let start = find_ci(text, "abstract")?;
    let after = &text[start + "abstract".len()..];
    let after = after.trim_start_matches([':', '-', ' ', '\t', '\n', '\r']);

    let end = section_end(after);
    let body = char_prefix(&after[..end], MAX_ABSTRACT_CHARS).trim();

    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Comma/semicolon-separated terms after a Keywords marker, searched past
/// the abstract when one was found
fn guess_keywords(text: &str, abstract_text: Option<&str>) -> Vec<String> {
    let search_from = abstract_text
        .and_then(|body| text.find(body).map(|pos| pos + body.len()))
        .unwrap_or(0);
    let haystack = &text[search_from..];

    let Some(start) = find_ci(haystack, "keywords") else {
        return Vec::new();
    };
    let after = &haystack[start + "keywords".len()..];
    let after = after.trim_start_matches([':', '-', ' ', '\t']);

    let end = after.find("\n\n").map_or_else(|| section_end(after), |e| e.min(section_end(after)));
    let block = char_prefix(&after[..end], 400);

    block
        .split([';', ','])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .take(MAX_KEYWORDS)
        .collect()
}

/// Byte offset of the nearest following section marker, or the text length
fn section_end(text: &str) -> usize {
    ["\nintroduction", "\nkeywords", "\n1.", "\n1 ", "\ni."]
        .iter()
        .filter_map(|marker| find_ci(text, marker))
        .min()
        .unwrap_or(text.len())
}

/// Case-insensitive substring search returning a byte offset.
/// ASCII needles only, so the offset always lands on a char boundary.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || n.len() > h.len() {
        return None;
    }
    h.windows(n.len()).position(|w| w.eq_ignore_ascii_case(n))
}

/// Longest prefix of at most `max_chars` characters
fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Attention Is All You Need
Ashish Vaswani*, Noam Shazeer1, Niki Parmar2
Google Brain, Mountain View
Abstract
The dominant sequence transduction models are based on complex recurrent
or convolutional neural networks.
Keywords: attention; transformers; machine translation
1. Introduction
Recurrent neural networks have long dominated sequence modeling.
DOI: 10.48550/arXiv.1706.03762
Proceedings of the 31st Conference on Neural Information Processing Systems, 2017
";

    #[test]
    fn test_title_is_first_line_when_second_looks_like_names() {
        let meta = guess_metadata(SAMPLE);
        assert_eq!(meta.title.as_deref(), Some("Attention Is All You Need"));
    }

    #[test]
    fn test_authors_come_from_line_after_title() {
        let meta = guess_metadata(SAMPLE);
        assert_eq!(
            meta.authors,
            vec!["Ashish Vaswani", "Noam Shazeer", "Niki Parmar"]
        );
    }

    #[test]
    fn test_doi_and_year_are_found() {
        let meta = guess_metadata(SAMPLE);
        assert_eq!(meta.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
        assert_eq!(meta.publication_year, Some(2017));
    }

    #[test]
    fn test_abstract_stops_at_section_marker() {
        let meta = guess_metadata(SAMPLE);
        let body = meta.abstract_text.unwrap();
        assert!(body.starts_with("The dominant sequence"));
        assert!(!body.to_lowercase().contains("introduction"));
        assert!(!body.to_lowercase().contains("keywords"));
    }

    #[test]
    fn test_keywords_split_and_capped() {
        let meta = guess_metadata(SAMPLE);
        assert_eq!(
            meta.keywords,
            vec!["attention", "transformers", "machine translation"]
        );
    }

    #[test]
    fn test_venue_guess_matches_publisher_words() {
        let meta = guess_metadata(SAMPLE);
        let venue = meta.venue.unwrap();
        assert!(venue.starts_with("Proceedings of the"), "{}", venue);
    }

    #[test]
    fn test_isbn_extraction() {
        let meta = guess_metadata("Some Book\nISBN-13: 978-0-306-40615-7\n");
        assert_eq!(meta.isbn.as_deref(), Some("978-0-306-40615-7"));
    }

    #[test]
    fn test_institution_first_line_is_skipped_for_authors() {
        let text = "A Study of Things\nDepartment of Computer Science, University of Nowhere\nJane Doe, John Roe\nAbstract\nBody.\n";
        let meta = guess_metadata(text);
        assert_eq!(meta.authors, vec!["Jane Doe", "John Roe"]);
    }

    #[test]
    fn test_empty_text_yields_empty_metadata() {
        let meta = guess_metadata("");
        assert!(meta.title.is_none());
        assert!(meta.authors.is_empty());
        assert!(meta.doi.is_none());
        assert!(meta.abstract_text.is_none());
        assert!(meta.keywords.is_empty());
    }
}
