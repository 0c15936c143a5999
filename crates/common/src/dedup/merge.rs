//! Conflict-resolution policies applied when a duplicate is found
//!
//! The policy layer is pure: it resolves a mode string and field names into
//! the set of columns to replace. The repository applies that set inside one
//! transaction.

/// How to reconcile an incoming draft with an existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Keep the stored record untouched
    KeepOld,
    /// Replace every mutable field, association lists included
    Overwrite,
    /// Replace only explicitly named fields
    MergeFields,
}

impl MergeMode {
    /// Unknown mode strings behave as `keep_old` rather than erroring.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "overwrite" => MergeMode::Overwrite,
            "merge_fields" => MergeMode::MergeFields,
            _ => MergeMode::KeepOld,
        }
    }
}

/// Mutable fields a merge may replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeableField {
    Title,
    Abstract,
    PublicationYear,
    Doi,
    CitationCount,
    VenueId,
    Keywords,
    Url,
    Authors,
    Tags,
}

impl MergeableField {
    pub const ALL: &'static [MergeableField] = &[
        MergeableField::Title,
        MergeableField::Abstract,
        MergeableField::PublicationYear,
        MergeableField::Doi,
        MergeableField::CitationCount,
        MergeableField::VenueId,
        MergeableField::Keywords,
        MergeableField::Url,
        MergeableField::Authors,
        MergeableField::Tags,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "title" => Some(Self::Title),
            "abstract" | "abstract_text" => Some(Self::Abstract),
            "publication_year" => Some(Self::PublicationYear),
            "doi" => Some(Self::Doi),
            "citation_count" => Some(Self::CitationCount),
            "venue_id" => Some(Self::VenueId),
            "keywords" => Some(Self::Keywords),
            "url" => Some(Self::Url),
            "authors" | "author_ids" => Some(Self::Authors),
            "tags" | "tag_ids" => Some(Self::Tags),
            _ => None,
        }
    }
}

/// Resolve mode + field names into the columns to replace.
///
/// An empty result means no-op: `keep_old`, an unknown mode, or
/// `merge_fields` with no (recognizable) field names.
pub fn selected_fields(mode: MergeMode, fields: &[String]) -> Vec<MergeableField> {
    match mode {
        MergeMode::KeepOld => Vec::new(),
        MergeMode::Overwrite => MergeableField::ALL.to_vec(),
        MergeMode::MergeFields => fields
            .iter()
            .filter_map(|name| MergeableField::parse(name))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_defaults_to_keep_old() {
        assert_eq!(MergeMode::parse("keep_old"), MergeMode::KeepOld);
        assert_eq!(MergeMode::parse("OVERWRITE"), MergeMode::Overwrite);
        assert_eq!(MergeMode::parse("merge_fields"), MergeMode::MergeFields);
        assert_eq!(MergeMode::parse("replace_some"), MergeMode::KeepOld);
        assert_eq!(MergeMode::parse(""), MergeMode::KeepOld);
    }

    #[test]
    fn test_keep_old_selects_nothing() {
        assert!(selected_fields(MergeMode::KeepOld, &["title".into()]).is_empty());
    }

    #[test]
    fn test_overwrite_selects_everything() {
        let selected = selected_fields(MergeMode::Overwrite, &[]);
        assert_eq!(selected.len(), MergeableField::ALL.len());
        assert!(selected.contains(&MergeableField::Authors));
        assert!(selected.contains(&MergeableField::Tags));
    }

    #[test]
    fn test_merge_fields_selects_named_only() {
        let selected = selected_fields(MergeMode::MergeFields, &["citation_count".into()]);
        assert_eq!(selected, vec![MergeableField::CitationCount]);
    }

    #[test]
    fn test_merge_fields_empty_behaves_as_keep_old() {
        assert!(selected_fields(MergeMode::MergeFields, &[]).is_empty());
    }

    #[test]
    fn test_unrecognized_field_names_are_ignored() {
        let selected = selected_fields(
            MergeMode::MergeFields,
            &["citation_count".into(), "page_count".into()],
        );
        assert_eq!(selected, vec![MergeableField::CitationCount]);
    }
}
