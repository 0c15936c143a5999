//! Single-condition evaluation
//!
//! Turns one (field, operator, value) triple into a SQL predicate, or a
//! [`SkipReason`] when the triple is malformed. Data-shape problems never
//! escape this module as errors.

use super::FilterCondition;
use crate::db::models::{author, paper, tag};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, SimpleExpr};
use serde_json::Value;
use std::fmt;

/// Closed set of filterable fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    TitleKeyword,
    AbstractKeyword,
    AuthorName,
    YearFrom,
    YearTo,
    MinCitations,
    MaxCitations,
    VenueId,
    Tags,
}

impl FilterField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "title_keyword" => Some(Self::TitleKeyword),
            "abstract_keyword" => Some(Self::AbstractKeyword),
            "author_name" => Some(Self::AuthorName),
            "year_from" => Some(Self::YearFrom),
            "year_to" => Some(Self::YearTo),
            "min_citations" => Some(Self::MinCitations),
            "max_citations" => Some(Self::MaxCitations),
            "venue_id" => Some(Self::VenueId),
            "tags" => Some(Self::Tags),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleKeyword => "title_keyword",
            Self::AbstractKeyword => "abstract_keyword",
            Self::AuthorName => "author_name",
            Self::YearFrom => "year_from",
            Self::YearTo => "year_to",
            Self::MinCitations => "min_citations",
            Self::MaxCitations => "max_citations",
            Self::VenueId => "venue_id",
            Self::Tags => "tags",
        }
    }

    /// Does a condition on this field require the author join?
    pub fn references_author(&self) -> bool {
        matches!(self, Self::AuthorName)
    }

    /// Does a condition on this field require the tag join?
    pub fn references_tag(&self) -> bool {
        matches!(self, Self::Tags)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Contains,
    Equals,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    In,
}

impl FilterOperator {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "contains" => Some(Self::Contains),
            "equals" => Some(Self::Equals),
            "greater_than" => Some(Self::GreaterThan),
            "greater_equal" => Some(Self::GreaterEqual),
            "less_than" => Some(Self::LessThan),
            "less_equal" => Some(Self::LessEqual),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterEqual => "greater_equal",
            Self::LessThan => "less_than",
            Self::LessEqual => "less_equal",
            Self::In => "in",
        }
    }
}

/// Why a condition was dropped instead of compiled
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Null, blank string or empty list value
    EmptyValue,
    /// Field name not in the closed set
    UnknownField(String),
    /// Operator name not in the closed set
    UnknownOperator(String),
    /// Operator is known but not legal for this field
    UnsupportedOperator {
        field: FilterField,
        operator: FilterOperator,
    },
    /// Numeric field whose value could not be coerced to an integer
    InvalidNumber(String),
    /// Text field given a non-text value
    NotText(FilterField),
    /// `in` operator given a non-list value
    NotAList(FilterField),
}

/// Outcome of evaluating one condition
#[derive(Debug, Clone)]
pub enum Compiled {
    Predicate(SimpleExpr),
    Skipped(SkipReason),
}

impl Compiled {
    pub fn into_predicate(self) -> Option<SimpleExpr> {
        match self {
            Compiled::Predicate(expr) => Some(expr),
            Compiled::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Compiled::Predicate(_) => None,
            Compiled::Skipped(reason) => Some(reason),
        }
    }
}

/// Evaluate one condition into a predicate or a skip.
pub fn evaluate(cond: &FilterCondition) -> Compiled {
    if is_blank(&cond.value) {
        return Compiled::Skipped(SkipReason::EmptyValue);
    }

    let Some(field) = FilterField::parse(&cond.field) else {
        return Compiled::Skipped(SkipReason::UnknownField(cond.field.clone()));
    };
    let Some(operator) = FilterOperator::parse(&cond.operator) else {
        return Compiled::Skipped(SkipReason::UnknownOperator(cond.operator.clone()));
    };

    match field {
        FilterField::TitleKeyword => text_predicate(
            field,
            operator,
            &cond.value,
            Expr::col((paper::Entity, paper::Column::Title)),
        ),
        FilterField::AbstractKeyword => text_predicate(
            field,
            operator,
            &cond.value,
            Expr::col((paper::Entity, paper::Column::AbstractText)),
        ),
        FilterField::AuthorName => text_predicate(
            field,
            operator,
            &cond.value,
            Expr::col((author::Entity, author::Column::Name)),
        ),
        FilterField::YearFrom
        | FilterField::YearTo
        | FilterField::MinCitations
        | FilterField::MaxCitations
        | FilterField::VenueId => numeric_predicate(field, operator, &cond.value),
        FilterField::Tags => tags_predicate(operator, &cond.value),
    }
}

/// Null, blank string or empty list
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Escape LIKE metacharacters so user input matches literally
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn as_text(field: FilterField, value: &Value) -> Result<String, SkipReason> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(SkipReason::NotText(field)),
    }
}

fn text_predicate(field: FilterField, operator: FilterOperator, value: &Value, col: Expr) -> Compiled {
    let text = match as_text(field, value) {
        Ok(text) => text,
        Err(reason) => return Compiled::Skipped(reason),
    };

    match operator {
        // Case-insensitive substring, not a tokenized text match
        FilterOperator::Contains => {
            Compiled::Predicate(col.ilike(format!("%{}%", escape_like(&text))))
        }
        FilterOperator::Equals => Compiled::Predicate(col.eq(text)),
        _ => Compiled::Skipped(SkipReason::UnsupportedOperator { field, operator }),
    }
}

fn coerce_i32(value: &Value) -> Result<i32, SkipReason> {
    let invalid = || SkipReason::InvalidNumber(value.to_string());

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map_err(|_| invalid())
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
                    Ok(f as i32)
                } else {
                    Err(invalid())
                }
            } else {
                Err(invalid())
            }
        }
        Value::String(s) => s.trim().parse::<i32>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn numeric_predicate(field: FilterField, operator: FilterOperator, value: &Value) -> Compiled {
    let n = match coerce_i32(value) {
        Ok(n) => n,
        Err(reason) => return Compiled::Skipped(reason),
    };

    let year = || Expr::col((paper::Entity, paper::Column::PublicationYear));
    let citations = || Expr::col((paper::Entity, paper::Column::CitationCount));
    let venue = || Expr::col((paper::Entity, paper::Column::VenueId));

    let predicate = match (field, operator) {
        // A lower bound is a lower bound whether the client says > or >=
        (FilterField::YearFrom, FilterOperator::GreaterThan | FilterOperator::GreaterEqual) => {
            year().gte(n)
        }
        (FilterField::YearFrom, FilterOperator::Equals) => year().eq(n),
        (FilterField::YearTo, FilterOperator::LessThan | FilterOperator::LessEqual) => {
            year().lte(n)
        }
        (FilterField::YearTo, FilterOperator::Equals) => year().eq(n),
        (FilterField::MinCitations, FilterOperator::GreaterThan | FilterOperator::GreaterEqual) => {
            citations().gte(n)
        }
        (FilterField::MinCitations, FilterOperator::Equals) => citations().eq(n),
        (FilterField::MaxCitations, FilterOperator::LessThan | FilterOperator::LessEqual) => {
            citations().lte(n)
        }
        (FilterField::MaxCitations, FilterOperator::Equals) => citations().eq(n),
        (FilterField::VenueId, FilterOperator::Equals) => venue().eq(n),
        (field, operator) => {
            return Compiled::Skipped(SkipReason::UnsupportedOperator { field, operator })
        }
    };

    Compiled::Predicate(predicate)
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn tags_predicate(operator: FilterOperator, value: &Value) -> Compiled {
    let col = || Expr::col((tag::Entity, tag::Column::Name));

    match operator {
        FilterOperator::In => match string_list(value) {
            Some(names) if !names.is_empty() => Compiled::Predicate(col().is_in(names)),
            Some(_) => Compiled::Skipped(SkipReason::EmptyValue),
            None => Compiled::Skipped(SkipReason::NotAList(FilterField::Tags)),
        },
        // Singleton list or scalar, exact name match
        FilterOperator::Equals => {
            let name = match value {
                Value::Array(_) => string_list(value).and_then(|names| names.into_iter().next()),
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            };
            match name {
                Some(name) => Compiled::Predicate(col().eq(name)),
                None => Compiled::Skipped(SkipReason::EmptyValue),
            }
        }
        operator => Compiled::Skipped(SkipReason::UnsupportedOperator {
            field: FilterField::Tags,
            operator,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PaperEntity;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use serde_json::json;

    fn cond(field: &str, operator: &str, value: Value) -> FilterCondition {
        FilterCondition {
            id: None,
            field: field.to_string(),
            operator: operator.to_string(),
            value,
        }
    }

    fn sql_of(expr: SimpleExpr) -> String {
        PaperEntity::find()
            .filter(expr)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_blank_values_skip() {
        for value in [json!(null), json!(""), json!("   "), json!([])] {
            let compiled = evaluate(&cond("title_keyword", "contains", value));
            assert_eq!(compiled.skip_reason(), Some(&SkipReason::EmptyValue));
        }
    }

    #[test]
    fn test_unknown_field_skips() {
        let compiled = evaluate(&cond("publisher", "contains", json!("acm")));
        assert_eq!(
            compiled.skip_reason(),
            Some(&SkipReason::UnknownField("publisher".into()))
        );
    }

    #[test]
    fn test_unknown_operator_skips() {
        let compiled = evaluate(&cond("title_keyword", "matches", json!("deep learning")));
        assert_eq!(
            compiled.skip_reason(),
            Some(&SkipReason::UnknownOperator("matches".into()))
        );
    }

    #[test]
    fn test_illegal_operator_for_field_skips() {
        let compiled = evaluate(&cond("year_from", "less_than", json!(2020)));
        assert_eq!(
            compiled.skip_reason(),
            Some(&SkipReason::UnsupportedOperator {
                field: FilterField::YearFrom,
                operator: FilterOperator::LessThan,
            })
        );
    }

    #[test]
    fn test_contains_is_case_insensitive_substring() {
        let expr = evaluate(&cond("title_keyword", "contains", json!("Neural")))
            .into_predicate()
            .unwrap();
        let sql = sql_of(expr);
        assert!(sql.contains("ILIKE"), "expected ILIKE in: {}", sql);
        assert!(sql.contains("%Neural%"), "expected wildcards in: {}", sql);
    }

    #[test]
    fn test_contains_escapes_like_metacharacters() {
        let expr = evaluate(&cond("title_keyword", "contains", json!("100%_sure")))
            .into_predicate()
            .unwrap();
        let sql = sql_of(expr);
        assert!(sql.contains("\\%"), "expected escaped %% in: {}", sql);
        assert!(sql.contains("\\_"), "expected escaped _ in: {}", sql);
    }

    #[test]
    fn test_numeric_coercion_from_string() {
        let expr = evaluate(&cond("year_from", "greater_equal", json!("2015")))
            .into_predicate()
            .unwrap();
        let sql = sql_of(expr);
        assert!(sql.contains("publication_year"), "{}", sql);
        assert!(sql.contains(">= 2015"), "{}", sql);
    }

    #[test]
    fn test_numeric_coercion_failure_skips() {
        let compiled = evaluate(&cond("min_citations", "greater_than", json!("lots")));
        assert!(matches!(
            compiled.skip_reason(),
            Some(SkipReason::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_greater_than_means_lower_bound_for_year_from() {
        let expr = evaluate(&cond("year_from", "greater_than", json!(2015)))
            .into_predicate()
            .unwrap();
        assert!(sql_of(expr).contains(">= 2015"));
    }

    #[test]
    fn test_tags_in_takes_list() {
        let expr = evaluate(&cond("tags", "in", json!(["ml", "nlp"])))
            .into_predicate()
            .unwrap();
        let sql = sql_of(expr);
        assert!(sql.contains("IN ('ml', 'nlp')"), "{}", sql);
    }

    #[test]
    fn test_tags_in_rejects_scalar() {
        let compiled = evaluate(&cond("tags", "in", json!("ml")));
        assert_eq!(
            compiled.skip_reason(),
            Some(&SkipReason::NotAList(FilterField::Tags))
        );
    }

    #[test]
    fn test_tags_equals_takes_singleton_list_or_scalar() {
        for value in [json!(["ml"]), json!("ml")] {
            let expr = evaluate(&cond("tags", "equals", value)).into_predicate().unwrap();
            let sql = sql_of(expr);
            assert!(sql.contains("= 'ml'"), "{}", sql);
        }
    }

    #[test]
    fn test_author_name_targets_author_table() {
        let expr = evaluate(&cond("author_name", "equals", json!("Ada Lovelace")))
            .into_predicate()
            .unwrap();
        let sql = sql_of(expr);
        assert!(sql.contains("\"authors\".\"name\""), "{}", sql);
    }
}
