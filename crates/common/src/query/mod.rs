//! Dynamic filter-query compiler
//!
//! Translates a client-composed boolean expression tree (AND/OR groups of
//! typed field conditions, arbitrarily nested) into a single parameterized
//! SeaORM [`Condition`](sea_orm::Condition) over the paper catalog.
//!
//! Malformed input degrades gracefully: an individual condition that cannot
//! be compiled is dropped with a recorded [`SkipReason`], never failing the
//! whole query. Only adversarial nesting depth is rejected outright.

pub mod compiler;
pub mod condition;
pub mod joins;

pub use compiler::{compile, compile_with_report, CompiledFilter};
pub use condition::{evaluate, Compiled, FilterField, FilterOperator, SkipReason};
pub use joins::JoinRequirements;

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Defensive cap on filter tree nesting
pub const MAX_FILTER_DEPTH: usize = 16;

/// One typed (field, operator, value) triple.
///
/// Field and operator arrive as free-form strings and are resolved against
/// closed enums at compile time; unresolvable names skip the condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Client-side node id, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub field: String,

    pub operator: String,

    /// Scalar or list; shape is validated per field
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A node in the boolean query tree: a logical operator over direct
/// conditions and nested child groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterGroup {
    /// Client-side node id, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `AND` combines conjunctively; anything else falls back to `OR`
    #[serde(default = "default_group_operator")]
    pub operator: String,

    #[serde(default)]
    pub conditions: Vec<FilterCondition>,

    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

fn default_group_operator() -> String {
    "AND".to_string()
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self {
            id: None,
            operator: default_group_operator(),
            conditions: Vec::new(),
            groups: Vec::new(),
        }
    }
}

impl FilterGroup {
    /// An AND group over the given conditions, no subgroups
    pub fn all_of(conditions: Vec<FilterCondition>) -> Self {
        Self {
            conditions,
            ..Default::default()
        }
    }
}

/// Wire envelope for the complex search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexSearchQuery {
    pub root: FilterGroup,
}

/// Resolved logical operator of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOperator {
    And,
    Or,
}

impl GroupOperator {
    /// `AND` (any case) is conjunction; every other string, including
    /// unrecognized garbage, is disjunction rather than an error.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("AND") {
            GroupOperator::And
        } else {
            GroupOperator::Or
        }
    }
}

/// Reject trees nested beyond [`MAX_FILTER_DEPTH`].
///
/// Iterative walk, so the check itself cannot be blown off the stack by the
/// input it is guarding against.
pub fn ensure_depth(root: &FilterGroup) -> Result<()> {
    let mut stack = vec![(root, 1usize)];
    while let Some((group, depth)) = stack.pop() {
        if depth > MAX_FILTER_DEPTH {
            return Err(AppError::Validation {
                message: format!("filter tree exceeds maximum nesting depth of {}", MAX_FILTER_DEPTH),
                field: None,
            });
        }
        for child in &group.groups {
            stack.push((child, depth + 1));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn nested_groups(depth: usize) -> FilterGroup {
    let mut group = FilterGroup::default();
    for _ in 1..depth {
        group = FilterGroup {
            groups: vec![group],
            ..Default::default()
        };
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_operator_fallback_is_or() {
        assert_eq!(GroupOperator::parse("AND"), GroupOperator::And);
        assert_eq!(GroupOperator::parse("and"), GroupOperator::And);
        assert_eq!(GroupOperator::parse("OR"), GroupOperator::Or);
        assert_eq!(GroupOperator::parse("XOR"), GroupOperator::Or);
        assert_eq!(GroupOperator::parse(""), GroupOperator::Or);
    }

    #[test]
    fn test_depth_guard() {
        assert!(ensure_depth(&nested_groups(MAX_FILTER_DEPTH)).is_ok());
        assert!(ensure_depth(&nested_groups(MAX_FILTER_DEPTH + 1)).is_err());
    }

    #[test]
    fn test_group_deserializes_with_defaults() {
        let group: FilterGroup = serde_json::from_str(r#"{"operator":"OR"}"#).unwrap();
        assert!(group.conditions.is_empty());
        assert!(group.groups.is_empty());
        assert_eq!(GroupOperator::parse(&group.operator), GroupOperator::Or);
    }
}
