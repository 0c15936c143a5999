//! Recursive filter-tree compilation
//!
//! Folds a tree of condition groups into one composed [`Condition`].
//! Join handling is not decided here; see [`super::joins`].

use super::{condition, ensure_depth, FilterGroup, GroupOperator, SkipReason};
use crate::errors::Result;
use sea_orm::Condition;

/// Result of compiling a filter tree
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    /// `None` means "no filter": the query returns the unfiltered
    /// (paginated) result set, not an empty one.
    pub condition: Option<Condition>,
    /// Every condition dropped during compilation, with why
    pub skipped: Vec<SkipReason>,
}

/// Compile a filter tree into a single condition.
///
/// The only error is adversarial nesting depth; malformed conditions are
/// silently dropped (reported via [`compile_with_report`]).
pub fn compile(root: &FilterGroup) -> Result<Option<Condition>> {
    compile_with_report(root).map(|compiled| compiled.condition)
}

/// Compile a filter tree, keeping the skip report for logging and tests.
pub fn compile_with_report(root: &FilterGroup) -> Result<CompiledFilter> {
    ensure_depth(root)?;

    let mut skipped = Vec::new();
    let condition = compile_group(root, &mut skipped);

    Ok(CompiledFilter { condition, skipped })
}

/// Post-order fold of one group. A group whose conditions all skip and whose
/// subgroups all collapse contributes nothing to its parent.
fn compile_group(group: &FilterGroup, skipped: &mut Vec<SkipReason>) -> Option<Condition> {
    let mut acc = match GroupOperator::parse(&group.operator) {
        GroupOperator::And => Condition::all(),
        GroupOperator::Or => Condition::any(),
    };
    let mut survivors = 0usize;

    for cond in &group.conditions {
        match condition::evaluate(cond) {
            condition::Compiled::Predicate(expr) => {
                acc = acc.add(expr);
                survivors += 1;
            }
            condition::Compiled::Skipped(reason) => skipped.push(reason),
        }
    }

    for child in &group.groups {
        if let Some(sub) = compile_group(child, skipped) {
            acc = acc.add(sub);
            survivors += 1;
        }
    }

    if survivors == 0 {
        None
    } else {
        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PaperEntity;
    use crate::query::{nested_groups, FilterCondition, MAX_FILTER_DEPTH};
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use serde_json::{json, Value};

    fn cond(field: &str, operator: &str, value: Value) -> FilterCondition {
        FilterCondition {
            id: None,
            field: field.to_string(),
            operator: operator.to_string(),
            value,
        }
    }

    fn sql_of(condition: Condition) -> String {
        PaperEntity::find()
            .filter(condition)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_empty_group_compiles_to_none() {
        let compiled = compile(&FilterGroup::default()).unwrap();
        assert!(compiled.is_none());
    }

    #[test]
    fn test_all_invalid_conditions_compile_to_none() {
        for operator in ["AND", "OR", "NAND"] {
            let group = FilterGroup {
                operator: operator.to_string(),
                conditions: vec![
                    cond("title_keyword", "contains", json!("")),
                    cond("year_from", "greater_equal", json!("not a year")),
                    cond("made_up_field", "equals", json!("x")),
                ],
                ..Default::default()
            };
            let compiled = compile_with_report(&group).unwrap();
            assert!(compiled.condition.is_none());
            assert_eq!(compiled.skipped.len(), 3);
        }
    }

    #[test]
    fn test_empty_subgroups_contribute_nothing() {
        let group = FilterGroup {
            conditions: vec![cond("year_from", "greater_equal", json!(2020))],
            groups: vec![FilterGroup::default(), FilterGroup::default()],
            ..Default::default()
        };
        let sql = sql_of(compile(&group).unwrap().unwrap());
        assert!(sql.contains(">= 2020"), "{}", sql);
        assert!(!sql.contains("()"), "empty parens in: {}", sql);
    }

    #[test]
    fn test_and_group_joins_conjunctively() {
        let group = FilterGroup {
            operator: "AND".to_string(),
            conditions: vec![
                cond("year_from", "greater_equal", json!(2015)),
                cond("min_citations", "greater_equal", json!(10)),
            ],
            ..Default::default()
        };
        let sql = sql_of(compile(&group).unwrap().unwrap());
        assert!(sql.contains(" AND "), "{}", sql);
        assert!(!sql.contains(" OR "), "{}", sql);
    }

    #[test]
    fn test_or_group_joins_disjunctively() {
        let group = FilterGroup {
            operator: "OR".to_string(),
            conditions: vec![
                cond("title_keyword", "contains", json!("bert")),
                cond("title_keyword", "contains", json!("gpt")),
            ],
            ..Default::default()
        };
        let sql = sql_of(compile(&group).unwrap().unwrap());
        assert!(sql.contains(" OR "), "{}", sql);
    }

    #[test]
    fn test_unrecognized_group_operator_falls_back_to_or() {
        let group = FilterGroup {
            operator: "NEITHER".to_string(),
            conditions: vec![
                cond("year_from", "equals", json!(2019)),
                cond("year_to", "equals", json!(2021)),
            ],
            ..Default::default()
        };
        let sql = sql_of(compile(&group).unwrap().unwrap());
        assert!(sql.contains(" OR "), "{}", sql);
    }

    #[test]
    fn test_nesting_is_not_flattened() {
        // AND(year >= 2015, OR(contains bert, contains gpt))
        let inner = FilterGroup {
            operator: "OR".to_string(),
            conditions: vec![
                cond("title_keyword", "contains", json!("bert")),
                cond("title_keyword", "contains", json!("gpt")),
            ],
            ..Default::default()
        };
        let root = FilterGroup {
            operator: "AND".to_string(),
            conditions: vec![cond("year_from", "greater_equal", json!(2015))],
            groups: vec![inner],
            ..Default::default()
        };
        let sql = sql_of(compile(&root).unwrap().unwrap());
        // The OR pair must stay parenthesized under the AND
        assert!(sql.contains("AND ("), "{}", sql);
        assert!(sql.contains(" OR "), "{}", sql);
    }

    #[test]
    fn test_partial_skip_keeps_valid_conditions() {
        let group = FilterGroup {
            operator: "AND".to_string(),
            conditions: vec![
                cond("year_from", "greater_equal", json!(2015)),
                cond("min_citations", "greater_than", json!("many")),
            ],
            ..Default::default()
        };
        let compiled = compile_with_report(&group).unwrap();
        let sql = sql_of(compiled.condition.unwrap());
        assert!(sql.contains(">= 2015"), "{}", sql);
        assert!(!sql.contains("citation_count"), "{}", sql);
        assert_eq!(compiled.skipped.len(), 1);
    }

    #[test]
    fn test_depth_cap_is_an_error() {
        let root = nested_groups(MAX_FILTER_DEPTH + 1);
        assert!(compile(&root).is_err());
    }
}
