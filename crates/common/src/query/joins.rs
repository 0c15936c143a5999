//! Join-requirement analysis
//!
//! Determines, in one pass over the filter tree, which optional relations
//! the base query must join before the compiled predicate can run.

use super::{FilterField, FilterGroup, MAX_FILTER_DEPTH};

/// Which relations the compiled filter will reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinRequirements {
    /// Any condition anywhere references `author_name`
    pub author: bool,
    /// Any condition anywhere references `tags`
    pub tag: bool,
}

impl JoinRequirements {
    /// Depth-first walk over every condition at every nesting level,
    /// regardless of the enclosing logical operator. Each join is reported
    /// once no matter how many conditions reference it.
    pub fn analyze(root: &FilterGroup) -> Self {
        let mut req = JoinRequirements::default();
        let mut stack = vec![(root, 1usize)];

        while let Some((group, depth)) = stack.pop() {
            if depth > MAX_FILTER_DEPTH {
                continue;
            }
            for cond in &group.conditions {
                if let Some(field) = FilterField::parse(&cond.field) {
                    req.author |= field.references_author();
                    req.tag |= field.references_tag();
                }
            }
            if req.author && req.tag {
                break;
            }
            for child in &group.groups {
                stack.push((child, depth + 1));
            }
        }

        req
    }

    pub fn any(&self) -> bool {
        self.author || self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterCondition;
    use serde_json::json;

    fn cond(field: &str) -> FilterCondition {
        FilterCondition {
            id: None,
            field: field.to_string(),
            operator: "contains".to_string(),
            value: json!("x"),
        }
    }

    #[test]
    fn test_no_joins_for_plain_fields() {
        let group = FilterGroup::all_of(vec![cond("title_keyword"), cond("year_from")]);
        let req = JoinRequirements::analyze(&group);
        assert!(!req.author);
        assert!(!req.tag);
        assert!(!req.any());
    }

    #[test]
    fn test_author_detected_three_levels_deep() {
        let inner = FilterGroup::all_of(vec![cond("author_name")]);
        let mid = FilterGroup {
            operator: "OR".to_string(),
            groups: vec![inner],
            ..Default::default()
        };
        let root = FilterGroup {
            conditions: vec![cond("title_keyword")],
            groups: vec![mid],
            ..Default::default()
        };

        let req = JoinRequirements::analyze(&root);
        assert!(req.author);
        assert!(!req.tag);
    }

    #[test]
    fn test_tag_detected_regardless_of_operator() {
        let root = FilterGroup {
            operator: "whatever".to_string(),
            conditions: vec![cond("tags")],
            ..Default::default()
        };
        assert!(JoinRequirements::analyze(&root).tag);
    }

    #[test]
    fn test_unknown_fields_do_not_require_joins() {
        let group = FilterGroup::all_of(vec![cond("author_shoe_size")]);
        assert!(!JoinRequirements::analyze(&group).any());
    }
}
