//! Path-addressed structural edits over rule trees.
//!
//! Every operation takes the current tree by reference and returns a brand
//! new tree, rebuilding the ancestor chain along the path. The input tree is
//! never touched and shares no mutable structure with the result, so callers
//! can keep both versions side by side.
//!
//! Paths are index sequences descending `children` at each step; `[]` is the
//! root. Bad paths are contract violations and fail loudly with [`EditError`]
//! rather than silently no-opping.

use thiserror::Error;

use crate::fields::{ConditionKind, FieldName};
use crate::rules::{GroupNode, GroupOperator, RuleNode, RuleValue};

/// Editor contract violations. These never occur under a well-behaved UI
/// that only issues paths it obtained from the current tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("path {path:?} does not resolve: no child at depth {depth}")]
    PathNotFound { path: Vec<usize>, depth: usize },

    #[error("node at {path:?} is a condition, not a group")]
    NotAGroup { path: Vec<usize> },

    #[error("the root group cannot be removed")]
    CannotRemoveRoot,

    #[error("key `{key}` is not applicable to the node at {path:?}")]
    KeyNotApplicable { key: &'static str, path: Vec<usize> },
}

/// One key assignment for [`update_field`]. Groups accept `Operator`;
/// conditions accept `Field`, `Condition` and `Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAssignment {
    Operator(GroupOperator),
    Field(Option<FieldName>),
    Condition(Option<ConditionKind>),
    Value(RuleValue),
}

impl FieldAssignment {
    fn key(&self) -> &'static str {
        match self {
            FieldAssignment::Operator(_) => "operator",
            FieldAssignment::Field(_) => "field",
            FieldAssignment::Condition(_) => "condition",
            FieldAssignment::Value(_) => "value",
        }
    }
}

/// Borrow the node at `path`, or `PathNotFound`.
pub fn node_at<'a>(tree: &'a RuleNode, path: &[usize]) -> Result<&'a RuleNode, EditError> {
    let mut node = tree;
    for (depth, &index) in path.iter().enumerate() {
        let children = match node {
            RuleNode::Group(group) => &group.children,
            RuleNode::Condition(_) => {
                return Err(EditError::PathNotFound {
                    path: path.to_vec(),
                    depth,
                })
            }
        };
        node = children.get(index).ok_or_else(|| EditError::PathNotFound {
            path: path.to_vec(),
            depth,
        })?;
    }
    Ok(node)
}

/// Set one key on the node at `path`, returning the new tree. Assigning a
/// group key to a condition (or vice versa) is `KeyNotApplicable`.
///
/// Changing `field` deliberately leaves `condition`/`value` alone; the
/// caller owns that coupling, and `RuleNode::validate` catches any stale
/// combination before evaluation.
pub fn update_field(
    tree: &RuleNode,
    path: &[usize],
    assignment: FieldAssignment,
) -> Result<RuleNode, EditError> {
    rebuild(tree, path, 0, path, &mut |node| match (node, &assignment) {
        (RuleNode::Group(group), FieldAssignment::Operator(operator)) => {
            Ok(RuleNode::Group(GroupNode {
                operator: *operator,
                children: group.children.clone(),
            }))
        }
        (RuleNode::Condition(cond), FieldAssignment::Field(field)) => {
            let mut cond = cond.clone();
            cond.field = *field;
            Ok(RuleNode::Condition(cond))
        }
        (RuleNode::Condition(cond), FieldAssignment::Condition(condition)) => {
            let mut cond = cond.clone();
            cond.condition = *condition;
            Ok(RuleNode::Condition(cond))
        }
        (RuleNode::Condition(cond), FieldAssignment::Value(value)) => {
            let mut cond = cond.clone();
            cond.value = value.clone();
            Ok(RuleNode::Condition(cond))
        }
        _ => Err(EditError::KeyNotApplicable {
            key: assignment.key(),
            path: path.to_vec(),
        }),
    })
}

/// Append a fresh child to the group at `path`: an empty AND group when
/// `as_group`, otherwise a draft condition. The new child is always last.
pub fn add_child(tree: &RuleNode, path: &[usize], as_group: bool) -> Result<RuleNode, EditError> {
    rebuild(tree, path, 0, path, &mut |node| {
        let RuleNode::Group(group) = node else {
            return Err(EditError::NotAGroup {
                path: path.to_vec(),
            });
        };
        let mut children = group.children.clone();
        children.push(if as_group {
            RuleNode::empty_group()
        } else {
            RuleNode::draft_condition()
        });
        Ok(RuleNode::Group(GroupNode {
            operator: group.operator,
            children,
        }))
    })
}

/// Remove the node at `path` from its parent's children. The root itself
/// cannot be removed.
pub fn remove_child(tree: &RuleNode, path: &[usize]) -> Result<RuleNode, EditError> {
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(EditError::CannotRemoveRoot);
    };
    rebuild(tree, parent_path, 0, path, &mut |node| {
        let RuleNode::Group(group) = node else {
            return Err(EditError::PathNotFound {
                path: path.to_vec(),
                depth: parent_path.len(),
            });
        };
        if index >= group.children.len() {
            return Err(EditError::PathNotFound {
                path: path.to_vec(),
                depth: parent_path.len(),
            });
        }
        let mut children = group.children.clone();
        children.remove(index);
        Ok(RuleNode::Group(GroupNode {
            operator: group.operator,
            children,
        }))
    })
}

/// Shorthand for `update_field(tree, path, Operator(operator))`.
pub fn set_operator(
    tree: &RuleNode,
    path: &[usize],
    operator: GroupOperator,
) -> Result<RuleNode, EditError> {
    update_field(tree, path, FieldAssignment::Operator(operator))
}

/// Walk down `rest`, apply `edit` to the target node, and rebuild every
/// ancestor with the replaced child. The clone at each level is deep, so the
/// returned tree is fully independent of the input. `full` is the path as
/// the caller wrote it, for error reporting.
fn rebuild(
    node: &RuleNode,
    rest: &[usize],
    depth: usize,
    full: &[usize],
    edit: &mut dyn FnMut(&RuleNode) -> Result<RuleNode, EditError>,
) -> Result<RuleNode, EditError> {
    let Some((&index, tail)) = rest.split_first() else {
        return edit(node);
    };
    let RuleNode::Group(group) = node else {
        return Err(EditError::PathNotFound {
            path: full.to_vec(),
            depth,
        });
    };
    let child = group
        .children
        .get(index)
        .ok_or_else(|| EditError::PathNotFound {
            path: full.to_vec(),
            depth,
        })?;
    let new_child = rebuild(child, tail, depth + 1, full, edit)?;
    let mut children = group.children.clone();
    children[index] = new_child;
    Ok(RuleNode::Group(GroupNode {
        operator: group.operator,
        children,
    }))
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ConditionNode;

    fn condition(field: FieldName, kind: ConditionKind, value: RuleValue) -> RuleNode {
        RuleNode::Condition(ConditionNode {
            field: Some(field),
            condition: Some(kind),
            value,
        })
    }

    /// `{AND, [spend > 5000, {OR, [visits >= 3, name CONTAINS "Inc"]}]}`
    fn sample_tree() -> RuleNode {
        RuleNode::Group(GroupNode {
            operator: GroupOperator::And,
            children: vec![
                condition(
                    FieldName::TotalSpend,
                    ConditionKind::Gt,
                    RuleValue::Number(5000.0),
                ),
                RuleNode::Group(GroupNode {
                    operator: GroupOperator::Or,
                    children: vec![
                        condition(
                            FieldName::TotalVisits,
                            ConditionKind::Gte,
                            RuleValue::Number(3.0),
                        ),
                        condition(
                            FieldName::Name,
                            ConditionKind::Contains,
                            RuleValue::Text("Inc".to_string()),
                        ),
                    ],
                }),
            ],
        })
    }

    #[test]
    fn test_update_field_leaves_input_unchanged() {
        let tree = sample_tree();
        let before = tree.clone();
        let updated = update_field(
            &tree,
            &[1, 1],
            FieldAssignment::Value(RuleValue::Text("Ltd".to_string())),
        )
        .unwrap();
        assert_eq!(tree, before);
        let node = node_at(&updated, &[1, 1]).unwrap();
        assert_eq!(
            node.as_condition().unwrap().value,
            RuleValue::Text("Ltd".to_string())
        );
    }

    #[test]
    fn test_update_field_does_not_reset_condition() {
        // switching field leaves the old operator/value in place; validation
        // is responsible for flagging the stale pair
        let tree = sample_tree();
        let updated =
            update_field(&tree, &[0], FieldAssignment::Field(Some(FieldName::Email))).unwrap();
        let cond = node_at(&updated, &[0]).unwrap().as_condition().unwrap();
        assert_eq!(cond.field, Some(FieldName::Email));
        assert_eq!(cond.condition, Some(ConditionKind::Gt));
        assert!(updated.validate().is_err());
    }

    #[test]
    fn test_update_field_key_not_applicable() {
        let tree = sample_tree();
        // operator on a condition
        assert_eq!(
            update_field(&tree, &[0], FieldAssignment::Operator(GroupOperator::Or)),
            Err(EditError::KeyNotApplicable {
                key: "operator",
                path: vec![0],
            })
        );
        // field on a group
        assert!(matches!(
            update_field(&tree, &[1], FieldAssignment::Field(Some(FieldName::Name))),
            Err(EditError::KeyNotApplicable { key: "field", .. })
        ));
    }

    #[test]
    fn test_update_field_path_not_found() {
        let tree = sample_tree();
        assert!(matches!(
            update_field(&tree, &[5], FieldAssignment::Value(RuleValue::empty())),
            Err(EditError::PathNotFound { .. })
        ));
        // descending through a condition
        assert!(matches!(
            update_field(&tree, &[0, 0], FieldAssignment::Value(RuleValue::empty())),
            Err(EditError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_add_child_appends_draft_condition_last() {
        let tree = sample_tree();
        let updated = add_child(&tree, &[1], false).unwrap();
        let group = node_at(&updated, &[1]).unwrap().as_group().unwrap();
        assert_eq!(group.children.len(), 3);
        assert_eq!(group.children[2], RuleNode::draft_condition());
        // input untouched
        assert_eq!(
            sample_tree().as_group().unwrap().children[1]
                .as_group()
                .unwrap()
                .children
                .len(),
            2
        );
    }

    #[test]
    fn test_add_child_appends_empty_group_at_root() {
        let updated = add_child(&sample_tree(), &[], true).unwrap();
        let root = updated.as_group().unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[2], RuleNode::empty_group());
    }

    #[test]
    fn test_add_child_not_a_group() {
        assert_eq!(
            add_child(&sample_tree(), &[0], false),
            Err(EditError::NotAGroup { path: vec![0] })
        );
    }

    #[test]
    fn test_remove_child_leaf() {
        let tree = sample_tree();
        let updated = remove_child(&tree, &[1, 0]).unwrap();
        let group = node_at(&updated, &[1]).unwrap().as_group().unwrap();
        assert_eq!(group.children.len(), 1);
        // the surviving sibling shifted down
        assert_eq!(
            group.children[0].as_condition().unwrap().field,
            Some(FieldName::Name)
        );
        // everything outside the path is untouched
        assert_eq!(
            node_at(&updated, &[0]).unwrap(),
            node_at(&tree, &[0]).unwrap()
        );
    }

    #[test]
    fn test_remove_child_root_rejected() {
        assert_eq!(
            remove_child(&sample_tree(), &[]),
            Err(EditError::CannotRemoveRoot)
        );
    }

    #[test]
    fn test_remove_then_add_does_not_resurrect() {
        let tree = sample_tree();
        let removed = remove_child(&tree, &[0]).unwrap();
        let readded = add_child(&removed, &[], false).unwrap();
        let root = readded.as_group().unwrap();
        // a draft is appended last, not the old condition restored in place
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1], RuleNode::draft_condition());
        assert_ne!(root.children[1], tree.as_group().unwrap().children[0]);
    }

    #[test]
    fn test_set_operator() {
        let tree = sample_tree();
        let updated = set_operator(&tree, &[1], GroupOperator::And).unwrap();
        assert_eq!(
            node_at(&updated, &[1]).unwrap().as_group().unwrap().operator,
            GroupOperator::And
        );
        assert_eq!(
            tree.as_group().unwrap().children[1]
                .as_group()
                .unwrap()
                .operator,
            GroupOperator::Or
        );
    }

    #[test]
    fn test_deep_nesting() {
        // build AND > OR > AND > condition and edit the deepest node
        let mut tree = RuleNode::empty_group();
        tree = add_child(&tree, &[], true).unwrap();
        tree = add_child(&tree, &[0], true).unwrap();
        tree = add_child(&tree, &[0, 0], false).unwrap();
        tree = update_field(
            &tree,
            &[0, 0, 0],
            FieldAssignment::Field(Some(FieldName::Phone)),
        )
        .unwrap();
        let cond = node_at(&tree, &[0, 0, 0]).unwrap().as_condition().unwrap();
        assert_eq!(cond.field, Some(FieldName::Phone));
    }
}
