//! Audience segmentation rule engine — recursive AND/OR rule trees,
//! the field/condition catalog, and the path-addressed tree editor.

pub mod editor;
pub mod fields;
pub mod rules;

pub use editor::{add_child, node_at, remove_child, set_operator, update_field};
pub use editor::{EditError, FieldAssignment};
pub use fields::{ConditionKind, FieldName, FieldType};
pub use rules::{ConditionNode, GroupNode, GroupOperator, RuleError, RuleNode, RuleValue};
