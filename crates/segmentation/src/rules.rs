//! The recursive rule tree — AND/OR groups over field conditions.
//!
//! Wire format is fixed: groups are `{"operator", "children"}`, conditions
//! are `{"field", "condition", "value"}`. Draft conditions carry empty
//! strings for all three keys until the user completes them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::{ConditionKind, FieldName, FieldType};

/// A node in the segmentation tree: either a boolean combinator over child
/// nodes, or a single field/operator/value predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Group(GroupNode),
    Condition(ConditionNode),
}

/// Boolean AND/OR combinator over child rule nodes. Child order matters for
/// display only; evaluation is order-independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub operator: GroupOperator,
    pub children: Vec<RuleNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// A single predicate against one customer field. `field` and `condition`
/// are `None` while the node is still a draft; on the wire a draft carries
/// empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionNode {
    #[serde(with = "wire_token")]
    pub field: Option<FieldName>,
    #[serde(with = "wire_token")]
    pub condition: Option<ConditionKind>,
    pub value: RuleValue,
}

/// A condition's comparison value. Number for numeric and date (day count)
/// fields, text for string fields; empty text is the draft value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

impl RuleValue {
    pub fn empty() -> Self {
        RuleValue::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RuleValue::Text(t) if t.is_empty())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuleValue::Number(n) => Some(*n),
            RuleValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RuleValue::Text(t) => Some(t),
            RuleValue::Number(_) => None,
        }
    }
}

impl From<f64> for RuleValue {
    fn from(n: f64) -> Self {
        RuleValue::Number(n)
    }
}

impl From<&str> for RuleValue {
    fn from(t: &str) -> Self {
        RuleValue::Text(t.to_string())
    }
}

/// Validation failures for a rule tree. Recoverable: surfaced to the user,
/// never mutates the tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("rule tree is incomplete: every condition needs a field, a condition and a value, and every group at least one child")]
    Incomplete,

    #[error("condition is not applicable to {field} ({field_type:?} field)")]
    ConditionMismatch {
        field: &'static str,
        field_type: FieldType,
    },

    #[error("value type does not match {field}: expected a {expected}")]
    ValueMismatch {
        field: &'static str,
        expected: &'static str,
    },
}

impl RuleNode {
    /// A fresh root: `{operator: AND, children: []}`.
    pub fn empty_group() -> Self {
        RuleNode::Group(GroupNode {
            operator: GroupOperator::And,
            children: Vec::new(),
        })
    }

    /// A fresh draft condition: `{field: '', condition: '', value: ''}`.
    pub fn draft_condition() -> Self {
        RuleNode::Condition(ConditionNode {
            field: None,
            condition: None,
            value: RuleValue::empty(),
        })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, RuleNode::Group(_))
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            RuleNode::Group(g) => Some(g),
            RuleNode::Condition(_) => None,
        }
    }

    pub fn as_condition(&self) -> Option<&ConditionNode> {
        match self {
            RuleNode::Condition(c) => Some(c),
            RuleNode::Group(_) => None,
        }
    }

    /// Recursively true iff every condition has a field, a condition and a
    /// non-empty value, and every group has at least one child. Incomplete
    /// trees are excluded from evaluation and previewed as an empty audience.
    pub fn is_complete(&self) -> bool {
        match self {
            RuleNode::Group(group) => {
                !group.children.is_empty() && group.children.iter().all(RuleNode::is_complete)
            }
            RuleNode::Condition(cond) => {
                cond.field.is_some() && cond.condition.is_some() && !cond.value.is_empty()
            }
        }
    }

    /// Full pre-evaluation check: completeness plus field/condition type
    /// compatibility and value-type agreement. The editor does not reset a
    /// condition when its field changes, so a stale operator can survive in
    /// the tree; this is where it gets caught.
    pub fn validate(&self) -> Result<(), RuleError> {
        match self {
            RuleNode::Group(group) => {
                if group.children.is_empty() {
                    return Err(RuleError::Incomplete);
                }
                group.children.iter().try_for_each(RuleNode::validate)
            }
            RuleNode::Condition(cond) => cond.validate(),
        }
    }
}

impl ConditionNode {
    fn validate(&self) -> Result<(), RuleError> {
        let (Some(field), Some(condition)) = (self.field, self.condition) else {
            return Err(RuleError::Incomplete);
        };
        if self.value.is_empty() {
            return Err(RuleError::Incomplete);
        }
        let field_type = field.field_type();
        if !condition.applies_to(field_type) {
            return Err(RuleError::ConditionMismatch {
                field: field.display_name(),
                field_type,
            });
        }
        match field_type {
            FieldType::Number | FieldType::Date => {
                if self.value.as_number().is_none() {
                    return Err(RuleError::ValueMismatch {
                        field: field.display_name(),
                        expected: "number",
                    });
                }
            }
            FieldType::Text => {
                if self.value.as_text().is_none() {
                    return Err(RuleError::ValueMismatch {
                        field: field.display_name(),
                        expected: "string",
                    });
                }
            }
        }
        Ok(())
    }
}

/// Serde adapter mapping `None` to the wire's empty string and back, so that
/// draft nodes round-trip as `{"field": "", "condition": "", ...}`.
mod wire_token {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(token) => token.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        serde_json::from_value(serde_json::Value::String(raw)).map_err(serde::de::Error::custom)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
