//! Natural-language rule generation boundary.
//!
//! The real service is external and opaque; it takes free text and hands
//! back a full rule tree, which replaces the draft wholesale. The keyword
//! generator below is the development stand-in: a few common phrasings
//! mapped onto the same tree shape the rule editor produces.

use crm_core::{CrmError, CrmResult};
use crm_segmentation::{
    ConditionKind, ConditionNode, FieldName, GroupNode, GroupOperator, RuleNode, RuleValue,
};

/// Boundary for turning a free-text audience description into a rule tree.
pub trait RuleGenerator: Send + Sync {
    fn generate(&self, query: &str) -> CrmResult<RuleNode>;
}

/// Development generator recognizing spend, visit and activity phrasings,
/// e.g. "customers who spent over 5000 or have been inactive for 90 days".
pub struct KeywordRuleGenerator;

impl RuleGenerator for KeywordRuleGenerator {
    fn generate(&self, query: &str) -> CrmResult<RuleNode> {
        let lowered = query.to_lowercase();
        let words: Vec<&str> = lowered
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| c == ',' || c == '.' || c == '?'))
            .collect();

        let mut children = Vec::new();
        for (i, word) in words.iter().enumerate() {
            match *word {
                "spent" | "spend" | "spending" => {
                    if let Some((kind, amount)) = comparison_after(&words, i) {
                        children.push(condition(FieldName::TotalSpend, kind, amount));
                    }
                }
                "visited" | "visits" | "visit" => {
                    if let Some((kind, count)) = comparison_after(&words, i) {
                        children.push(condition(FieldName::TotalVisits, kind, count));
                    }
                }
                "inactive" | "dormant" => {
                    if let Some(days) = number_after(&words, i) {
                        children.push(condition(
                            FieldName::LastActivity,
                            ConditionKind::InactiveDays,
                            days,
                        ));
                    }
                }
                "active" => {
                    if let Some(days) = number_after(&words, i) {
                        children.push(condition(
                            FieldName::LastActivity,
                            ConditionKind::ActiveDays,
                            days,
                        ));
                    }
                }
                _ => {}
            }
        }

        if children.is_empty() {
            return Err(CrmError::Validation(
                "could not derive segment rules from the query".to_string(),
            ));
        }

        let operator = if words.contains(&"or") {
            GroupOperator::Or
        } else {
            GroupOperator::And
        };
        Ok(RuleNode::Group(GroupNode { operator, children }))
    }
}

fn condition(field: FieldName, kind: ConditionKind, value: f64) -> RuleNode {
    RuleNode::Condition(ConditionNode {
        field: Some(field),
        condition: Some(kind),
        value: RuleValue::Number(value),
    })
}

/// Comparator keyword plus the first number after position `i`, defaulting
/// to greater-than when only a number is found.
fn comparison_after(words: &[&str], i: usize) -> Option<(ConditionKind, f64)> {
    let kind = words[i + 1..]
        .iter()
        .take(3)
        .find_map(|w| match *w {
            "over" | "above" | "more" => Some(ConditionKind::Gt),
            "under" | "below" | "less" | "fewer" => Some(ConditionKind::Lt),
            "exactly" => Some(ConditionKind::Eq),
            "least" => Some(ConditionKind::Gte),
            _ => None,
        })
        .unwrap_or(ConditionKind::Gt);
    number_after(words, i).map(|n| (kind, n))
}

/// First parseable number after position `i`, tolerating currency symbols
/// and thousands separators.
fn number_after(words: &[&str], i: usize) -> Option<f64> {
    words[i + 1..].iter().take(6).find_map(|w| {
        let cleaned: String = w
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            cleaned.parse::<f64>().ok()
        }
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────
