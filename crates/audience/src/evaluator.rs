//! Audience evaluation — the contract the preview backend satisfies, plus a
//! reference evaluator matching rule trees against in-memory customers.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crm_core::{CrmError, CrmResult, Customer};
use crm_segmentation::{
    ConditionKind, ConditionNode, FieldName, GroupOperator, RuleNode,
};

/// Result of previewing an audience: matching customer count plus a small
/// e-mail sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudiencePreview {
    pub audience_size: u64,
    pub sample_customer_emails: Vec<String>,
}

impl AudiencePreview {
    /// The preview for an empty or incomplete rule tree: zero matches, no
    /// sample, no error.
    pub fn empty() -> Self {
        Self {
            audience_size: 0,
            sample_customer_emails: Vec::new(),
        }
    }
}

/// The boundary an audience preview backend must satisfy: given a complete
/// rule tree, report the matching audience. How the backend stores and scans
/// customers is its own business.
pub trait AudienceEvaluator: Send + Sync + 'static {
    fn preview(&self, rules: RuleNode) -> impl Future<Output = CrmResult<AudiencePreview>> + Send;
}

/// Supplies the customer records the local evaluator scans.
pub trait CustomerSource: Send + Sync {
    fn customers(&self) -> Vec<Customer>;
}

impl CustomerSource for Vec<Customer> {
    fn customers(&self) -> Vec<Customer> {
        self.clone()
    }
}

impl<T: CustomerSource + ?Sized> CustomerSource for std::sync::Arc<T> {
    fn customers(&self) -> Vec<Customer> {
        (**self).customers()
    }
}

/// Reference evaluator over an in-memory customer set. Validates the tree
/// before scanning, so a stale field/condition pair surfaces as an error
/// instead of silently matching nothing.
pub struct LocalEvaluator<S> {
    source: S,
    sample_cap: usize,
}

impl<S: CustomerSource> LocalEvaluator<S> {
    pub fn new(source: S, sample_cap: usize) -> Self {
        Self { source, sample_cap }
    }
}

impl<S: CustomerSource + 'static> AudienceEvaluator for LocalEvaluator<S> {
    async fn preview(&self, rules: RuleNode) -> CrmResult<AudiencePreview> {
        rules
            .validate()
            .map_err(|e| CrmError::Validation(e.to_string()))?;
        let now = Utc::now();
        let mut audience_size = 0u64;
        let mut sample_customer_emails = Vec::new();
        for customer in self.source.customers() {
            if matches(&customer, &rules, now)? {
                audience_size += 1;
                if sample_customer_emails.len() < self.sample_cap {
                    sample_customer_emails.push(customer.email.clone());
                }
            }
        }
        Ok(AudiencePreview {
            audience_size,
            sample_customer_emails,
        })
    }
}

/// Whether `customer` matches `node` at evaluation time `now`.
///
/// Draft children are skipped; AND requires every remaining child to match,
/// OR at least one. Child order never affects the outcome.
pub fn matches(customer: &Customer, node: &RuleNode, now: DateTime<Utc>) -> CrmResult<bool> {
    match node {
        RuleNode::Group(group) => match group.operator {
            GroupOperator::And => {
                for child in group.children.iter().filter(|c| c.is_complete()) {
                    if !matches(customer, child, now)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            GroupOperator::Or => {
                for child in group.children.iter().filter(|c| c.is_complete()) {
                    if matches(customer, child, now)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
        RuleNode::Condition(cond) => match_condition(customer, cond, now),
    }
}

fn match_condition(
    customer: &Customer,
    cond: &ConditionNode,
    now: DateTime<Utc>,
) -> CrmResult<bool> {
    let (Some(field), Some(kind)) = (cond.field, cond.condition) else {
        return Err(CrmError::Validation(
            "cannot evaluate a draft condition".to_string(),
        ));
    };
    match field {
        FieldName::TotalSpend => {
            compare_numbers(customer.total_spend, kind, expect_number(cond, field)?)
        }
        FieldName::TotalVisits => {
            compare_numbers(customer.total_visits as f64, kind, expect_number(cond, field)?)
        }
        FieldName::LastActivity => {
            let cutoff = activity_cutoff(now, expect_number(cond, field)?, field)?;
            match kind {
                ConditionKind::InactiveDays => Ok(customer.last_activity <= cutoff),
                ConditionKind::ActiveDays => Ok(customer.last_activity >= cutoff),
                other => Err(condition_mismatch(field, other)),
            }
        }
        FieldName::Email => compare_text(&customer.email, kind, expect_text(cond, field)?),
        FieldName::Name => compare_text(&customer.name, kind, expect_text(cond, field)?),
        FieldName::Address => compare_text(&customer.address, kind, expect_text(cond, field)?),
        FieldName::Phone => compare_text(&customer.phone, kind, expect_text(cond, field)?),
    }
}

fn compare_numbers(actual: f64, kind: ConditionKind, expected: f64) -> CrmResult<bool> {
    match kind {
        ConditionKind::Eq => Ok(actual == expected),
        ConditionKind::Ne => Ok(actual != expected),
        ConditionKind::Gt => Ok(actual > expected),
        ConditionKind::Lt => Ok(actual < expected),
        ConditionKind::Gte => Ok(actual >= expected),
        ConditionKind::Lte => Ok(actual <= expected),
        other => Err(CrmError::Validation(format!(
            "{other:?} is not a numeric condition"
        ))),
    }
}

/// Text comparisons are case-insensitive on trimmed values.
fn compare_text(actual: &str, kind: ConditionKind, expected: &str) -> CrmResult<bool> {
    let actual = actual.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    match kind {
        ConditionKind::Eq => Ok(actual == expected),
        ConditionKind::Ne => Ok(actual != expected),
        ConditionKind::Contains => Ok(actual.contains(&expected)),
        ConditionKind::NotContains => Ok(!actual.contains(&expected)),
        other => Err(CrmError::Validation(format!(
            "{other:?} is not a string condition"
        ))),
    }
}

/// `now` minus the day count, as a fallible computation. Day counts that are
/// not finite or would push the cutoff outside the representable date range
/// are validation errors, never panics.
fn activity_cutoff(
    now: DateTime<Utc>,
    days: f64,
    field: FieldName,
) -> CrmResult<DateTime<Utc>> {
    if !days.is_finite() {
        return Err(CrmError::Validation(format!(
            "{} day count must be a finite number",
            field.display_name()
        )));
    }
    let out_of_range = || {
        CrmError::Validation(format!(
            "{} day count is out of range",
            field.display_name()
        ))
    };
    let window = Duration::try_days(days as i64).ok_or_else(out_of_range)?;
    now.checked_sub_signed(window).ok_or_else(out_of_range)
}

fn condition_mismatch(field: FieldName, kind: ConditionKind) -> CrmError {
    CrmError::Validation(format!(
        "{kind:?} is not applicable to {}",
        field.display_name()
    ))
}

fn expect_number(cond: &ConditionNode, field: FieldName) -> CrmResult<f64> {
    cond.value.as_number().ok_or_else(|| {
        CrmError::Validation(format!(
            "{} expects a numeric value",
            field.display_name()
        ))
    })
}

fn expect_text<'a>(cond: &'a ConditionNode, field: FieldName) -> CrmResult<&'a str> {
    cond.value.as_text().ok_or_else(|| {
        CrmError::Validation(format!("{} expects a text value", field.display_name()))
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crm_segmentation::{GroupNode, RuleValue};

    fn condition(field: FieldName, kind: ConditionKind, value: RuleValue) -> RuleNode {
        RuleNode::Condition(ConditionNode {
            field: Some(field),
            condition: Some(kind),
            value,
        })
    }

    fn group(operator: GroupOperator, children: Vec<RuleNode>) -> RuleNode {
        RuleNode::Group(GroupNode { operator, children })
    }

    fn customer(
        name: &str,
        email: &str,
        spend: f64,
        visits: u64,
        inactive_days: i64,
    ) -> Customer {
        let mut c = Customer::new(name, email);
        c.total_spend = spend;
        c.total_visits = visits;
        c.last_activity = Utc::now() - Duration::days(inactive_days);
        c
    }

    fn fixture_customers() -> Vec<Customer> {
        vec![
            customer("Acme Inc", "ops@acme.example", 12_000.0, 40, 200),
            customer("Bolt Ltd", "hello@bolt.example", 6_500.0, 3, 10),
            customer("Cara Shah", "cara@example.com", 900.0, 12, 400),
            customer("Dyna Inc", "billing@dyna.example", 4_000.0, 1, 365),
            customer("Eli Stone", "eli@example.com", 5_100.0, 7, 2),
        ]
    }

    #[tokio::test]
    async fn test_flat_spend_filter() {
        let evaluator = LocalEvaluator::new(fixture_customers(), 5);
        let rules = group(
            GroupOperator::And,
            vec![condition(
                FieldName::TotalSpend,
                ConditionKind::Gt,
                RuleValue::Number(5000.0),
            )],
        );
        let preview = evaluator.preview(rules).await.unwrap();
        assert_eq!(preview.audience_size, 3);
        assert_eq!(
            preview.sample_customer_emails,
            vec!["ops@acme.example", "hello@bolt.example", "eli@example.com"]
        );
    }

    #[tokio::test]
    async fn test_nested_and_over_or() {
        // inactive 180+ days AND (spend > 5000 OR name contains "Inc")
        let rules = group(
            GroupOperator::And,
            vec![
                condition(
                    FieldName::LastActivity,
                    ConditionKind::InactiveDays,
                    RuleValue::Number(180.0),
                ),
                group(
                    GroupOperator::Or,
                    vec![
                        condition(
                            FieldName::TotalSpend,
                            ConditionKind::Gt,
                            RuleValue::Number(5000.0),
                        ),
                        condition(
                            FieldName::Name,
                            ConditionKind::Contains,
                            RuleValue::Text("Inc".to_string()),
                        ),
                    ],
                ),
            ],
        );
        let evaluator = LocalEvaluator::new(fixture_customers(), 5);
        let preview = evaluator.preview(rules).await.unwrap();
        // Acme (spend + name), Dyna (name only); Cara is inactive but matches
        // neither branch, Bolt and Eli are recently active
        assert_eq!(preview.audience_size, 2);
        assert_eq!(
            preview.sample_customer_emails,
            vec!["ops@acme.example", "billing@dyna.example"]
        );
    }

    #[tokio::test]
    async fn test_text_comparisons_case_insensitive() {
        let now = Utc::now();
        let c = customer("Acme Inc", "Ops@Acme.example", 0.0, 0, 0);
        let contains = condition(
            FieldName::Email,
            ConditionKind::Contains,
            RuleValue::Text("ACME".to_string()),
        );
        assert!(matches(&c, &contains, now).unwrap());
        let eq = condition(
            FieldName::Name,
            ConditionKind::Eq,
            RuleValue::Text("acme inc".to_string()),
        );
        assert!(matches(&c, &eq, now).unwrap());
        let nocontains = condition(
            FieldName::Name,
            ConditionKind::NotContains,
            RuleValue::Text("ltd".to_string()),
        );
        assert!(matches(&c, &nocontains, now).unwrap());
    }

    #[tokio::test]
    async fn test_active_days_window() {
        let now = Utc::now();
        let recent = customer("Eli Stone", "eli@example.com", 0.0, 0, 2);
        let dormant = customer("Cara Shah", "cara@example.com", 0.0, 0, 400);
        let active = condition(
            FieldName::LastActivity,
            ConditionKind::ActiveDays,
            RuleValue::Number(30.0),
        );
        assert!(matches(&recent, &active, now).unwrap());
        assert!(!matches(&dormant, &active, now).unwrap());
        let inactive = condition(
            FieldName::LastActivity,
            ConditionKind::InactiveDays,
            RuleValue::Number(30.0),
        );
        assert!(!matches(&recent, &inactive, now).unwrap());
        assert!(matches(&dormant, &inactive, now).unwrap());
    }

    #[test]
    fn test_extreme_day_counts_rejected() {
        // day counts that saturate the i64 cast or overflow the date range
        // must surface as validation errors, never panic
        let now = Utc::now();
        let c = customer("Acme Inc", "ops@acme.example", 0.0, 0, 10);
        for extreme in [1e19, -1e19, 1e9, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            for kind in [ConditionKind::InactiveDays, ConditionKind::ActiveDays] {
                let rule = condition(FieldName::LastActivity, kind, RuleValue::Number(extreme));
                let result = matches(&c, &rule, now);
                assert!(
                    matches!(result, Err(CrmError::Validation(_))),
                    "day count {extreme} should be rejected"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_sample_respects_cap() {
        let evaluator = LocalEvaluator::new(fixture_customers(), 2);
        let rules = group(
            GroupOperator::And,
            vec![condition(
                FieldName::TotalSpend,
                ConditionKind::Gte,
                RuleValue::Number(0.0),
            )],
        );
        let preview = evaluator.preview(rules).await.unwrap();
        assert_eq!(preview.audience_size, 5);
        assert_eq!(preview.sample_customer_emails.len(), 2);
    }

    #[tokio::test]
    async fn test_incomplete_tree_rejected() {
        let evaluator = LocalEvaluator::new(fixture_customers(), 5);
        let err = evaluator.preview(RuleNode::empty_group()).await.unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
    }

    #[tokio::test]
    async fn test_stale_condition_rejected() {
        // numeric operator left behind after the field changed to text
        let evaluator = LocalEvaluator::new(fixture_customers(), 5);
        let rules = group(
            GroupOperator::And,
            vec![condition(
                FieldName::Email,
                ConditionKind::Gt,
                RuleValue::Text("x".to_string()),
            )],
        );
        let err = evaluator.preview(rules).await.unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
    }

    #[test]
    fn test_or_group_order_independent() {
        let now = Utc::now();
        let c = customer("Acme Inc", "ops@acme.example", 100.0, 0, 0);
        let a = condition(
            FieldName::Name,
            ConditionKind::Contains,
            RuleValue::Text("Inc".to_string()),
        );
        let b = condition(
            FieldName::TotalSpend,
            ConditionKind::Gt,
            RuleValue::Number(1000.0),
        );
        let forward = group(GroupOperator::Or, vec![a.clone(), b.clone()]);
        let reversed = group(GroupOperator::Or, vec![b, a]);
        assert_eq!(
            matches(&c, &forward, now).unwrap(),
            matches(&c, &reversed, now).unwrap()
        );
    }
}
