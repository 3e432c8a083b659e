//! The field and condition catalog — which customer fields can be segmented
//! on, and which condition operators apply to each field type.

use serde::{Deserialize, Serialize};

/// Declared type of a segmentable field. Drives the set of applicable
/// conditions and the expected value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
    Text,
    Date,
}

/// A segmentable customer field. Wire tokens are camelCase to match the
/// customer record's wire keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldName {
    #[serde(rename = "totalSpend")]
    TotalSpend,
    #[serde(rename = "totalVisits")]
    TotalVisits,
    #[serde(rename = "lastActivity")]
    LastActivity,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "address")]
    Address,
    #[serde(rename = "phone")]
    Phone,
}

impl FieldName {
    /// Declared type of this field.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldName::TotalSpend | FieldName::TotalVisits => FieldType::Number,
            FieldName::LastActivity => FieldType::Date,
            FieldName::Email | FieldName::Name | FieldName::Address | FieldName::Phone => {
                FieldType::Text
            }
        }
    }

    /// Human-readable display name for this field.
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldName::TotalSpend => "Total Spend",
            FieldName::TotalVisits => "Total Visits",
            FieldName::LastActivity => "Last Activity",
            FieldName::Email => "Email",
            FieldName::Name => "Name",
            FieldName::Address => "Address",
            FieldName::Phone => "Phone",
        }
    }

    /// Every field in the catalog, in display order.
    pub fn all() -> &'static [FieldName] {
        &[
            FieldName::TotalSpend,
            FieldName::TotalVisits,
            FieldName::LastActivity,
            FieldName::Email,
            FieldName::Name,
            FieldName::Address,
            FieldName::Phone,
        ]
    }
}

/// A condition operator. Which operators are selectable depends on the
/// field's declared type; see [`ConditionKind::applies_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    #[serde(rename = "EQ")]
    Eq,
    #[serde(rename = "NE")]
    Ne,
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "GTE")]
    Gte,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "CONTAINS")]
    Contains,
    #[serde(rename = "NOCONTAINS")]
    NotContains,
    /// Last activity at least N days ago (value = day count).
    #[serde(rename = "INACTIVE_DAYS")]
    InactiveDays,
    /// Last activity within the last N days (value = day count).
    #[serde(rename = "ACTIVE_DAYS")]
    ActiveDays,
}

impl ConditionKind {
    /// Whether this condition is valid for a field of the given type.
    pub fn applies_to(&self, field_type: FieldType) -> bool {
        Self::for_field_type(field_type).contains(self)
    }

    /// The conditions selectable for a field of the given type.
    pub fn for_field_type(field_type: FieldType) -> &'static [ConditionKind] {
        match field_type {
            FieldType::Number => &[
                ConditionKind::Eq,
                ConditionKind::Ne,
                ConditionKind::Gt,
                ConditionKind::Lt,
                ConditionKind::Gte,
                ConditionKind::Lte,
            ],
            FieldType::Text => &[
                ConditionKind::Eq,
                ConditionKind::Ne,
                ConditionKind::Contains,
                ConditionKind::NotContains,
            ],
            FieldType::Date => &[ConditionKind::InactiveDays, ConditionKind::ActiveDays],
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
