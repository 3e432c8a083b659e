use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A CRM customer record. Wire keys are camelCase so that `totalSpend`,
/// `totalVisits` and `lastActivity` line up with the segmentation field
/// catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub total_spend: f64,
    #[serde(default)]
    pub total_visits: u64,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: String::new(),
            address: String::new(),
            total_spend: 0.0,
            total_visits: 0,
            last_activity: now,
            created_at: now,
        }
    }
}
