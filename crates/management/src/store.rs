//! In-memory CRM store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! This provides the same API surface for development and testing.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crm_audience::CustomerSource;
use crm_core::Customer;

use crate::models::*;

/// Thread-safe in-memory store for customers, orders, campaigns, and
/// communication logs.
pub struct CrmStore {
    customers: DashMap<Uuid, Customer>,
    orders: DashMap<Uuid, Order>,
    campaigns: DashMap<Uuid, Campaign>,
    communication_logs: DashMap<Uuid, CommunicationLog>,
}

impl CrmStore {
    pub fn new() -> Self {
        info!("CRM store initialized (in-memory, development mode)");
        let store = Self {
            customers: DashMap::new(),
            orders: DashMap::new(),
            campaigns: DashMap::new(),
            communication_logs: DashMap::new(),
        };
        store.seed_demo_data();
        store
    }

    /// An empty store, for tests that want full control over the data.
    pub fn empty() -> Self {
        Self {
            customers: DashMap::new(),
            orders: DashMap::new(),
            campaigns: DashMap::new(),
            communication_logs: DashMap::new(),
        }
    }

    // ─── Customers ─────────────────────────────────────────────────────────

    pub fn list_customers(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> =
            self.customers.iter().map(|r| r.value().clone()).collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        customers
    }

    pub fn get_customer(&self, id: Uuid) -> Option<Customer> {
        self.customers.get(&id).map(|r| r.value().clone())
    }

    pub fn create_customer(&self, req: CreateCustomerRequest) -> Customer {
        let mut customer = Customer::new(req.name, req.email);
        customer.phone = req.phone;
        customer.address = req.address;
        self.customers.insert(customer.id, customer.clone());
        customer
    }

    pub fn update_customer(&self, id: Uuid, req: UpdateCustomerRequest) -> Option<Customer> {
        self.customers.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            if let Some(name) = req.name {
                c.name = name;
            }
            if let Some(email) = req.email {
                c.email = email;
            }
            if let Some(phone) = req.phone {
                c.phone = phone;
            }
            if let Some(address) = req.address {
                c.address = address;
            }
            c.clone()
        })
    }

    pub fn delete_customer(&self, id: Uuid) -> bool {
        self.customers.remove(&id).is_some()
    }

    // ─── Orders ────────────────────────────────────────────────────────────

    pub fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|r| r.value().clone()).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub fn get_order(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|r| r.value().clone())
    }

    /// Create an order and roll its amount into the customer's aggregates
    /// (`totalSpend`, `totalVisits`, `lastActivity`) — the fields the
    /// segmentation engine filters on.
    pub fn create_order(&self, req: CreateOrderRequest) -> Option<Order> {
        if !self.customers.contains_key(&req.customer_id) {
            return None;
        }
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: req.customer_id,
            amount: req.amount,
            order_date: req.order_date,
            items: req.items,
            status: req.status,
            created_at: Utc::now(),
        };
        self.orders.insert(order.id, order.clone());
        if order.status == OrderStatus::Completed {
            if let Some(mut entry) = self.customers.get_mut(&order.customer_id) {
                let c = entry.value_mut();
                c.total_spend += order.amount;
                c.total_visits += 1;
                c.last_activity = Utc::now();
            }
        }
        Some(order)
    }

    pub fn update_order(&self, id: Uuid, req: UpdateOrderRequest) -> Option<Order> {
        self.orders.get_mut(&id).map(|mut entry| {
            let o = entry.value_mut();
            if let Some(amount) = req.amount {
                o.amount = amount;
            }
            if let Some(order_date) = req.order_date {
                o.order_date = order_date;
            }
            if let Some(items) = req.items {
                o.items = items;
            }
            if let Some(status) = req.status {
                o.status = status;
            }
            o.clone()
        })
    }

    pub fn delete_order(&self, id: Uuid) -> bool {
        self.orders.remove(&id).is_some()
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> =
            self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.get(&id).map(|r| r.value().clone())
    }

    pub fn create_campaign(&self, req: CreateCampaignRequest) -> Campaign {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: req.name,
            message_template: req.message_template,
            segment_rules: req.segment_rules,
            audience_size: req.audience_size,
            status: CampaignStatus::Pending,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.campaigns.insert(campaign.id, campaign.clone());
        campaign
    }

    pub fn update_campaign(&self, id: Uuid, req: UpdateCampaignRequest) -> Option<Campaign> {
        self.campaigns.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            if let Some(name) = req.name {
                c.name = name;
            }
            if let Some(template) = req.message_template {
                c.message_template = template;
            }
            if let Some(rules) = req.segment_rules {
                c.segment_rules = rules;
            }
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    pub fn delete_campaign(&self, id: Uuid) -> bool {
        let removed = self.campaigns.remove(&id).is_some();
        if removed {
            // also drop this campaign's delivery history
            let log_ids: Vec<Uuid> = self
                .communication_logs
                .iter()
                .filter(|r| r.value().campaign_id == id)
                .map(|r| *r.key())
                .collect();
            for log_id in log_ids {
                self.communication_logs.remove(&log_id);
            }
        }
        removed
    }

    // ─── Communication logs ────────────────────────────────────────────────

    /// Simulate delivery of a campaign to its matched audience, writing one
    /// log per customer at roughly a 90% success rate, and mark the campaign
    /// sent.
    pub fn simulate_delivery(&self, campaign_id: Uuid, audience: &[Customer]) -> usize {
        let Some(campaign) = self.get_campaign(campaign_id) else {
            return 0;
        };
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        for customer in audience {
            let status = if rng.gen_bool(0.9) {
                DeliveryStatus::Sent
            } else {
                DeliveryStatus::Failed
            };
            let message = campaign
                .message_template
                .replace("{name}", &customer.name);
            let log = CommunicationLog {
                id: Uuid::new_v4(),
                campaign_id,
                customer_id: customer.id,
                customer_email: customer.email.clone(),
                message_content: message,
                status,
                sent_at: now,
            };
            self.communication_logs.insert(log.id, log);
        }
        if let Some(mut entry) = self.campaigns.get_mut(&campaign_id) {
            let c = entry.value_mut();
            c.status = CampaignStatus::Sent;
            c.sent_at = Some(now);
            c.updated_at = now;
        }
        audience.len()
    }

    pub fn logs_for_campaign(&self, campaign_id: Uuid) -> Vec<CommunicationLog> {
        let mut logs: Vec<CommunicationLog> = self
            .communication_logs
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        logs.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        logs
    }

    // ─── Demo data ─────────────────────────────────────────────────────────

    fn seed_demo_data(&self) {
        let now = Utc::now();
        let seeds: [(&str, &str, &str, f64, u64, i64); 6] = [
            ("Acme Inc", "ops@acme.example", "+1-555-0101", 12_400.0, 38, 210),
            ("Bolt Ltd", "hello@bolt.example", "+1-555-0102", 6_800.0, 5, 12),
            ("Cara Shah", "cara@example.com", "+1-555-0103", 950.0, 14, 400),
            ("Dyna Inc", "billing@dyna.example", "", 4_100.0, 2, 365),
            ("Eli Stone", "eli@example.com", "+1-555-0105", 5_250.0, 9, 3),
            ("Fern & Co", "contact@fern.example", "", 230.0, 1, 95),
        ];
        for (name, email, phone, spend, visits, inactive_days) in seeds {
            let mut customer = Customer::new(name, email);
            customer.phone = phone.to_string();
            customer.total_spend = spend;
            customer.total_visits = visits;
            customer.last_activity = now - Duration::days(inactive_days);
            self.customers.insert(customer.id, customer);
        }
        info!(customers = self.customers.len(), "Seeded demo customers");
    }
}

impl Default for CrmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerSource for CrmStore {
    fn customers(&self) -> Vec<Customer> {
        self.list_customers()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
