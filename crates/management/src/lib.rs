//! CRM management backend — customers, orders, campaigns, communication
//! logs, auth sessions, and the audience preview endpoint.
//!
//! Data stored in DashMap (development); swap to PostgreSQL for production.

pub mod ai;
pub mod auth;
pub mod handlers;
pub mod models;
pub mod router;
pub mod store;

pub use ai::{KeywordRuleGenerator, RuleGenerator};
pub use auth::SessionStore;
pub use handlers::CrmState;
pub use router::crm_router;
pub use store::CrmStore;
