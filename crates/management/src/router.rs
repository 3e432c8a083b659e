//! CRM API router — auth endpoints stay open, everything under /api
//! requires a live session.

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crm_core::AppConfig;

use crate::ai::KeywordRuleGenerator;
use crate::auth::SessionStore;
use crate::handlers::{self, CrmState};
use crate::store::CrmStore;

/// Build the full CRM router with a freshly seeded store.
pub fn crm_router(config: &AppConfig) -> Router {
    let state = CrmState {
        store: Arc::new(CrmStore::new()),
        sessions: Arc::new(SessionStore::new(
            config.auth.dev_password.clone(),
            config.auth.session_ttl_hours,
        )),
        rule_generator: Arc::new(KeywordRuleGenerator),
        sample_cap: config.preview.sample_cap,
    };

    let api = Router::new()
        .route(
            "/api/customers",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/api/customers/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route(
            "/api/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route(
            "/api/orders/:id",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        .route(
            "/api/campaigns",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route(
            "/api/campaigns/:id",
            get(handlers::get_campaign)
                .put(handlers::update_campaign)
                .delete(handlers::delete_campaign),
        )
        .route(
            "/api/campaigns/audience-preview",
            axum::routing::post(handlers::audience_preview),
        )
        .route(
            "/api/communication-logs/campaign/:campaign_id",
            get(handlers::logs_for_campaign),
        )
        .route(
            "/api/ai/segment-rules",
            axum::routing::post(handlers::generate_segment_rules),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_session,
        ));

    Router::new()
        .route("/auth/login", axum::routing::post(handlers::handle_login))
        .route("/auth/current_user", get(handlers::handle_current_user))
        .route("/auth/logout", get(handlers::handle_logout))
        .route("/health", get(|| async { "ok" }))
        .merge(api)
        .with_state(state)
}
