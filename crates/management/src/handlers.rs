//! Axum REST handlers for the CRM API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crm_audience::{matches, AudienceEvaluator, LocalEvaluator};
use crm_core::{CrmError, CrmResult, Customer};
use crm_segmentation::RuleNode;

use crate::ai::RuleGenerator;
use crate::auth::{self, SessionStore};
use crate::models::*;
use crate::store::CrmStore;

/// Shared application state.
#[derive(Clone)]
pub struct CrmState {
    pub store: Arc<CrmStore>,
    pub sessions: Arc<SessionStore>,
    pub rule_generator: Arc<dyn RuleGenerator>,
    pub sample_cap: usize,
}

impl CrmState {
    fn evaluator(&self) -> LocalEvaluator<Arc<CrmStore>> {
        LocalEvaluator::new(self.store.clone(), self.sample_cap)
    }
}

/// Every customer matching `rules` right now. Validation errors bubble up
/// so the caller can surface them.
fn matched_audience(store: &CrmStore, rules: &RuleNode) -> CrmResult<Vec<Customer>> {
    rules
        .validate()
        .map_err(|e| CrmError::Validation(e.to_string()))?;
    let now = Utc::now();
    let mut audience = Vec::new();
    for customer in store.list_customers() {
        if matches(&customer, rules, now)? {
            audience.push(customer);
        }
    }
    Ok(audience)
}

fn failure(status: StatusCode, message: String) -> (StatusCode, Json<FailureResponse>) {
    (status, Json(FailureResponse::new(message)))
}

fn failure_for(err: CrmError) -> (StatusCode, Json<FailureResponse>) {
    let status = match err {
        CrmError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(status, err.to_string())
}

// ─── Auth ──────────────────────────────────────────────────────────────────

pub async fn handle_login(
    State(state): State<CrmState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.sessions.login(&req) {
        Ok(resp) => Ok(Json(resp)),
        Err(message) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "auth_failed".to_string(),
                message,
            }),
        )),
    }
}

pub async fn handle_current_user(
    State(state): State<CrmState>,
    headers: HeaderMap,
) -> Json<CurrentUserResponse> {
    Json(state.sessions.current_user(auth::bearer_token(&headers)))
}

pub async fn handle_logout(
    State(state): State<CrmState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    state.sessions.logout(auth::bearer_token(&headers));
    Json(serde_json::json!({ "success": true }))
}

// ─── Customers ─────────────────────────────────────────────────────────────

pub async fn list_customers(State(state): State<CrmState>) -> Json<Vec<Customer>> {
    Json(state.store.list_customers())
}

pub async fn get_customer(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, StatusCode> {
    state
        .store
        .get_customer(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn create_customer(
    State(state): State<CrmState>,
    Json(req): Json<CreateCustomerRequest>,
) -> (StatusCode, Json<Customer>) {
    let customer = state.store.create_customer(req);
    metrics::counter!("crm.customers.created").increment(1);
    (StatusCode::CREATED, Json(customer))
}

pub async fn update_customer(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, StatusCode> {
    state
        .store
        .update_customer(id, req)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn delete_customer(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.store.delete_customer(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ─── Orders ────────────────────────────────────────────────────────────────

pub async fn list_orders(State(state): State<CrmState>) -> Json<Vec<Order>> {
    Json(state.store.list_orders())
}

pub async fn get_order(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, StatusCode> {
    state
        .store
        .get_order(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn create_order(
    State(state): State<CrmState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), (StatusCode, Json<ErrorResponse>)> {
    match state.store.create_order(req) {
        Some(order) => {
            metrics::counter!("crm.orders.created").increment(1);
            Ok((StatusCode::CREATED, Json(order)))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "unknown_customer".to_string(),
                message: "Order references a customer that does not exist".to_string(),
            }),
        )),
    }
}

pub async fn update_order(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, StatusCode> {
    state
        .store
        .update_order(id, req)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn delete_order(State(state): State<CrmState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.store.delete_order(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

pub async fn list_campaigns(State(state): State<CrmState>) -> Json<Vec<Campaign>> {
    Json(state.store.list_campaigns())
}

pub async fn get_campaign(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, StatusCode> {
    state
        .store
        .get_campaign(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Create a campaign and immediately simulate delivery to its matched
/// audience, one communication log per customer.
pub async fn create_campaign(
    State(state): State<CrmState>,
    Json(mut req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>), (StatusCode, Json<FailureResponse>)> {
    let audience = matched_audience(&state.store, &req.segment_rules).map_err(failure_for)?;
    req.audience_size = audience.len() as u64;
    let campaign = state.store.create_campaign(req);
    state.store.simulate_delivery(campaign.id, &audience);
    metrics::counter!("crm.campaigns.created").increment(1);
    // return the post-delivery state (status, sentAt)
    let campaign = state
        .store
        .get_campaign(campaign.id)
        .unwrap_or(campaign);
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn update_campaign(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, StatusCode> {
    state
        .store
        .update_campaign(id, req)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn delete_campaign(
    State(state): State<CrmState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.store.delete_campaign(id) {
        metrics::counter!("crm.campaigns.deleted").increment(1);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Audience preview for the rule builder. Empty or incomplete trees are not
/// an error: no evaluation happens and the audience is reported as zero.
pub async fn audience_preview(
    State(state): State<CrmState>,
    Json(req): Json<AudiencePreviewRequest>,
) -> Result<Json<AudiencePreviewResponse>, (StatusCode, Json<FailureResponse>)> {
    metrics::counter!("crm.audience_preview.requests").increment(1);
    if !req.segment_rules.is_complete() {
        return Ok(Json(AudiencePreviewResponse {
            success: true,
            audience_size: 0,
            sample_customer_emails: Vec::new(),
        }));
    }
    match state.evaluator().preview(req.segment_rules).await {
        Ok(preview) => Ok(Json(AudiencePreviewResponse {
            success: true,
            audience_size: preview.audience_size,
            sample_customer_emails: preview.sample_customer_emails,
        })),
        Err(e) => {
            warn!(error = %e, "Audience preview failed");
            Err(failure_for(e))
        }
    }
}

// ─── Communication logs ────────────────────────────────────────────────────

pub async fn logs_for_campaign(
    State(state): State<CrmState>,
    Path(campaign_id): Path<Uuid>,
) -> Json<Vec<CommunicationLog>> {
    Json(state.store.logs_for_campaign(campaign_id))
}

// ─── AI rule generation ────────────────────────────────────────────────────

/// Generate a rule tree from free text and report the audience it would
/// reach. The result replaces the builder's tree wholesale.
pub async fn generate_segment_rules(
    State(state): State<CrmState>,
    Json(req): Json<AiRuleRequest>,
) -> Result<Json<AiRuleResponse>, (StatusCode, Json<FailureResponse>)> {
    let rules = state
        .rule_generator
        .generate(&req.natural_language_query)
        .map_err(failure_for)?;
    let preview = state
        .evaluator()
        .preview(rules.clone())
        .await
        .map_err(failure_for)?;
    metrics::counter!("crm.ai.rules_generated").increment(1);
    Ok(Json(AiRuleResponse {
        success: true,
        segment_rules: rules,
        audience_size: preview.audience_size,
    }))
}
