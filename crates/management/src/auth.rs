//! Bearer-token auth with an explicit session store.
//!
//! Development: accepts any username with the configured dev password,
//! returns a random token. Production: replace with JWT + OAuth2
//! (jsonwebtoken crate + Auth0/Ory). Sessions are plain state with an
//! explicit lifecycle: created on login, looked up per request, removed on
//! logout.

use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use tracing::info;

use crate::handlers::CrmState;
use crate::models::{CurrentUserResponse, ErrorResponse, LoginRequest, LoginResponse};

const TOKEN_PREFIX: &str = "crm_dev_";

#[derive(Debug, Clone)]
struct Session {
    user: String,
    expires_at: DateTime<Utc>,
}

/// Explicit session state owned by the application, keyed by bearer token.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    dev_password: String,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(dev_password: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            dev_password: dev_password.into(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Validate credentials and open a session.
    pub fn login(&self, req: &LoginRequest) -> Result<LoginResponse, String> {
        // Development: admin/admin or any user with the configured password
        let accepted = (req.username == "admin" && req.password == "admin")
            || req.password == self.dev_password;
        if !accepted {
            return Err("Invalid credentials".to_string());
        }
        let now = Utc::now();
        // expired sessions are already denied; drop them so the map
        // does not grow without bound
        self.sessions.retain(|_, s| s.expires_at > now);
        let token = generate_token();
        let expires_at = now + self.ttl;
        self.sessions.insert(
            token.clone(),
            Session {
                user: req.username.clone(),
                expires_at,
            },
        );
        info!(user = %req.username, "Session opened");
        Ok(LoginResponse {
            token,
            user: req.username.clone(),
            expires_at,
        })
    }

    /// Who the bearer of `token` is, in the shape the frontend polls on
    /// startup.
    pub fn current_user(&self, token: Option<&str>) -> CurrentUserResponse {
        let user = token.and_then(|t| {
            self.sessions
                .get(t)
                .filter(|s| s.expires_at > Utc::now())
                .map(|s| s.user.clone())
        });
        CurrentUserResponse {
            is_authenticated: user.is_some(),
            user,
        }
    }

    /// Tear down the session. Idempotent.
    pub fn logout(&self, token: Option<&str>) -> bool {
        let removed = token
            .map(|t| self.sessions.remove(t).is_some())
            .unwrap_or(false);
        if removed {
            info!("Session closed");
        }
        removed
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.sessions
            .get(token)
            .map(|s| s.expires_at > Utc::now())
            .unwrap_or(false)
    }
}

/// Middleware guarding the /api routes: requires a live session token.
pub async fn require_session(State(state): State<CrmState>, req: Request, next: Next) -> Response {
    match bearer_token(req.headers()) {
        Some(token) if state.sessions.is_valid(token) => next.run(req).await,
        Some(_) => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "invalid_token".to_string(),
                message: "Invalid or expired bearer token".to_string(),
            }),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "missing_auth".to_string(),
                message: "Authorization header with Bearer token required".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Pull the bearer token out of an Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    format!(
        "{}{}",
        TOKEN_PREFIX,
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    )
}

// ─── Tests ─────────────────────────────────────────────────────────────────
