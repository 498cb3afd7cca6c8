//! Simple bearer token authentication middleware.
//!
//! Development: the configured passwords grant the advertiser or admin role,
//! and tokens live in an in-memory session map.
//! Production: replace with JWT + OAuth2.

use crate::rest::{ApiError, AppState};
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use classifieds_core::config::AuthConfig;
use classifieds_core::Role;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

const DEV_TOKEN_PREFIX: &str = "cls_";

/// Caller identity resolved from a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: Uuid,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

struct Session {
    principal: Principal,
    expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: DashMap<String, Session>,
    config: AuthConfig,
}

impl SessionStore {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    /// Validate development credentials and open a session.
    pub fn login(&self, req: &LoginRequest) -> Option<LoginResponse> {
        let role = if req.password == self.config.admin_password {
            Role::Admin
        } else if req.password == self.config.dev_password {
            Role::Advertiser
        } else {
            return None;
        };
        info!(user_id = %req.user_id, role = ?role, "User logged in");
        Some(self.issue(Principal {
            user_id: req.user_id,
            role,
        }))
    }

    pub fn issue(&self, principal: Principal) -> LoginResponse {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(self.config.token_ttl_hours);
        self.sessions.insert(
            token.clone(),
            Session {
                principal,
                expires_at,
            },
        );
        LoginResponse {
            token,
            user_id: principal.user_id,
            role: principal.role,
            expires_at,
        }
    }

    /// Resolve a token, evicting it if expired.
    pub fn resolve(&self, token: &str) -> Option<Principal> {
        let principal = {
            let session = self.sessions.get(token)?;
            (session.expires_at > Utc::now()).then_some(session.principal)
        };
        if principal.is_none() {
            self.sessions.remove(token);
        }
        principal
    }
}

/// Generate a random bearer token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    format!(
        "{}{}",
        DEV_TOKEN_PREFIX,
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    )
}

/// Axum middleware that resolves the bearer token and stores the
/// [`Principal`] in request extensions.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return ApiError::Unauthorized("Authorization header with Bearer token required")
            .into_response();
    };

    match state.sessions.resolve(token) {
        Some(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        None => ApiError::Unauthorized("Invalid or expired bearer token").into_response(),
    }
}
