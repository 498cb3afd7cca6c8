//! Shared REST plumbing: application state, response envelopes, error
//! mapping, and operational endpoints.

use crate::auth::{LoginRequest, LoginResponse, SessionStore};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use classifieds_billing::{
    BudgetService, CampaignLifecycle, CampaignStore, CostTable, LedgerReporter, MeteringEngine,
};
use classifieds_core::config::AppConfig;
use classifieds_core::CampaignError;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};
use utoipa::ToSchema;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CampaignStore>,
    pub costs: Arc<CostTable>,
    pub metering: Arc<MeteringEngine>,
    pub budget: Arc<BudgetService>,
    pub lifecycle: Arc<CampaignLifecycle>,
    pub reports: Arc<LedgerReporter>,
    pub sessions: Arc<SessionStore>,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    /// Wire every billing component from configuration.
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(CampaignStore::new(Duration::from_millis(
            config.billing.lock_timeout_ms,
        )));
        let costs = Arc::new(CostTable::new(&config.billing));
        costs.ensure_defaults();

        Self {
            metering: Arc::new(MeteringEngine::new(store.clone(), costs.clone())),
            budget: Arc::new(BudgetService::new(store.clone())),
            lifecycle: Arc::new(CampaignLifecycle::new(store.clone(), costs.clone())),
            reports: Arc::new(LedgerReporter::new(store.clone())),
            sessions: Arc::new(SessionStore::new(config.auth.clone())),
            store,
            costs,
            node_id: config.node_id.clone(),
            start_time: Instant::now(),
        }
    }
}

/// Success envelope: `{ message, data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            message: message.into(),
            data,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler error. Engine errors map to HTTP by [`CampaignError`] kind.
#[derive(Debug)]
pub enum ApiError {
    Campaign(CampaignError),
    Unauthorized(&'static str),
    Forbidden,
}

impl From<CampaignError> for ApiError {
    fn from(e: CampaignError) -> Self {
        Self::Campaign(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Campaign(CampaignError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Campaign(CampaignError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Campaign(CampaignError::Validation(rejection.body_text()))
    }
}

// ─── Extractors ─────────────────────────────────────────────────────────────
// Same as axum's, but malformed input answers with the `{ error, message }` body.

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.to_string()),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Admin role required".to_string(),
            ),
            Self::Campaign(e) => {
                let code = e.code();
                match e {
                    CampaignError::NotFound(msg) => (StatusCode::NOT_FOUND, code, msg.clone()),
                    CampaignError::Validation(msg) => (StatusCode::BAD_REQUEST, code, msg.clone()),
                    CampaignError::BudgetExceeded { .. } => (
                        StatusCode::FORBIDDEN,
                        code,
                        "plafond máximo atingido".to_string(),
                    ),
                    CampaignError::DailyBudgetExceeded { .. } => (
                        StatusCode::FORBIDDEN,
                        code,
                        "limite diário atingido".to_string(),
                    ),
                    CampaignError::Transient(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        code,
                        "Temporary failure, the request may be retried".to_string(),
                    ),
                    CampaignError::Configuration(_)
                    | CampaignError::Serialization(_)
                    | CampaignError::Internal(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        code,
                        "Internal processing error".to_string(),
                    ),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        if status.is_server_error() {
            error!(error = ?self, "Request failed");
            metrics::counter!("api.errors", "code" => error).increment(1);
        } else if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            warn!(code = error, "Request refused");
        }
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub campaigns: usize,
}

/// POST /auth/login: Exchange development credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    state
        .sessions
        .login(&req)
        .map(Json)
        .ok_or(ApiError::Unauthorized("Invalid credentials"))
}

/// GET /health: Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "Operations"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        campaigns: state.store.len(),
    })
}

/// GET /ready: Readiness probe. The cost table must price both models.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Ready to accept traffic"),
        (status = 503, description = "Cost table not configured"),
    ),
    tag = "Operations"
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let priced = classifieds_core::BillingModel::ALL
        .iter()
        .all(|m| state.costs.current_price(*m).is_ok());
    if priced {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live: Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    responses((status = 200, description = "Process is alive")),
    tag = "Operations"
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
