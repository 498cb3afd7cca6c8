//! Campaign (publicidade) endpoints: public metering plus the owner panel.

use crate::auth::Principal;
use crate::rest::{
    ApiError, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, ErrorResponse,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use classifieds_billing::{
    BudgetStatus, Campaign, ChargeOutcome, MetricsPeriod, MetricsReport, NewCampaign,
    RenewalRequest,
};
use classifieds_core::MetricEventType;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MetricsQuery {
    /// `hoje`, `semana` or `mes`. Defaults to `hoje`.
    pub periodo: Option<MetricsPeriod>,
}

/// Load a campaign the caller may see. Foreign campaigns look missing.
async fn owned_campaign(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<Campaign, ApiError> {
    let campaign = state.store.get(id).await?;
    if principal.is_admin() || campaign.owner_id == principal.user_id {
        Ok(campaign)
    } else {
        Err(classifieds_core::CampaignError::campaign_not_found(id).into())
    }
}

// ─── Metering (public) ─────────────────────────────────────────────────────

/// POST /publicidades/:id/impressao: Record an ad impression.
#[utoipa::path(
    post,
    path = "/publicidades/{id}/impressao",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Impression recorded; body is { message, data }", body = ChargeOutcome),
        (status = 403, description = "Plafond or daily limit reached", body = ErrorResponse),
        (status = 404, description = "Unknown campaign", body = ErrorResponse),
    ),
    tag = "Metering"
)]
pub async fn record_impression(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ChargeOutcome>>, ApiError> {
    let outcome = state.metering.record(id, MetricEventType::Impression).await?;
    Ok(ApiResponse::new("impressão registada", outcome))
}

/// POST /publicidades/:id/clique: Record an ad click.
#[utoipa::path(
    post,
    path = "/publicidades/{id}/clique",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Click recorded; body is { message, data }", body = ChargeOutcome),
        (status = 403, description = "Plafond or daily limit reached", body = ErrorResponse),
        (status = 404, description = "Unknown campaign", body = ErrorResponse),
    ),
    tag = "Metering"
)]
pub async fn record_click(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ChargeOutcome>>, ApiError> {
    let outcome = state.metering.record(id, MetricEventType::Click).await?;
    Ok(ApiResponse::new("clique registado", outcome))
}

// ─── Owner panel ───────────────────────────────────────────────────────────

/// POST /painel/publicidades: Book a new campaign (pending review).
#[utoipa::path(
    post,
    path = "/painel/publicidades",
    request_body = NewCampaign,
    responses(
        (status = 201, description = "Campaign created", body = Campaign),
        (status = 400, description = "Invalid campaign", body = ErrorResponse),
    ),
    tag = "Campaigns"
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<NewCampaign>,
) -> Result<(StatusCode, Json<ApiResponse<Campaign>>), ApiError> {
    let campaign = state.lifecycle.create(principal.user_id, req)?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::new("publicidade criada", campaign),
    ))
}

/// GET /painel/publicidades: The caller's campaigns, newest first.
#[utoipa::path(
    get,
    path = "/painel/publicidades",
    responses((status = 200, description = "Campaigns owned by the caller", body = [Campaign])),
    tag = "Campaigns"
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<Campaign>>>, ApiError> {
    let campaigns = state.store.list_by_owner(principal.user_id).await?;
    Ok(ApiResponse::new("publicidades", campaigns))
}

/// GET /publicidades/:id/metricas: Ledger counts and costs grouped by day.
#[utoipa::path(
    get,
    path = "/publicidades/{id}/metricas",
    params(("id" = Uuid, Path, description = "Campaign id"), MetricsQuery),
    responses(
        (status = 200, description = "Per-day metrics", body = MetricsReport),
        (status = 404, description = "Unknown campaign", body = ErrorResponse),
    ),
    tag = "Campaigns"
)]
pub async fn campaign_metrics(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<MetricsQuery>,
) -> Result<Json<ApiResponse<MetricsReport>>, ApiError> {
    owned_campaign(&state, &principal, id).await?;
    let report = state
        .reports
        .metrics(id, query.periodo.unwrap_or_default())
        .await?;
    Ok(ApiResponse::new("métricas", report))
}

/// GET /publicidades/:id/plafond: Current spend against both ceilings.
#[utoipa::path(
    get,
    path = "/publicidades/{id}/plafond",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Budget status", body = BudgetStatus),
        (status = 404, description = "Unknown campaign", body = ErrorResponse),
    ),
    tag = "Campaigns"
)]
pub async fn plafond_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<BudgetStatus>>, ApiError> {
    owned_campaign(&state, &principal, id).await?;
    let status = state.budget.status(id).await?;
    Ok(ApiResponse::new("plafond", status))
}

/// POST /painel/publicidades/:id/renovar: Extend budget, end date or daily cap.
#[utoipa::path(
    post,
    path = "/painel/publicidades/{id}/renovar",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = RenewalRequest,
    responses(
        (status = 200, description = "Campaign renewed", body = Campaign),
        (status = 400, description = "Invalid renewal", body = ErrorResponse),
        (status = 404, description = "Unknown, foreign or unapproved campaign", body = ErrorResponse),
    ),
    tag = "Campaigns"
)]
pub async fn renew_campaign(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RenewalRequest>,
) -> Result<Json<ApiResponse<Campaign>>, ApiError> {
    let campaign = state.budget.renew(id, principal.user_id, req).await?;
    Ok(ApiResponse::new("publicidade renovada", campaign))
}
