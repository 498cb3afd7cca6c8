//! Admin endpoints: cost-table maintenance and campaign review.

use crate::auth::Principal;
use crate::rest::{ApiError, ApiJson, ApiPath, ApiResponse, AppState, ErrorResponse};
use axum::extract::State;
use axum::{Extension, Json};
use classifieds_billing::{Campaign, CostEntry};
use classifieds_core::{BillingModel, CampaignError};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPriceRequest {
    /// Per click for CPC, per 1000 impressions for CPM.
    pub price: Decimal,
}

/// GET /admin/custos: Full cost-table history.
#[utoipa::path(
    get,
    path = "/admin/custos",
    responses(
        (status = 200, description = "Cost entries, open and closed", body = [CostEntry]),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn list_costs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<CostEntry>>>, ApiError> {
    principal.require_admin()?;
    Ok(ApiResponse::new("custos", state.costs.entries()))
}

/// PUT /admin/custos/:modelo: Replace the current price for a billing model.
#[utoipa::path(
    put,
    path = "/admin/custos/{modelo}",
    params(("modelo" = BillingModel, Path, description = "cpc or cpm")),
    request_body = SetPriceRequest,
    responses(
        (status = 200, description = "New open cost entry", body = CostEntry),
        (status = 400, description = "Unknown model or invalid price", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn set_price(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(modelo): ApiPath<String>,
    ApiJson(req): ApiJson<SetPriceRequest>,
) -> Result<Json<ApiResponse<CostEntry>>, ApiError> {
    principal.require_admin()?;
    let model: BillingModel = modelo.parse().map_err(CampaignError::Validation)?;
    let entry = state.costs.set_price(model, req.price)?;
    Ok(ApiResponse::new("custo atualizado", entry))
}

/// POST /admin/publicidades/:id/aprovar: Approve a pending campaign.
#[utoipa::path(
    post,
    path = "/admin/publicidades/{id}/aprovar",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign is active", body = Campaign),
        (status = 400, description = "Campaign is not pending", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn approve_campaign(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Campaign>>, ApiError> {
    principal.require_admin()?;
    let campaign = state.lifecycle.approve(id).await?;
    Ok(ApiResponse::new("publicidade aprovada", campaign))
}

/// POST /admin/publicidades/:id/rejeitar: Reject a pending campaign.
#[utoipa::path(
    post,
    path = "/admin/publicidades/{id}/rejeitar",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign rejected", body = Campaign),
        (status = 400, description = "Campaign is not pending", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn reject_campaign(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Campaign>>, ApiError> {
    principal.require_admin()?;
    let campaign = state.lifecycle.reject(id).await?;
    Ok(ApiResponse::new("publicidade rejeitada", campaign))
}
