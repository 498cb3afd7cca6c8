//! OpenAPI document.

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Classifieds Advertising API",
        version = "0.1.0",
        description = "Sponsored-campaign booking with budget (plafond) metering.\n\nImpression and click endpoints are public; panel and admin endpoints require a bearer token.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Metering", description = "Impression/click recording against the plafond"),
        (name = "Campaigns", description = "Owner panel: booking, budget status, metrics and renewal"),
        (name = "Admin", description = "Cost table and campaign review"),
        (name = "Auth", description = "Development bearer-token login"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Metering
        crate::publicidade_rest::record_impression,
        crate::publicidade_rest::record_click,
        // Campaigns
        crate::publicidade_rest::create_campaign,
        crate::publicidade_rest::list_campaigns,
        crate::publicidade_rest::campaign_metrics,
        crate::publicidade_rest::plafond_status,
        crate::publicidade_rest::renew_campaign,
        // Admin
        crate::admin_rest::list_costs,
        crate::admin_rest::set_price,
        crate::admin_rest::approve_campaign,
        crate::admin_rest::reject_campaign,
        // Auth
        crate::rest::handle_login,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        classifieds_core::BillingModel,
        classifieds_core::MetricEventType,
        classifieds_core::CampaignStatus,
        classifieds_core::Role,
        classifieds_billing::Campaign,
        classifieds_billing::NewCampaign,
        classifieds_billing::MetricEvent,
        classifieds_billing::CostEntry,
        classifieds_billing::ChargeOutcome,
        classifieds_billing::BudgetStatus,
        classifieds_billing::RenewalRequest,
        classifieds_billing::MetricsPeriod,
        classifieds_billing::MetricsReport,
        classifieds_billing::report::DailyMetrics,
        classifieds_billing::report::MetricsTotals,
        crate::admin_rest::SetPriceRequest,
        crate::auth::LoginRequest,
        crate::auth::LoginResponse,
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
