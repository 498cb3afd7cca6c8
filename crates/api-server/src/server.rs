//! API server: builds the router and starts the HTTP and metrics listeners.

use crate::rest::{self, AppState};
use crate::{admin_rest, auth, publicidade_rest, swagger};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use classifieds_core::config::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the full application router.
///
/// Metering and operational routes are public; everything else requires a
/// bearer token.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        // Metering (fired by ad-serving clients)
        .route("/publicidades/:id/impressao", post(publicidade_rest::record_impression))
        .route("/publicidades/:id/clique", post(publicidade_rest::record_click))
        // Auth
        .route("/auth/login", post(rest::handle_login))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .route("/api-docs/openapi.json", get(swagger::openapi_json));

    let authenticated = Router::new()
        // Owner panel
        .route(
            "/painel/publicidades",
            get(publicidade_rest::list_campaigns).post(publicidade_rest::create_campaign),
        )
        .route("/painel/publicidades/:id/renovar", post(publicidade_rest::renew_campaign))
        .route("/publicidades/:id/metricas", get(publicidade_rest::campaign_metrics))
        .route("/publicidades/:id/plafond", get(publicidade_rest::plafond_status))
        // Admin
        .route("/admin/custos", get(admin_rest::list_costs))
        .route("/admin/custos/:modelo", put(admin_rest::set_price))
        .route("/admin/publicidades/:id/aprovar", post(admin_rest::approve_campaign))
        .route("/admin/publicidades/:id/rejeitar", post(admin_rest::reject_campaign))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    public
        .merge(authenticated)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
