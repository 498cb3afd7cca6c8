use rust_decimal::Decimal;
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CLASSIFIEDS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            billing: BillingConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

// ─── Billing Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Price seeded for CPC when the cost table has no open row.
    #[serde(default = "default_cpc_price")]
    pub default_cpc_price: Decimal,
    /// Price per 1000 impressions seeded for CPM.
    #[serde(default = "default_cpm_price")]
    pub default_cpm_price: Decimal,
    /// Upper bound on waiting for a campaign row lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_cpc_price() -> Decimal { Decimal::new(50, 2) }
fn default_cpm_price() -> Decimal { Decimal::new(500, 2) }
fn default_lock_timeout_ms() -> u64 { 2000 }
fn default_sweep_interval_secs() -> u64 { 300 }

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_cpc_price: default_cpc_price(),
            default_cpm_price: default_cpm_price(),
            lock_timeout_ms: default_lock_timeout_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

// ─── Auth Config ────────────────────────────────────────────────────────────

/// Development bearer-token scheme. Production: replace with JWT.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_dev_password")]
    pub dev_password: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_dev_password() -> String { "classificados".to_string() }
fn default_admin_password() -> String { "admin".to_string() }
fn default_token_ttl_hours() -> i64 { 24 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_password: default_dev_password(),
            admin_password: default_admin_password(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CLASSIFIEDS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
