use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// No open cost-table row for a billing model. Operator misconfiguration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("plafond máximo atingido (remaining {remaining}, required {required})")]
    BudgetExceeded { remaining: Decimal, required: Decimal },

    #[error("limite diário atingido (remaining {remaining}, required {required})")]
    DailyBudgetExceeded { remaining: Decimal, required: Decimal },

    #[error("Validation error: {0}")]
    Validation(String),

    /// Lock or transaction could not complete. Nothing was written.
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CampaignError {
    pub fn campaign_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("campaign {id} not found"))
    }

    /// Stable machine-readable code used in API error bodies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Configuration(_) => "configuration_error",
            Self::BudgetExceeded { .. } => "plafond_exceeded",
            Self::DailyBudgetExceeded { .. } => "daily_limit_exceeded",
            Self::Validation(_) => "validation_error",
            Self::Transient(_) => "transient_error",
            Self::Serialization(_) | Self::Internal(_) => "internal_error",
        }
    }
}
