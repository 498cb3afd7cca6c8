use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// How a campaign is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BillingModel {
    /// Cost per click.
    Cpc,
    /// Cost per mille: the table price covers 1000 impressions.
    Cpm,
}

impl BillingModel {
    pub const ALL: [BillingModel; 2] = [BillingModel::Cpc, BillingModel::Cpm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpc => "cpc",
            Self::Cpm => "cpm",
        }
    }

    /// The event type this model charges for. Other events record at zero cost.
    pub fn billable_event(self) -> MetricEventType {
        match self {
            Self::Cpc => MetricEventType::Click,
            Self::Cpm => MetricEventType::Impression,
        }
    }
}

impl fmt::Display for BillingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpc" => Ok(Self::Cpc),
            "cpm" => Ok(Self::Cpm),
            other => Err(format!("unknown billing model '{other}'")),
        }
    }
}

/// Kind of ledger event fired by ad-serving clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MetricEventType {
    Impression,
    Click,
}

impl MetricEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Impression => "impression",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for MetricEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Pending,
    Active,
    Concluded,
    Rejected,
}

impl CampaignStatus {
    /// Approved states, the only ones renewal accepts.
    pub fn is_renewable(self) -> bool {
        matches!(self, Self::Active | Self::Concluded)
    }

    /// States the lifecycle sweep may still move to `Concluded`.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Advertiser,
    Admin,
}
