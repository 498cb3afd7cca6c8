//! Budget-state and ledger types.

use chrono::{DateTime, NaiveDate, Utc};
use classifieds_core::{BillingModel, CampaignStatus, MetricEventType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Campaign ──────────────────────────────────────────────────────────────

/// A sponsored banner booking (publicidade) and its budget state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub billing_model: BillingModel,
    pub max_budget: Decimal,
    /// `None` means no per-day ceiling.
    pub daily_budget: Option<Decimal>,
    pub consumed_total: Decimal,
    pub consumed_today: Decimal,
    pub last_reset_date: Option<NaiveDate>,
    /// Impressions recorded so far, compared against `target_views`.
    pub impressions: u64,
    /// Cost-table price at creation time, kept for display.
    pub unit_cost: Decimal,
    pub status: CampaignStatus,
    pub target_views: Option<u64>,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(owner_id: Uuid, req: NewCampaign, unit_cost: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: req.title,
            billing_model: req.billing_model,
            max_budget: req.max_budget,
            daily_budget: req.daily_budget,
            consumed_total: Decimal::ZERO,
            consumed_today: Decimal::ZERO,
            last_reset_date: None,
            impressions: 0,
            unit_cost,
            status: CampaignStatus::Pending,
            target_views: req.target_views,
            date_start: req.date_start,
            date_end: req.date_end,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_total(&self) -> Decimal {
        self.max_budget - self.consumed_total
    }

    /// True when the stored daily counter belongs to an earlier day.
    pub fn daily_reset_due(&self, today: NaiveDate) -> bool {
        self.last_reset_date != Some(today)
    }

    /// Today's spend with the lazy reset applied. Never writes.
    pub fn consumed_on(&self, today: NaiveDate) -> Decimal {
        if self.daily_reset_due(today) {
            Decimal::ZERO
        } else {
            self.consumed_today
        }
    }
}

/// Body of `POST /painel/publicidades`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub title: String,
    pub billing_model: BillingModel,
    pub max_budget: Decimal,
    #[serde(default)]
    pub daily_budget: Option<Decimal>,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    #[serde(default)]
    pub target_views: Option<u64>,
}

// ─── Ledger ────────────────────────────────────────────────────────────────

/// One accepted metering call. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricEvent {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub event_type: MetricEventType,
    pub cost: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl MetricEvent {
    pub fn new(
        campaign_id: Uuid,
        event_type: MetricEventType,
        cost: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            event_type,
            cost,
            recorded_at,
        }
    }
}
