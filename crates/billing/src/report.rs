//! Ledger aggregation for the campaign metrics panel.

use crate::models::MetricEvent;
use crate::store::CampaignStore;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use classifieds_core::{CampaignResult, MetricEventType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reporting window, today included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MetricsPeriod {
    #[default]
    Hoje,
    Semana,
    Mes,
}

impl MetricsPeriod {
    pub fn days(self) -> i64 {
        match self {
            Self::Hoje => 1,
            Self::Semana => 7,
            Self::Mes => 30,
        }
    }

    pub fn start(self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.days() - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsTotals {
    pub impressions: u64,
    pub clicks: u64,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub campaign_id: Uuid,
    pub period: MetricsPeriod,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DailyMetrics>,
    pub totals: MetricsTotals,
}

/// Group ledger rows in `[from, to]` by calendar day (UTC).
pub fn aggregate(events: &[MetricEvent], from: NaiveDate, to: NaiveDate) -> Vec<DailyMetrics> {
    let mut by_day: BTreeMap<NaiveDate, DailyMetrics> = BTreeMap::new();
    for event in events {
        let date = event.recorded_at.date_naive();
        if date < from || date > to {
            continue;
        }
        let day = by_day.entry(date).or_insert_with(|| DailyMetrics {
            date,
            impressions: 0,
            clicks: 0,
            cost: Decimal::ZERO,
        });
        match event.event_type {
            MetricEventType::Impression => day.impressions += 1,
            MetricEventType::Click => day.clicks += 1,
        }
        day.cost += event.cost;
    }
    by_day.into_values().collect()
}

pub struct LedgerReporter {
    store: Arc<CampaignStore>,
}

impl LedgerReporter {
    pub fn new(store: Arc<CampaignStore>) -> Self {
        Self { store }
    }

    pub async fn metrics(
        &self,
        campaign_id: Uuid,
        period: MetricsPeriod,
    ) -> CampaignResult<MetricsReport> {
        self.metrics_on(campaign_id, period, Utc::now().date_naive())
            .await
    }

    pub async fn metrics_on(
        &self,
        campaign_id: Uuid,
        period: MetricsPeriod,
        today: NaiveDate,
    ) -> CampaignResult<MetricsReport> {
        let from = period.start(today);
        let since = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
        let events = self.store.events_since(campaign_id, since).await?;
        let days = aggregate(&events, from, today);
        let totals = days.iter().fold(MetricsTotals::default(), |mut acc, d| {
            acc.impressions += d.impressions;
            acc.clicks += d.clicks;
            acc.cost += d.cost;
            acc
        });
        Ok(MetricsReport {
            campaign_id,
            period,
            from,
            to: today,
            days,
            totals,
        })
    }
}
