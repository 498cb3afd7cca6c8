//! Metering engine: the only path by which impression/click events become
//! billed ledger rows and budget mutations.

use crate::cost_table::CostTable;
use crate::models::MetricEvent;
use crate::store::CampaignStore;
use chrono::{DateTime, Utc};
use classifieds_core::{BillingModel, CampaignError, CampaignResult, MetricEventType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Result of an accepted metering call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChargeOutcome {
    pub cost_charged: Decimal,
    pub remaining_total: Decimal,
}

/// Price of one event under `model`. Events the model does not bill for cost nothing.
pub fn unit_cost(model: BillingModel, event: MetricEventType, price: Decimal) -> Decimal {
    if model.billable_event() != event {
        return Decimal::ZERO;
    }
    match model {
        BillingModel::Cpm => price / Decimal::ONE_THOUSAND,
        BillingModel::Cpc => price,
    }
}

pub struct MeteringEngine {
    store: Arc<CampaignStore>,
    costs: Arc<CostTable>,
}

impl MeteringEngine {
    pub fn new(store: Arc<CampaignStore>, costs: Arc<CostTable>) -> Self {
        Self { store, costs }
    }

    /// Record one event against a campaign's plafond.
    pub async fn record(
        &self,
        campaign_id: Uuid,
        event: MetricEventType,
    ) -> CampaignResult<ChargeOutcome> {
        self.record_at(campaign_id, event, Utc::now()).await
    }

    /// [`record`](Self::record) with an explicit clock.
    pub async fn record_at(
        &self,
        campaign_id: Uuid,
        event: MetricEventType,
        now: DateTime<Utc>,
    ) -> CampaignResult<ChargeOutcome> {
        let result = self.charge(campaign_id, event, now).await;
        let outcome = match &result {
            Ok(o) if o.cost_charged.is_zero() => "tracked",
            Ok(_) => "charged",
            Err(e) => e.code(),
        };
        metrics::counter!(
            "metering.events",
            "event" => event.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        result
    }

    async fn charge(
        &self,
        campaign_id: Uuid,
        event: MetricEventType,
        now: DateTime<Utc>,
    ) -> CampaignResult<ChargeOutcome> {
        let today = now.date_naive();

        // Row lock held from here until commit or drop.
        let mut tx = self.store.begin(campaign_id).await?;
        let model = tx.campaign().billing_model;
        let price = self
            .costs
            .open_entry(model)
            .map(|e| e.price)
            .ok_or_else(|| {
                CampaignError::NotFound(format!(
                    "no open cost entry for billing model {model} (campaign {campaign_id})"
                ))
            })?;
        let cost = unit_cost(model, event, price);

        let campaign = tx.campaign();
        let remaining_total = campaign.remaining_total();
        let reset_due = campaign.daily_reset_due(today);

        // Zero-cost events cannot move either ceiling.
        if !cost.is_zero() {
            if remaining_total < cost {
                warn!(
                    campaign_id = %campaign_id,
                    remaining = %remaining_total,
                    required = %cost,
                    "Plafond exhausted"
                );
                return Err(CampaignError::BudgetExceeded {
                    remaining: remaining_total,
                    required: cost,
                });
            }

            if let Some(daily) = campaign.daily_budget {
                let remaining_daily = daily - campaign.consumed_on(today);
                if remaining_daily < cost {
                    warn!(
                        campaign_id = %campaign_id,
                        remaining = %remaining_daily,
                        required = %cost,
                        "Daily limit reached"
                    );
                    return Err(CampaignError::DailyBudgetExceeded {
                        remaining: remaining_daily,
                        required: cost,
                    });
                }
            }
        }

        let campaign = tx.campaign_mut();
        if reset_due {
            debug!(campaign_id = %campaign_id, last_reset = ?campaign.last_reset_date, "Daily counter reset");
            campaign.consumed_today = Decimal::ZERO;
            campaign.last_reset_date = Some(today);
        }
        campaign.consumed_total += cost;
        campaign.consumed_today += cost;
        if event == MetricEventType::Impression {
            campaign.impressions += 1;
        }
        tx.append_event(MetricEvent::new(campaign_id, event, cost, now));
        tx.commit();

        info!(
            campaign_id = %campaign_id,
            event_type = %event,
            cost = %cost,
            "Metric event recorded"
        );

        Ok(ChargeOutcome {
            cost_charged: cost,
            remaining_total: remaining_total - cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Campaign, NewCampaign};
    use chrono::Duration;
    use classifieds_core::config::BillingConfig;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<CampaignStore>,
        costs: Arc<CostTable>,
        engine: MeteringEngine,
    }

    fn fixture(cpc: Decimal, cpm: Decimal) -> Fixture {
        let store = Arc::new(CampaignStore::new(std::time::Duration::from_millis(50)));
        let costs = Arc::new(CostTable::new(&BillingConfig::default()));
        costs.set_price(BillingModel::Cpc, cpc).unwrap();
        costs.set_price(BillingModel::Cpm, cpm).unwrap();
        let engine = MeteringEngine::new(store.clone(), costs.clone());
        Fixture {
            store,
            costs,
            engine,
        }
    }

    fn campaign(model: BillingModel, max: Decimal, daily: Option<Decimal>) -> Campaign {
        let today = Utc::now().date_naive();
        Campaign::new(
            Uuid::new_v4(),
            NewCampaign {
                title: "Moradia T3".to_string(),
                billing_model: model,
                max_budget: max,
                daily_budget: daily,
                date_start: today,
                date_end: today + Duration::days(30),
                target_views: None,
            },
            Decimal::ZERO,
        )
    }

    #[test]
    fn test_unit_cost_table() {
        assert_eq!(
            unit_cost(BillingModel::Cpm, MetricEventType::Impression, dec!(1000)),
            dec!(1)
        );
        assert_eq!(
            unit_cost(BillingModel::Cpc, MetricEventType::Click, dec!(10)),
            dec!(10)
        );
        assert!(unit_cost(BillingModel::Cpm, MetricEventType::Click, dec!(1000)).is_zero());
        assert!(unit_cost(BillingModel::Cpc, MetricEventType::Impression, dec!(10)).is_zero());
    }

    #[tokio::test]
    async fn test_cpc_clicks_until_plafond() {
        let f = fixture(dec!(10), dec!(1000));
        let c = campaign(BillingModel::Cpc, dec!(25), None);
        let id = c.id;
        f.store.insert(c);

        let first = f.engine.record(id, MetricEventType::Click).await.unwrap();
        assert_eq!(first.cost_charged, dec!(10));
        assert_eq!(first.remaining_total, dec!(15));

        let second = f.engine.record(id, MetricEventType::Click).await.unwrap();
        assert_eq!(second.cost_charged, dec!(10));
        assert_eq!(second.remaining_total, dec!(5));

        let third = f.engine.record(id, MetricEventType::Click).await.unwrap_err();
        assert!(matches!(third, CampaignError::BudgetExceeded { .. }));

        let after = f.store.get(id).await.unwrap();
        assert_eq!(after.consumed_total, dec!(20));
        assert_eq!(f.store.events(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cpm_impression_divides_by_thousand() {
        let f = fixture(dec!(10), dec!(1000));
        let c = campaign(BillingModel::Cpm, dec!(10), None);
        let id = c.id;
        f.store.insert(c);

        let outcome = f.engine.record(id, MetricEventType::Impression).await.unwrap();
        assert_eq!(outcome.cost_charged, dec!(1.0));
        assert_eq!(outcome.remaining_total, dec!(9.0));
        assert_eq!(f.store.get(id).await.unwrap().impressions, 1);
    }

    #[tokio::test]
    async fn test_exact_remaining_spend_is_allowed() {
        let f = fixture(dec!(10), dec!(1000));
        let c = campaign(BillingModel::Cpc, dec!(20), Some(dec!(10)));
        let id = c.id;
        f.store.insert(c);

        let outcome = f.engine.record(id, MetricEventType::Click).await.unwrap();
        assert_eq!(outcome.remaining_total, dec!(10));
        let after = f.store.get(id).await.unwrap();
        assert_eq!(after.consumed_today, dec!(10));

        // daily remaining is now 0 < 10
        let err = f.engine.record(id, MetricEventType::Click).await.unwrap_err();
        assert!(matches!(err, CampaignError::DailyBudgetExceeded { .. }));
    }

    #[tokio::test]
    async fn test_mismatched_events_record_at_zero_cost_even_when_exhausted() {
        let f = fixture(dec!(10), dec!(1000));
        let mut c = campaign(BillingModel::Cpm, dec!(10), Some(dec!(1)));
        c.consumed_total = dec!(10);
        c.consumed_today = dec!(1);
        c.last_reset_date = Some(Utc::now().date_naive());
        let id = c.id;
        f.store.insert(c);

        let outcome = f.engine.record(id, MetricEventType::Click).await.unwrap();
        assert!(outcome.cost_charged.is_zero());
        assert!(outcome.remaining_total.is_zero());

        let err = f.engine.record(id, MetricEventType::Impression).await.unwrap_err();
        assert!(matches!(err, CampaignError::BudgetExceeded { .. }));

        let events = f.store.events(id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, MetricEventType::Click);
        assert!(events[0].cost.is_zero());
        // Refused impressions are not counted towards the view target.
        assert_eq!(f.store.get(id).await.unwrap().impressions, 0);
    }

    #[tokio::test]
    async fn test_stale_daily_counter_is_reset_before_check() {
        let f = fixture(dec!(10), dec!(1000));
        let today = Utc::now().date_naive();
        let mut c = campaign(BillingModel::Cpc, dec!(100), Some(dec!(15)));
        c.consumed_total = dec!(10);
        c.consumed_today = dec!(10);
        c.last_reset_date = Some(today - Duration::days(1));
        let id = c.id;
        f.store.insert(c);

        f.engine.record(id, MetricEventType::Click).await.unwrap();
        let after = f.store.get(id).await.unwrap();
        assert_eq!(after.consumed_today, dec!(10));
        assert_eq!(after.consumed_total, dec!(20));
        assert_eq!(after.last_reset_date, Some(today));
    }

    #[tokio::test]
    async fn test_reset_happens_once_per_day() {
        let f = fixture(dec!(1), dec!(1000));
        let c = campaign(BillingModel::Cpc, dec!(100), Some(dec!(50)));
        let id = c.id;
        f.store.insert(c);

        let day_one = Utc::now();
        for _ in 0..3 {
            f.engine
                .record_at(id, MetricEventType::Click, day_one)
                .await
                .unwrap();
        }
        let after = f.store.get(id).await.unwrap();
        assert_eq!(after.consumed_today, dec!(3));
        assert_eq!(after.last_reset_date, Some(day_one.date_naive()));

        let day_two = day_one + Duration::days(1);
        f.engine
            .record_at(id, MetricEventType::Click, day_two)
            .await
            .unwrap();
        let after = f.store.get(id).await.unwrap();
        assert_eq!(after.consumed_today, dec!(1));
        assert_eq!(after.consumed_total, dec!(4));
        assert_eq!(after.last_reset_date, Some(day_two.date_naive()));
    }

    #[tokio::test]
    async fn test_unknown_campaign_is_not_found() {
        let f = fixture(dec!(10), dec!(1000));
        let err = f
            .engine
            .record(Uuid::new_v4(), MetricEventType::Click)
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_cost_entry_is_not_found_and_writes_nothing() {
        let f = fixture(dec!(10), dec!(1000));
        let c = campaign(BillingModel::Cpc, dec!(100), None);
        let id = c.id;
        f.store.insert(c);
        f.costs.remove_open(BillingModel::Cpc);

        let err = f.engine.record(id, MetricEventType::Click).await.unwrap_err();
        assert!(matches!(err, CampaignError::NotFound(_)));
        assert!(f.store.events(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lock_timeout_is_transient_without_mutation() {
        let f = fixture(dec!(10), dec!(1000));
        let c = campaign(BillingModel::Cpc, dec!(100), None);
        let id = c.id;
        f.store.insert(c);

        let held = f.store.begin(id).await.unwrap();
        let err = f.engine.record(id, MetricEventType::Click).await.unwrap_err();
        assert!(matches!(err, CampaignError::Transient(_)));
        drop(held);

        let after = f.store.get(id).await.unwrap();
        assert!(after.consumed_total.is_zero());
        assert!(f.store.events(id).await.unwrap().is_empty());
    }
}
