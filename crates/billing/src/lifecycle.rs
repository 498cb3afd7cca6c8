//! Campaign creation, approval, and the periodic conclusion sweep.

use crate::cost_table::CostTable;
use crate::models::{Campaign, NewCampaign};
use crate::store::CampaignStore;
use chrono::{NaiveDate, Utc};
use classifieds_core::{CampaignError, CampaignResult, CampaignStatus};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

pub struct CampaignLifecycle {
    store: Arc<CampaignStore>,
    costs: Arc<CostTable>,
}

impl CampaignLifecycle {
    pub fn new(store: Arc<CampaignStore>, costs: Arc<CostTable>) -> Self {
        Self { store, costs }
    }

    /// Create a pending campaign priced at the current cost-table rate.
    pub fn create(&self, owner_id: Uuid, req: NewCampaign) -> CampaignResult<Campaign> {
        validate_new(&req)?;

        self.costs.ensure_defaults();
        let unit_cost = self.costs.current_price(req.billing_model)?;
        let campaign = Campaign::new(owner_id, req, unit_cost);

        info!(
            campaign_id = %campaign.id,
            owner_id = %owner_id,
            billing_model = %campaign.billing_model,
            max_budget = %campaign.max_budget,
            "Campaign created"
        );
        metrics::counter!("campaigns.created").increment(1);
        self.store.insert(campaign.clone());
        Ok(campaign)
    }

    pub async fn approve(&self, campaign_id: Uuid) -> CampaignResult<Campaign> {
        self.transition(campaign_id, CampaignStatus::Active).await
    }

    pub async fn reject(&self, campaign_id: Uuid) -> CampaignResult<Campaign> {
        self.transition(campaign_id, CampaignStatus::Rejected).await
    }

    async fn transition(&self, campaign_id: Uuid, to: CampaignStatus) -> CampaignResult<Campaign> {
        let mut tx = self.store.begin(campaign_id).await?;
        let from = tx.campaign().status;
        if from != CampaignStatus::Pending {
            return Err(CampaignError::Validation(format!(
                "campaign is {from:?}, only pending campaigns can be reviewed"
            )));
        }
        tx.campaign_mut().status = to;
        let updated = tx.campaign().clone();
        tx.commit();
        info!(campaign_id = %campaign_id, from = ?from, to = ?to, "Campaign reviewed");
        Ok(updated)
    }

    /// Conclude open campaigns that reached their view target, and active
    /// campaigns past their end date. Touches only `status`.
    pub async fn sweep(&self, today: NaiveDate) -> usize {
        let mut concluded = 0;
        for id in self.store.ids() {
            let mut tx = match self.store.begin(id).await {
                Ok(tx) => tx,
                Err(e) => {
                    // Retried on the next tick.
                    warn!(campaign_id = %id, error = %e, "Sweep skipped campaign");
                    continue;
                }
            };

            let campaign = tx.campaign();
            if !campaign.status.is_open() {
                continue;
            }
            let views = campaign.impressions;
            let target_reached = campaign.target_views.is_some_and(|t| views >= t);
            let expired =
                campaign.status == CampaignStatus::Active && campaign.date_end < today;

            if target_reached || expired {
                let from = campaign.status;
                tx.campaign_mut().status = CampaignStatus::Concluded;
                tx.commit();
                info!(
                    campaign_id = %id,
                    from = ?from,
                    views,
                    target_reached,
                    expired,
                    "Campaign concluded"
                );
                concluded += 1;
            }
        }
        if concluded > 0 {
            metrics::counter!("campaigns.concluded").increment(concluded as u64);
        }
        concluded
    }

    /// Run [`sweep`](Self::sweep) on a fixed interval.
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = every.as_secs(), "Campaign lifecycle sweep started");
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let concluded = self.sweep(Utc::now().date_naive()).await;
                if concluded > 0 {
                    info!(concluded, "Lifecycle sweep finished");
                }
            }
        })
    }
}

fn validate_new(req: &NewCampaign) -> CampaignResult<()> {
    if req.title.trim().is_empty() {
        return Err(CampaignError::Validation("title must not be empty".to_string()));
    }
    if req.max_budget <= Decimal::ZERO {
        return Err(CampaignError::Validation(
            "maxBudget must be greater than zero".to_string(),
        ));
    }
    if matches!(req.daily_budget, Some(d) if d <= Decimal::ZERO) {
        return Err(CampaignError::Validation(
            "dailyBudget must be greater than zero when set".to_string(),
        ));
    }
    if req.date_end < req.date_start {
        return Err(CampaignError::Validation(
            "dateEnd must not be before dateStart".to_string(),
        ));
    }
    Ok(())
}
