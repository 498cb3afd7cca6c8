//! Budget status projection and campaign renewal.

use crate::models::Campaign;
use crate::store::CampaignStore;
use chrono::{NaiveDate, Utc};
use classifieds_core::{CampaignError, CampaignResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// Read-only view of a campaign's spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub max_budget: Decimal,
    pub consumed_total: Decimal,
    pub remaining_total: Decimal,
    pub daily_budget: Option<Decimal>,
    pub consumed_today: Decimal,
    pub remaining_daily: Option<Decimal>,
}

impl BudgetStatus {
    /// Project `campaign` as seen on `today`, applying the lazy daily reset.
    pub fn project(campaign: &Campaign, today: NaiveDate) -> Self {
        let consumed_today = campaign.consumed_on(today);
        Self {
            max_budget: campaign.max_budget,
            consumed_total: campaign.consumed_total,
            remaining_total: campaign.remaining_total(),
            daily_budget: campaign.daily_budget,
            consumed_today,
            remaining_daily: campaign
                .daily_budget
                .map(|daily| (daily - consumed_today).max(Decimal::ZERO)),
        }
    }
}

/// Body of `POST /painel/publicidades/:id/renovar`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenewalRequest {
    #[serde(default)]
    pub additional_budget: Option<Decimal>,
    #[serde(default)]
    pub new_end_date: Option<NaiveDate>,
    /// Absent leaves the cap alone; `null` or `0` removes it.
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<f64>)]
    pub new_daily_budget: Option<Option<Decimal>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Decimal>::deserialize(deserializer).map(Some)
}

impl RenewalRequest {
    fn is_empty(&self) -> bool {
        self.additional_budget.is_none()
            && self.new_end_date.is_none()
            && self.new_daily_budget.is_none()
    }

    fn validate(&self, today: NaiveDate) -> CampaignResult<()> {
        if self.is_empty() {
            return Err(CampaignError::Validation(
                "renewal needs additionalBudget, newEndDate or newDailyBudget".to_string(),
            ));
        }
        if let Some(extra) = self.additional_budget {
            if extra <= Decimal::ZERO {
                return Err(CampaignError::Validation(
                    "additionalBudget must be greater than zero".to_string(),
                ));
            }
        }
        if let Some(end) = self.new_end_date {
            if end <= today {
                return Err(CampaignError::Validation(
                    "newEndDate must be in the future".to_string(),
                ));
            }
        }
        if let Some(Some(daily)) = self.new_daily_budget {
            if daily < Decimal::ZERO {
                return Err(CampaignError::Validation(
                    "newDailyBudget must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub struct BudgetService {
    store: Arc<CampaignStore>,
}

impl BudgetService {
    pub fn new(store: Arc<CampaignStore>) -> Self {
        Self { store }
    }

    pub async fn status(&self, campaign_id: Uuid) -> CampaignResult<BudgetStatus> {
        self.status_on(campaign_id, Utc::now().date_naive()).await
    }

    pub async fn status_on(
        &self,
        campaign_id: Uuid,
        today: NaiveDate,
    ) -> CampaignResult<BudgetStatus> {
        let campaign = self.store.get(campaign_id).await?;
        Ok(BudgetStatus::project(&campaign, today))
    }

    /// Extend ceilings and dates of an approved campaign. Consumed counters are untouched.
    pub async fn renew(
        &self,
        campaign_id: Uuid,
        owner_id: Uuid,
        req: RenewalRequest,
    ) -> CampaignResult<Campaign> {
        req.validate(Utc::now().date_naive())?;

        let mut tx = self.store.begin(campaign_id).await?;
        let campaign = tx.campaign();
        if campaign.owner_id != owner_id || !campaign.status.is_renewable() {
            return Err(CampaignError::campaign_not_found(campaign_id));
        }

        let campaign = tx.campaign_mut();
        if let Some(extra) = req.additional_budget {
            campaign.max_budget = campaign.max_budget.checked_add(extra).ok_or_else(|| {
                CampaignError::Validation("additionalBudget is too large".to_string())
            })?;
        }
        if let Some(end) = req.new_end_date {
            campaign.date_end = end;
        }
        if let Some(daily) = req.new_daily_budget {
            campaign.daily_budget = daily.filter(|d| !d.is_zero());
        }
        let renewed = campaign.clone();
        tx.commit();

        info!(
            campaign_id = %campaign_id,
            max_budget = %renewed.max_budget,
            date_end = %renewed.date_end,
            "Campaign renewed"
        );
        metrics::counter!("budget.renewals").increment(1);
        Ok(renewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCampaign;
    use chrono::Duration;
    use classifieds_core::{BillingModel, CampaignStatus};
    use rust_decimal_macros::dec;

    fn setup(status: CampaignStatus) -> (BudgetService, Arc<CampaignStore>, Campaign) {
        let today = Utc::now().date_naive();
        let store = Arc::new(CampaignStore::new(std::time::Duration::from_millis(50)));
        let mut c = Campaign::new(
            Uuid::new_v4(),
            NewCampaign {
                title: "Loja de bairro".to_string(),
                billing_model: BillingModel::Cpc,
                max_budget: dec!(50),
                daily_budget: Some(dec!(20)),
                date_start: today,
                date_end: today + Duration::days(5),
                target_views: None,
            },
            dec!(1),
        );
        c.status = status;
        c.consumed_total = dec!(30);
        c.consumed_today = dec!(12);
        c.last_reset_date = Some(today);
        store.insert(c.clone());
        (BudgetService::new(store.clone()), store, c)
    }

    #[tokio::test]
    async fn test_status_today() {
        let (svc, _, c) = setup(CampaignStatus::Active);
        let status = svc.status(c.id).await.unwrap();
        assert_eq!(status.max_budget, dec!(50));
        assert_eq!(status.remaining_total, dec!(20));
        assert_eq!(status.consumed_today, dec!(12));
        assert_eq!(status.remaining_daily, Some(dec!(8)));
    }

    #[tokio::test]
    async fn test_status_applies_stale_reset_without_writing() {
        let (svc, store, c) = setup(CampaignStatus::Active);
        let tomorrow = Utc::now().date_naive() + Duration::days(1);

        let status = svc.status_on(c.id, tomorrow).await.unwrap();
        assert!(status.consumed_today.is_zero());
        assert_eq!(status.remaining_daily, Some(dec!(20)));

        let stored = store.get(c.id).await.unwrap();
        assert_eq!(stored.consumed_today, dec!(12));
        assert_eq!(stored.last_reset_date, c.last_reset_date);
    }

    #[tokio::test]
    async fn test_renew_adds_budget_and_keeps_counters() {
        let (svc, _, c) = setup(CampaignStatus::Active);
        let new_end = Utc::now().date_naive() + Duration::days(60);
        let renewed = svc
            .renew(
                c.id,
                c.owner_id,
                RenewalRequest {
                    additional_budget: Some(dec!(25)),
                    new_end_date: Some(new_end),
                    new_daily_budget: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renewed.max_budget, dec!(75));
        assert_eq!(renewed.consumed_total, dec!(30));
        assert_eq!(renewed.remaining_total(), dec!(45));
        assert_eq!(renewed.date_end, new_end);
        assert_eq!(renewed.daily_budget, Some(dec!(20)));
    }

    #[tokio::test]
    async fn test_renew_with_no_fields_is_validation_error_and_writes_nothing() {
        let (svc, store, c) = setup(CampaignStatus::Active);
        let err = svc
            .renew(c.id, c.owner_id, RenewalRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));
        assert_eq!(store.get(c.id).await.unwrap().updated_at, c.updated_at);
    }

    #[tokio::test]
    async fn test_renew_rejects_bad_values() {
        let (svc, _, c) = setup(CampaignStatus::Active);
        let today = Utc::now().date_naive();
        for req in [
            RenewalRequest {
                additional_budget: Some(Decimal::ZERO),
                ..Default::default()
            },
            RenewalRequest {
                new_end_date: Some(today),
                ..Default::default()
            },
            RenewalRequest {
                new_daily_budget: Some(Some(dec!(-1))),
                ..Default::default()
            },
        ] {
            let err = svc.renew(c.id, c.owner_id, req).await.unwrap_err();
            assert!(matches!(err, CampaignError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_renew_overflowing_budget_is_rejected_and_writes_nothing() {
        let (svc, store, mut c) = setup(CampaignStatus::Active);
        c.max_budget = Decimal::MAX;
        store.insert(c.clone());

        let req = RenewalRequest {
            additional_budget: Some(Decimal::MAX),
            new_end_date: Some(c.date_end + Duration::days(10)),
            ..Default::default()
        };
        let err = svc.renew(c.id, c.owner_id, req).await.unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        let after = store.get(c.id).await.unwrap();
        assert_eq!(after.max_budget, Decimal::MAX);
        assert_eq!(after.date_end, c.date_end);
    }

    #[tokio::test]
    async fn test_renew_requires_owner_and_approved_status() {
        let (svc, _, c) = setup(CampaignStatus::Active);
        let req = RenewalRequest {
            additional_budget: Some(dec!(5)),
            ..Default::default()
        };
        let err = svc.renew(c.id, Uuid::new_v4(), req.clone()).await.unwrap_err();
        assert!(matches!(err, CampaignError::NotFound(_)));

        let (svc, _, pending) = setup(CampaignStatus::Pending);
        let err = svc.renew(pending.id, pending.owner_id, req).await.unwrap_err();
        assert!(matches!(err, CampaignError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_renew_daily_budget_null_or_zero_removes_cap() {
        let (svc, _, c) = setup(CampaignStatus::Concluded);
        let renewed = svc
            .renew(
                c.id,
                c.owner_id,
                RenewalRequest {
                    new_daily_budget: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(renewed.daily_budget.is_none());

        let renewed = svc
            .renew(
                c.id,
                c.owner_id,
                RenewalRequest {
                    new_daily_budget: Some(Some(Decimal::ZERO)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(renewed.daily_budget.is_none());
    }

    #[test]
    fn test_renewal_request_distinguishes_absent_from_null() {
        let absent: RenewalRequest = serde_json::from_str(r#"{"additionalBudget": 5}"#).unwrap();
        assert!(absent.new_daily_budget.is_none());

        let null: RenewalRequest = serde_json::from_str(r#"{"newDailyBudget": null}"#).unwrap();
        assert_eq!(null.new_daily_budget, Some(None));

        let set: RenewalRequest = serde_json::from_str(r#"{"newDailyBudget": 12.5}"#).unwrap();
        assert_eq!(set.new_daily_budget, Some(Some(dec!(12.5))));
    }

    #[test]
    fn test_remaining_daily_is_clamped() {
        let today = Utc::now().date_naive();
        let (_, _, mut c) = setup(CampaignStatus::Active);
        c.daily_budget = Some(dec!(5));
        let status = BudgetStatus::project(&c, today);
        assert_eq!(status.remaining_daily, Some(Decimal::ZERO));
    }
}
