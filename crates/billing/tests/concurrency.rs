//! Concurrent metering against a shared plafond.

use chrono::{Duration, Utc};
use classifieds_billing::{
    BudgetService, Campaign, CampaignStore, CostTable, MeteringEngine, NewCampaign,
};
use classifieds_core::config::BillingConfig;
use classifieds_core::{BillingModel, CampaignError, MetricEventType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

fn cpc_campaign(max_budget: Decimal, daily_budget: Option<Decimal>) -> Campaign {
    let today = Utc::now().date_naive();
    Campaign::new(
        Uuid::new_v4(),
        NewCampaign {
            title: "Promoção de verão".to_string(),
            billing_model: BillingModel::Cpc,
            max_budget,
            daily_budget,
            date_start: today,
            date_end: today + Duration::days(30),
            target_views: None,
        },
        dec!(10),
    )
}

fn engine(store: Arc<CampaignStore>) -> Arc<MeteringEngine> {
    let costs = Arc::new(CostTable::new(&BillingConfig::default()));
    costs.set_price(BillingModel::Cpc, dec!(10)).unwrap();
    Arc::new(MeteringEngine::new(store, costs))
}

async fn fire(engine: &Arc<MeteringEngine>, id: Uuid, n: usize) -> (usize, usize, usize) {
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.record(id, MetricEventType::Click).await })
        })
        .collect();

    let (mut ok, mut total, mut daily) = (0, 0, 0);
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(CampaignError::BudgetExceeded { .. }) => total += 1,
            Err(CampaignError::DailyBudgetExceeded { .. }) => daily += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    (ok, total, daily)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_clicks_never_overspend_total_plafond() {
    let store = Arc::new(CampaignStore::new(std::time::Duration::from_secs(5)));
    let campaign = cpc_campaign(dec!(50), None);
    let id = campaign.id;
    store.insert(campaign);
    let engine = engine(store.clone());

    let (ok, exceeded, _) = fire(&engine, id, 40).await;
    assert_eq!(ok, 5);
    assert_eq!(exceeded, 35);

    let after = store.get(id).await.unwrap();
    assert_eq!(after.consumed_total, dec!(50));
    assert_eq!(store.events(id).await.unwrap().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_clicks_never_overspend_daily_limit() {
    let store = Arc::new(CampaignStore::new(std::time::Duration::from_secs(5)));
    let campaign = cpc_campaign(dec!(1000), Some(dec!(30)));
    let id = campaign.id;
    store.insert(campaign);
    let engine = engine(store.clone());

    let (ok, _, daily) = fire(&engine, id, 25).await;
    assert_eq!(ok, 3);
    assert_eq!(daily, 22);

    let status = BudgetService::new(store.clone()).status(id).await.unwrap();
    assert_eq!(status.consumed_today, dec!(30));
    assert_eq!(status.remaining_daily, Some(Decimal::ZERO));
    assert_eq!(status.remaining_total, dec!(970));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn campaigns_are_metered_independently() {
    let store = Arc::new(CampaignStore::new(std::time::Duration::from_secs(5)));
    let a = cpc_campaign(dec!(20), None);
    let b = cpc_campaign(dec!(30), None);
    let (a_id, b_id) = (a.id, b.id);
    store.insert(a);
    store.insert(b);
    let engine = engine(store.clone());

    let (a_res, b_res) = tokio::join!(fire(&engine, a_id, 10), fire(&engine, b_id, 10));
    assert_eq!(a_res.0, 2);
    assert_eq!(b_res.0, 3);
    assert_eq!(store.get(a_id).await.unwrap().consumed_total, dec!(20));
    assert_eq!(store.get(b_id).await.unwrap().consumed_total, dec!(30));
}
