//! Versioned unit prices per billing model.
//!
//! Open rows (no `effective_end`) live in a map keyed by billing model, which
//! is the uniqueness constraint on `(model, open)`: a second open row for the
//! same model cannot be represented. Closed rows move to an append-only history.

use chrono::{NaiveDate, Utc};
use classifieds_core::config::BillingConfig;
use classifieds_core::{BillingModel, CampaignError, CampaignResult};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// One price version for a billing model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostEntry {
    pub id: Uuid,
    pub billing_model: BillingModel,
    /// Per click for CPC, per 1000 impressions for CPM.
    pub price: Decimal,
    pub effective_start: NaiveDate,
    pub effective_end: Option<NaiveDate>,
}

impl CostEntry {
    fn open(billing_model: BillingModel, price: Decimal, today: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            billing_model,
            price,
            effective_start: today,
            effective_end: None,
        }
    }
}

#[derive(Default)]
struct CostLedger {
    open: HashMap<BillingModel, CostEntry>,
    closed: Vec<CostEntry>,
}

/// Read-mostly cost table. Reads share the lock; price changes take it exclusively.
pub struct CostTable {
    ledger: RwLock<CostLedger>,
    default_cpc_price: Decimal,
    default_cpm_price: Decimal,
}

impl CostTable {
    /// Create an empty table. Call [`ensure_defaults`](Self::ensure_defaults)
    /// before pricing anything.
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            ledger: RwLock::new(CostLedger::default()),
            default_cpc_price: config.default_cpc_price,
            default_cpm_price: config.default_cpm_price,
        }
    }

    fn default_price(&self, model: BillingModel) -> Decimal {
        match model {
            BillingModel::Cpc => self.default_cpc_price,
            BillingModel::Cpm => self.default_cpm_price,
        }
    }

    /// The open entry for `model`, if any.
    pub fn open_entry(&self, model: BillingModel) -> Option<CostEntry> {
        self.ledger.read().open.get(&model).cloned()
    }

    /// Currently active unit price. A missing open row is a fatal misconfiguration.
    pub fn current_price(&self, model: BillingModel) -> CampaignResult<Decimal> {
        self.open_entry(model)
            .map(|e| e.price)
            .ok_or_else(|| {
                CampaignError::Configuration(format!("no open cost entry for billing model {model}"))
            })
    }

    /// Close the open row for `model` and open a new one at `price`, atomically.
    pub fn set_price(&self, model: BillingModel, price: Decimal) -> CampaignResult<CostEntry> {
        self.set_price_on(model, price, Utc::now().date_naive())
    }

    pub fn set_price_on(
        &self,
        model: BillingModel,
        price: Decimal,
        today: NaiveDate,
    ) -> CampaignResult<CostEntry> {
        if price <= Decimal::ZERO {
            return Err(CampaignError::Validation(
                "price must be greater than zero".to_string(),
            ));
        }

        let entry = CostEntry::open(model, price, today);
        let mut ledger = self.ledger.write();
        if let Some(mut previous) = ledger.open.insert(model, entry.clone()) {
            previous.effective_end = Some(today);
            info!(
                billing_model = %model,
                old_price = %previous.price,
                new_price = %price,
                "Cost table price changed"
            );
            ledger.closed.push(previous);
        } else {
            info!(billing_model = %model, price = %price, "Cost table price opened");
        }
        metrics::counter!("cost_table.price_changes", "model" => model.as_str()).increment(1);
        Ok(entry)
    }

    /// Seed an open row at the configured default for every model lacking one.
    /// Returns how many rows were inserted.
    pub fn ensure_defaults(&self) -> usize {
        let today = Utc::now().date_naive();

        // Fast path: nothing missing.
        {
            let ledger = self.ledger.read();
            if BillingModel::ALL.iter().all(|m| ledger.open.contains_key(m)) {
                return 0;
            }
        }

        let mut ledger = self.ledger.write();
        let mut inserted = 0;
        for model in BillingModel::ALL {
            if !ledger.open.contains_key(&model) {
                let price = self.default_price(model);
                ledger.open.insert(model, CostEntry::open(model, price, today));
                info!(billing_model = %model, price = %price, "Seeded default cost entry");
                inserted += 1;
            }
        }
        inserted
    }

    /// Full price history, grouped by model, oldest first.
    pub fn entries(&self) -> Vec<CostEntry> {
        let ledger = self.ledger.read();
        let mut entries: Vec<CostEntry> = ledger
            .closed
            .iter()
            .chain(ledger.open.values())
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.billing_model
                .as_str()
                .cmp(b.billing_model.as_str())
                .then(a.effective_start.cmp(&b.effective_start))
                .then(a.effective_end.is_none().cmp(&b.effective_end.is_none()))
        });
        entries
    }

    /// Drop the open row for `model` without replacing it. Used to simulate a
    /// half-applied price change.
    #[cfg(test)]
    pub(crate) fn remove_open(&self, model: BillingModel) {
        self.ledger.write().open.remove(&model);
    }
}
