//! In-memory campaign store backed by DashMap.
//!
//! Each campaign row (budget state plus its ledger) sits behind its own
//! async mutex, the equivalent of a `SELECT ... FOR UPDATE` row lock.
//! Writers go through [`CampaignTx`], which stages changes on a copy and
//! publishes them only on [`CampaignTx::commit`].

use crate::models::{Campaign, MetricEvent};
use chrono::{DateTime, Utc};
use classifieds_core::{CampaignError, CampaignResult};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

struct CampaignRow {
    campaign: Campaign,
    ledger: Vec<MetricEvent>,
}

/// Map entry. `owner_id` never changes, so it is readable without the row lock.
struct RowHandle {
    owner_id: Uuid,
    row: Arc<Mutex<CampaignRow>>,
}

/// Thread-safe store for campaigns and their metric ledgers.
pub struct CampaignStore {
    rows: DashMap<Uuid, RowHandle>,
    lock_timeout: Duration,
}

impl CampaignStore {
    pub fn new(lock_timeout: Duration) -> Self {
        info!(
            lock_timeout_ms = lock_timeout.as_millis() as u64,
            "Campaign store initialized (in-memory, development mode)"
        );
        Self {
            rows: DashMap::new(),
            lock_timeout,
        }
    }

    /// Insert a campaign with an empty ledger, replacing any row with the same id.
    pub fn insert(&self, campaign: Campaign) {
        let id = campaign.id;
        let owner_id = campaign.owner_id;
        let row = CampaignRow {
            campaign,
            ledger: Vec::new(),
        };
        self.rows.insert(
            id,
            RowHandle {
                owner_id,
                row: Arc::new(Mutex::new(row)),
            },
        );
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.rows.iter().map(|r| *r.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    async fn lock(&self, id: Uuid) -> CampaignResult<OwnedMutexGuard<CampaignRow>> {
        // Clone the Arc so the shard guard is released before awaiting.
        let row = self
            .rows
            .get(&id)
            .map(|r| r.value().row.clone())
            .ok_or_else(|| CampaignError::campaign_not_found(id))?;

        match tokio::time::timeout(self.lock_timeout, row.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!(campaign_id = %id, "Timed out waiting for campaign row lock");
                metrics::counter!("store.lock_timeouts").increment(1);
                Err(CampaignError::Transient(format!(
                    "timed out waiting for campaign {id}"
                )))
            }
        }
    }

    /// Lock a campaign row for a read-check-write sequence.
    pub async fn begin(&self, id: Uuid) -> CampaignResult<CampaignTx> {
        let guard = self.lock(id).await?;
        let staged = guard.campaign.clone();
        Ok(CampaignTx {
            guard,
            staged,
            appended: Vec::new(),
        })
    }

    /// Committed snapshot of a campaign.
    pub async fn get(&self, id: Uuid) -> CampaignResult<Campaign> {
        Ok(self.lock(id).await?.campaign.clone())
    }

    /// Committed ledger of a campaign, oldest first.
    pub async fn events(&self, id: Uuid) -> CampaignResult<Vec<MetricEvent>> {
        Ok(self.lock(id).await?.ledger.clone())
    }

    /// Ledger rows recorded at or after `since`, oldest first.
    ///
    /// Rows are appended under the row lock with the commit clock, so the
    /// ledger is ordered by `recorded_at` and only the tail is copied.
    pub async fn events_since(
        &self,
        id: Uuid,
        since: DateTime<Utc>,
    ) -> CampaignResult<Vec<MetricEvent>> {
        let row = self.lock(id).await?;
        let start = row.ledger.partition_point(|e| e.recorded_at < since);
        Ok(row.ledger[start..].to_vec())
    }

    /// Campaigns of one owner, newest first. Only that owner's rows are locked.
    pub async fn list_by_owner(&self, owner_id: Uuid) -> CampaignResult<Vec<Campaign>> {
        let owned: Vec<Uuid> = self
            .rows
            .iter()
            .filter(|r| r.value().owner_id == owner_id)
            .map(|r| *r.key())
            .collect();

        let mut campaigns = Vec::with_capacity(owned.len());
        for id in owned {
            campaigns.push(self.get(id).await?);
        }
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }
}

/// An open write transaction on one campaign row.
///
/// The row lock is held for the lifetime of the value. Dropping it without
/// calling [`commit`](Self::commit) discards every staged change.
pub struct CampaignTx {
    guard: OwnedMutexGuard<CampaignRow>,
    staged: Campaign,
    appended: Vec<MetricEvent>,
}

impl CampaignTx {
    pub fn campaign(&self) -> &Campaign {
        &self.staged
    }

    pub fn campaign_mut(&mut self) -> &mut Campaign {
        &mut self.staged
    }

    pub fn append_event(&mut self, event: MetricEvent) {
        self.appended.push(event);
    }

    /// Publish the staged campaign and ledger rows together, then release the lock.
    pub fn commit(self) {
        let CampaignTx {
            mut guard,
            mut staged,
            appended,
        } = self;
        staged.updated_at = Utc::now();
        guard.campaign = staged;
        guard.ledger.extend(appended);
    }
}
