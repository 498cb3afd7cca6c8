//! Budget ("plafond") metering engine for classified-ad campaigns.
//!
//! Tracks impression/click events against per-campaign spend ceilings,
//! prices them from a versioned cost table, and drives the campaign
//! lifecycle. Data stored in DashMap with one lock per campaign row
//! (development); swap to PostgreSQL `SELECT ... FOR UPDATE` for production.

pub mod budget;
pub mod cost_table;
pub mod lifecycle;
pub mod metering;
pub mod models;
pub mod report;
pub mod store;

pub use budget::{BudgetService, BudgetStatus, RenewalRequest};
pub use cost_table::{CostEntry, CostTable};
pub use lifecycle::CampaignLifecycle;
pub use metering::{ChargeOutcome, MeteringEngine};
pub use models::{Campaign, MetricEvent, NewCampaign};
pub use report::{LedgerReporter, MetricsPeriod, MetricsReport};
pub use store::{CampaignStore, CampaignTx};
