//! Storage layer for tabs, bills and the order ledger
//!
//! Every `TabStore` method is one atomic unit: either all of its writes
//! become visible or none do. Operations that depend on the tab's current
//! state (status, latest bill, stored quantities) serialize per tab.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{Tab, TabOverview, TabSettings, TabSummary, TabUpdate};
use uuid::Uuid;

use crate::billing::BillingError;
use crate::reconcile::{OrderDeltas, OrderDirection, RemovalPolicy};

pub use memory::MemoryTabStore;
pub use pg::PgTabStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tab {tab_id} not found in shop {shop_id}")]
    TabNotFound { shop_id: i64, tab_id: i64 },

    #[error("bill {bill_id} not found on tab {tab_id} in shop {shop_id}")]
    BillNotFound {
        shop_id: i64,
        tab_id: i64,
        bill_id: i64,
    },

    #[error("tab {tab_id} in shop {shop_id} is closed")]
    TabClosed { shop_id: i64, tab_id: i64 },

    #[error("removal exceeds stored quantity of item {item_id}")]
    InsufficientQuantity {
        item_id: i64,
        variant_id: Option<i64>,
    },

    #[error("no billing window remains before {tab_end}")]
    BillingHorizonExhausted { tab_end: NaiveDate },

    #[error("tab accepts orders from {start_date} to {end_date}")]
    TabNotActive {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },

    #[error("merged quantity out of range")]
    QuantityOverflow {
        item_id: Option<i64>,
        variant_id: Option<i64>,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<BillingError> for StoreError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::NotActive {
                start_date,
                end_date,
            } => StoreError::TabNotActive {
                start_date,
                end_date,
            },
            BillingError::HorizonExhausted { tab_end } => {
                StoreError::BillingHorizonExhausted { tab_end }
            }
        }
    }
}

/// Everything persisted by tab creation
#[derive(Debug, Clone)]
pub struct NewTab {
    pub shop_id: i64,
    pub owner_id: Uuid,
    pub settings: TabSettings,
    pub verification_list: Vec<String>,
    pub location_ids: Vec<i64>,
}

/// One order submission against a tab's current bill
#[derive(Debug, Clone, Copy)]
pub struct OrderApplication<'a> {
    pub deltas: &'a OrderDeltas,
    pub direction: OrderDirection,
    pub policy: RemovalPolicy,
    pub today: NaiveDate,
}

#[async_trait]
pub trait TabStore: Send + Sync + 'static {
    /// Insert a tab (AwaitingApproval) with its membership sets; returns its id
    async fn create_tab(&self, new: &NewTab) -> StoreResult<i64>;

    /// Upsert the staged update and sync any membership lists onto the live tab
    async fn stage_update(&self, shop_id: i64, tab_id: i64, update: &TabUpdate)
    -> StoreResult<()>;

    /// Copy the staged update (if any) onto the tab, confirm it, drop the staged row
    async fn approve_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<()>;

    /// Close the tab and discard any staged update
    async fn close_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<()>;

    /// Mark a bill paid; an early payment ends its window on `today`
    async fn mark_bill_paid(
        &self,
        shop_id: i64,
        tab_id: i64,
        bill_id: i64,
        today: NaiveDate,
    ) -> StoreResult<()>;

    /// Select or create the current bill and merge the order into it; returns the bill id
    async fn apply_order(
        &self,
        shop_id: i64,
        tab_id: i64,
        order: OrderApplication<'_>,
    ) -> StoreResult<i64>;

    /// Make the live tab's verification list equal to `emails`
    async fn set_verification_list(
        &self,
        shop_id: i64,
        tab_id: i64,
        emails: &[String],
    ) -> StoreResult<()>;

    async fn get_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<Option<Tab>>;

    async fn get_tab_overview(&self, shop_id: i64, tab_id: i64)
    -> StoreResult<Option<TabOverview>>;

    async fn list_tabs(&self, shop_id: i64) -> StoreResult<Vec<TabSummary>>;
}
