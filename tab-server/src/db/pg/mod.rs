//! PostgreSQL `TabStore`

mod bills;
mod orders;
mod rows;
mod sync;
mod tabs;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{Tab, TabOverview, TabSummary, TabUpdate};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{NewTab, OrderApplication, StoreError, StoreResult, TabStore};
use crate::billing::{self, BillPlan};
use sync::Members;

#[derive(Clone)]
pub struct PgTabStore {
    pool: PgPool,
}

impl PgTabStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl TabStore for PgTabStore {
    async fn create_tab(&self, new: &NewTab) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;
        let tab_id = tabs::insert(&mut tx, new).await?;
        tx.commit().await?;
        Ok(tab_id)
    }

    async fn stage_update(
        &self,
        shop_id: i64,
        tab_id: i64,
        update: &TabUpdate,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        tabs::lock_open_tab(&mut tx, shop_id, tab_id).await?;
        tabs::stage_update(&mut tx, shop_id, tab_id, update).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn approve_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        tabs::lock_open_tab(&mut tx, shop_id, tab_id).await?;
        tabs::approve(&mut tx, shop_id, tab_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn close_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        tabs::lock_tab(&mut tx, shop_id, tab_id).await?;
        tabs::close(&mut tx, shop_id, tab_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn mark_bill_paid(
        &self,
        shop_id: i64,
        tab_id: i64,
        bill_id: i64,
        today: NaiveDate,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        tabs::lock_tab(&mut tx, shop_id, tab_id).await?;
        bills::mark_paid(&mut tx, shop_id, tab_id, bill_id, today).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_order(
        &self,
        shop_id: i64,
        tab_id: i64,
        order: OrderApplication<'_>,
    ) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;
        let tab = tabs::lock_open_tab(&mut tx, shop_id, tab_id).await?;

        let latest = bills::latest(&mut tx, shop_id, tab_id).await?;
        let furthest_end = bills::furthest_end(&mut tx, shop_id, tab_id).await?;
        let plan = billing::plan_target_bill(
            &tab.settings,
            latest.as_ref(),
            furthest_end,
            order.today,
        )?;
        let bill_id = match plan {
            BillPlan::Reuse(bill_id) => bill_id,
            BillPlan::Create {
                start_date,
                end_date,
            } => bills::insert(&mut tx, shop_id, tab_id, start_date, end_date).await?,
        };

        orders::merge(
            &mut tx,
            shop_id,
            tab_id,
            bill_id,
            order.deltas,
            order.direction,
            order.policy,
        )
        .await?;
        tx.commit().await?;
        Ok(bill_id)
    }

    async fn set_verification_list(
        &self,
        shop_id: i64,
        tab_id: i64,
        emails: &[String],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        tabs::lock_tab(&mut tx, shop_id, tab_id).await?;
        sync::sync_members(&mut tx, shop_id, tab_id, Members::Emails(emails)).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<Option<Tab>> {
        let mut conn = self.pool.acquire().await?;
        tabs::find(&mut conn, shop_id, tab_id).await
    }

    async fn get_tab_overview(
        &self,
        shop_id: i64,
        tab_id: i64,
    ) -> StoreResult<Option<TabOverview>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some(tab) = tabs::find(&mut tx, shop_id, tab_id).await? else {
            return Ok(None);
        };
        let pending_update = tabs::pending_update(&mut tx, shop_id, tab_id).await?;
        let has_open_balance = bills::any_unpaid(&mut tx, shop_id, tab_id).await?;
        let bills = bills::details(&mut tx, shop_id, tab_id).await?;
        let verification_list = tabs::verification_list(&mut tx, shop_id, tab_id).await?;
        let location_ids = tabs::location_ids(&mut tx, shop_id, tab_id).await?;
        tx.commit().await?;

        Ok(Some(TabOverview {
            tab,
            pending_update,
            has_open_balance,
            bills,
            verification_list,
            location_ids,
        }))
    }

    async fn list_tabs(&self, shop_id: i64) -> StoreResult<Vec<TabSummary>> {
        let mut conn = self.pool.acquire().await?;
        tabs::list(&mut conn, shop_id).await
    }
}
