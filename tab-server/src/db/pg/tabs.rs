//! Tab rows and their lifecycle transitions

use shared::models::{PendingUpdate, Tab, TabStatus, TabSummary, TabUpdate};
use sqlx::{PgConnection, Row};

use super::rows::{PendingRow, SummaryRow, TabRow, bind_settings, settings_columns};
use super::sync::{Members, sync_members};
use crate::db::{NewTab, StoreError, StoreResult};

const SELECT_TAB: &str = concat!(
    "SELECT shop_id, id, owner_id, status, ",
    settings_columns!(),
    " FROM tabs WHERE shop_id = $1 AND id = $2"
);

/// Row-lock the tab for the rest of the transaction
///
/// This is the per-tab critical section: order merges, bill selection and
/// transitions on one tab run one at a time.
pub(super) async fn lock_tab(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> StoreResult<Tab> {
    let row: Option<TabRow> = sqlx::query_as(concat!(
        "SELECT shop_id, id, owner_id, status, ",
        settings_columns!(),
        " FROM tabs WHERE shop_id = $1 AND id = $2 FOR UPDATE"
    ))
    .bind(shop_id)
    .bind(tab_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or(StoreError::TabNotFound { shop_id, tab_id })?
        .try_into()
}

/// Lock the tab and refuse if it is closed
pub(super) async fn lock_open_tab(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> StoreResult<Tab> {
    let tab = lock_tab(conn, shop_id, tab_id).await?;
    if tab.status.is_closed() {
        return Err(StoreError::TabClosed { shop_id, tab_id });
    }
    Ok(tab)
}

pub(super) async fn find(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> StoreResult<Option<Tab>> {
    let row: Option<TabRow> = sqlx::query_as(SELECT_TAB)
        .bind(shop_id)
        .bind(tab_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Tab::try_from).transpose()
}

pub(super) async fn insert(conn: &mut PgConnection, new: &NewTab) -> StoreResult<i64> {
    let query = sqlx::query(concat!(
        "INSERT INTO tabs (shop_id, owner_id, status, ",
        settings_columns!(),
        ") VALUES ($1, $2, 'awaiting_approval', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING id"
    ))
    .bind(new.shop_id)
    .bind(new.owner_id);
    let row = bind_settings(query, &new.settings)
        .fetch_one(&mut *conn)
        .await?;
    let tab_id: i64 = row.try_get("id")?;

    sync_members(&mut *conn, new.shop_id, tab_id, Members::Emails(&new.verification_list)).await?;
    sync_members(&mut *conn, new.shop_id, tab_id, Members::Locations(&new.location_ids)).await?;
    Ok(tab_id)
}

/// Replace the staged update wholesale and apply membership lists to the live tab
pub(super) async fn stage_update(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    update: &TabUpdate,
) -> StoreResult<()> {
    sqlx::query("DELETE FROM tab_updates WHERE shop_id = $1 AND tab_id = $2")
        .bind(shop_id)
        .bind(tab_id)
        .execute(&mut *conn)
        .await?;

    let staged_list = update.verification_list.clone().unwrap_or_default();
    let query = sqlx::query(concat!(
        "INSERT INTO tab_updates (shop_id, tab_id, ",
        settings_columns!(),
        ", verification_list) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
    ))
    .bind(shop_id)
    .bind(tab_id);
    bind_settings(query, &update.settings)
        .bind(&staged_list)
        .execute(&mut *conn)
        .await?;

    if let Some(emails) = &update.verification_list {
        sync_members(&mut *conn, shop_id, tab_id, Members::Emails(emails)).await?;
    }
    if let Some(locations) = &update.location_ids {
        sync_members(&mut *conn, shop_id, tab_id, Members::Locations(locations)).await?;
    }
    Ok(())
}

/// Copy a staged update onto the tab (zero rows when none is staged), confirm, drop the stage
pub(super) async fn approve(conn: &mut PgConnection, shop_id: i64, tab_id: i64) -> StoreResult<()> {
    sqlx::query(concat!(
        "UPDATE tabs AS t SET (",
        settings_columns!(),
        ") = (SELECT ",
        settings_columns!(),
        " FROM tab_updates AS u WHERE u.shop_id = t.shop_id AND u.tab_id = t.id)
         WHERE t.shop_id = $1 AND t.id = $2
           AND EXISTS (SELECT 1 FROM tab_updates AS u WHERE u.shop_id = t.shop_id AND u.tab_id = t.id)"
    ))
    .bind(shop_id)
    .bind(tab_id)
    .execute(&mut *conn)
    .await?;

    set_status(conn, shop_id, tab_id, TabStatus::Confirmed).await?;

    sqlx::query("DELETE FROM tab_updates WHERE shop_id = $1 AND tab_id = $2")
        .bind(shop_id)
        .bind(tab_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(super) async fn close(conn: &mut PgConnection, shop_id: i64, tab_id: i64) -> StoreResult<()> {
    set_status(conn, shop_id, tab_id, TabStatus::Closed).await?;
    sqlx::query("DELETE FROM tab_updates WHERE shop_id = $1 AND tab_id = $2")
        .bind(shop_id)
        .bind(tab_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Authoritative status write: zero affected rows means the tab does not exist
async fn set_status(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    status: TabStatus,
) -> StoreResult<()> {
    let result = sqlx::query("UPDATE tabs SET status = $3 WHERE shop_id = $1 AND id = $2")
        .bind(shop_id)
        .bind(tab_id)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::TabNotFound { shop_id, tab_id });
    }
    Ok(())
}

pub(super) async fn pending_update(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> StoreResult<Option<PendingUpdate>> {
    let row: Option<PendingRow> = sqlx::query_as(concat!(
        "SELECT ",
        settings_columns!(),
        ", verification_list FROM tab_updates WHERE shop_id = $1 AND tab_id = $2"
    ))
    .bind(shop_id)
    .bind(tab_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(PendingUpdate::try_from).transpose()
}

pub(super) async fn verification_list(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> StoreResult<Vec<String>> {
    let emails: Vec<String> = sqlx::query_scalar(
        "SELECT email FROM tab_users WHERE shop_id = $1 AND tab_id = $2 ORDER BY email",
    )
    .bind(shop_id)
    .bind(tab_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(emails)
}

pub(super) async fn location_ids(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> StoreResult<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT location_id FROM tab_locations WHERE shop_id = $1 AND tab_id = $2 ORDER BY location_id",
    )
    .bind(shop_id)
    .bind(tab_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

pub(super) async fn list(conn: &mut PgConnection, shop_id: i64) -> StoreResult<Vec<TabSummary>> {
    let rows: Vec<SummaryRow> = sqlx::query_as(concat!(
        "SELECT t.shop_id, t.id, t.owner_id, t.status, ",
        settings_columns!(),
        ",
            EXISTS (SELECT 1 FROM tab_updates AS u
                    WHERE u.shop_id = t.shop_id AND u.tab_id = t.id) AS has_pending_update,
            EXISTS (SELECT 1 FROM tab_bills AS b
                    WHERE b.shop_id = t.shop_id AND b.tab_id = t.id AND NOT b.is_paid) AS has_open_balance,
            COALESCE((SELECT array_agg(tu.email ORDER BY tu.email) FROM tab_users AS tu
                      WHERE tu.shop_id = t.shop_id AND tu.tab_id = t.id), '{}') AS verification_list
         FROM tabs AS t
         WHERE t.shop_id = $1
         ORDER BY t.id"
    ))
    .bind(shop_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(TabSummary::try_from).collect()
}
