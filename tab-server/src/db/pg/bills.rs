//! Bill rows and bill-with-lines reads

use chrono::NaiveDate;
use shared::models::{Bill, BillDetail, OrderedItem, OrderedVariant};
use sqlx::PgConnection;
use std::collections::BTreeMap;

use crate::db::{StoreError, StoreResult};

/// Unpaid first, then latest ending; mirrors `billing::latest_first`
pub(super) async fn latest(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> Result<Option<Bill>, sqlx::Error> {
    sqlx::query_as::<_, Bill>(
        "SELECT shop_id, tab_id, id, start_date, end_date, is_paid
         FROM tab_bills
         WHERE shop_id = $1 AND tab_id = $2
         ORDER BY is_paid, end_date DESC, id DESC
         LIMIT 1",
    )
    .bind(shop_id)
    .bind(tab_id)
    .fetch_optional(&mut *conn)
    .await
}

pub(super) async fn furthest_end(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(end_date) FROM tab_bills WHERE shop_id = $1 AND tab_id = $2")
        .bind(shop_id)
        .bind(tab_id)
        .fetch_one(&mut *conn)
        .await
}

pub(super) async fn insert(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO tab_bills (shop_id, tab_id, start_date, end_date)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(shop_id)
    .bind(tab_id)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(&mut *conn)
    .await
}

/// Settle the bill; an early payment ends its window on `today`
pub(super) async fn mark_paid(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    bill_id: i64,
    today: NaiveDate,
) -> StoreResult<()> {
    let result = sqlx::query(
        "UPDATE tab_bills SET is_paid = TRUE, end_date = LEAST(end_date, GREATEST(start_date, $4))
         WHERE shop_id = $1 AND tab_id = $2 AND id = $3",
    )
    .bind(shop_id)
    .bind(tab_id)
    .bind(bill_id)
    .bind(today)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::BillNotFound {
            shop_id,
            tab_id,
            bill_id,
        });
    }
    Ok(())
}

pub(super) async fn any_unpaid(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM tab_bills WHERE shop_id = $1 AND tab_id = $2 AND NOT is_paid)",
    )
    .bind(shop_id)
    .bind(tab_id)
    .fetch_one(&mut *conn)
    .await
}

/// Every bill of the tab by start date, with item lines and nested variant lines
pub(super) async fn details(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
) -> Result<Vec<BillDetail>, sqlx::Error> {
    let bills = sqlx::query_as::<_, Bill>(
        "SELECT shop_id, tab_id, id, start_date, end_date, is_paid
         FROM tab_bills
         WHERE shop_id = $1 AND tab_id = $2
         ORDER BY start_date, id",
    )
    .bind(shop_id)
    .bind(tab_id)
    .fetch_all(&mut *conn)
    .await?;

    let items: Vec<(i64, i64, i32)> = sqlx::query_as(
        "SELECT bill_id, item_id, quantity FROM order_items
         WHERE shop_id = $1 AND tab_id = $2
         ORDER BY bill_id, item_id",
    )
    .bind(shop_id)
    .bind(tab_id)
    .fetch_all(&mut *conn)
    .await?;

    let variants: Vec<(i64, i64, i64, i32)> = sqlx::query_as(
        "SELECT bill_id, item_id, variant_id, quantity FROM order_variants
         WHERE shop_id = $1 AND tab_id = $2
         ORDER BY bill_id, item_id, variant_id",
    )
    .bind(shop_id)
    .bind(tab_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut variants_by_line: BTreeMap<(i64, i64), Vec<OrderedVariant>> = BTreeMap::new();
    for (bill_id, item_id, variant_id, quantity) in variants {
        variants_by_line
            .entry((bill_id, item_id))
            .or_default()
            .push(OrderedVariant {
                variant_id,
                quantity,
            });
    }

    let mut items_by_bill: BTreeMap<i64, Vec<OrderedItem>> = BTreeMap::new();
    for (bill_id, item_id, quantity) in items {
        items_by_bill.entry(bill_id).or_default().push(OrderedItem {
            item_id,
            quantity,
            variants: variants_by_line.remove(&(bill_id, item_id)).unwrap_or_default(),
        });
    }

    Ok(bills
        .into_iter()
        .map(|bill| BillDetail {
            items: items_by_bill.remove(&bill.id).unwrap_or_default(),
            bill,
        })
        .collect())
}
