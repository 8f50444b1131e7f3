//! Order ledger merge
//!
//! Deltas are staged in transaction-scoped temp tables and merged into
//! `order_items` / `order_variants` with one set statement per table. Adds
//! upsert (`existing + delta`, or `delta` for a new line). Removals only
//! update lines already on the bill, with the removal policy deciding what
//! happens below zero.

use sqlx::PgConnection;

use crate::db::{StoreError, StoreResult};
use crate::reconcile::{OrderDeltas, OrderDirection, RemovalPolicy};

pub(super) async fn merge(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    bill_id: i64,
    deltas: &OrderDeltas,
    direction: OrderDirection,
    policy: RemovalPolicy,
) -> StoreResult<()> {
    stage(conn, deltas).await?;

    match direction {
        OrderDirection::Add => add(conn, shop_id, tab_id, bill_id)
            .await
            .map_err(merge_error)?,
        OrderDirection::Remove => {
            if policy == RemovalPolicy::RejectIfInsufficient {
                check_sufficient(conn, shop_id, tab_id, bill_id).await?;
            }
            remove(conn, shop_id, tab_id, bill_id, policy)
                .await
                .map_err(merge_error)?;
        }
    }
    Ok(())
}

/// SQLSTATE `numeric_value_out_of_range`, raised when a line leaves `INTEGER`
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

fn merge_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db)
            if db.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) =>
        {
            StoreError::QuantityOverflow {
                item_id: None,
                variant_id: None,
            }
        }
        _ => StoreError::Database(err),
    }
}

async fn stage(conn: &mut PgConnection, deltas: &OrderDeltas) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TEMPORARY TABLE IF NOT EXISTS staged_order_items (
            item_id BIGINT PRIMARY KEY,
            quantity INTEGER NOT NULL
         ) ON COMMIT DROP",
    )
    .persistent(false)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        "CREATE TEMPORARY TABLE IF NOT EXISTS staged_order_variants (
            item_id BIGINT NOT NULL,
            variant_id BIGINT NOT NULL,
            quantity INTEGER NOT NULL,
            PRIMARY KEY (item_id, variant_id)
         ) ON COMMIT DROP",
    )
    .persistent(false)
    .execute(&mut *conn)
    .await?;
    sqlx::query("TRUNCATE staged_order_items, staged_order_variants")
        .persistent(false)
        .execute(&mut *conn)
        .await?;

    let (item_ids, item_qtys) = deltas.item_columns();
    sqlx::query(
        "INSERT INTO staged_order_items (item_id, quantity)
         SELECT * FROM UNNEST($1::bigint[], $2::integer[])",
    )
    .persistent(false)
    .bind(&item_ids)
    .bind(&item_qtys)
    .execute(&mut *conn)
    .await?;

    let (v_item_ids, variant_ids, variant_qtys) = deltas.variant_columns();
    if !variant_ids.is_empty() {
        sqlx::query(
            "INSERT INTO staged_order_variants (item_id, variant_id, quantity)
             SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::integer[])",
        )
        .persistent(false)
        .bind(&v_item_ids)
        .bind(&variant_ids)
        .bind(&variant_qtys)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn add(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    bill_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO order_items (shop_id, tab_id, bill_id, item_id, quantity)
         SELECT $1, $2, $3, s.item_id, s.quantity FROM staged_order_items AS s
         ON CONFLICT (shop_id, tab_id, bill_id, item_id)
         DO UPDATE SET quantity = order_items.quantity + EXCLUDED.quantity",
    )
    .persistent(false)
    .bind(shop_id)
    .bind(tab_id)
    .bind(bill_id)
    .execute(&mut *conn)
    .await?;

    // Item lines exist now, so every variant line has its parent
    sqlx::query(
        "INSERT INTO order_variants (shop_id, tab_id, bill_id, item_id, variant_id, quantity)
         SELECT $1, $2, $3, s.item_id, s.variant_id, s.quantity FROM staged_order_variants AS s
         ON CONFLICT (shop_id, tab_id, bill_id, item_id, variant_id)
         DO UPDATE SET quantity = order_variants.quantity + EXCLUDED.quantity",
    )
    .persistent(false)
    .bind(shop_id)
    .bind(tab_id)
    .bind(bill_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// First staged line whose removal exceeds what the bill holds (missing = 0)
async fn check_sufficient(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    bill_id: i64,
) -> StoreResult<()> {
    let short_item: Option<i64> = sqlx::query_scalar(
        "SELECT s.item_id FROM staged_order_items AS s
         LEFT JOIN order_items AS o
           ON o.shop_id = $1 AND o.tab_id = $2 AND o.bill_id = $3 AND o.item_id = s.item_id
         WHERE COALESCE(o.quantity, 0) < s.quantity
         ORDER BY s.item_id
         LIMIT 1",
    )
    .persistent(false)
    .bind(shop_id)
    .bind(tab_id)
    .bind(bill_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(item_id) = short_item {
        return Err(StoreError::InsufficientQuantity {
            item_id,
            variant_id: None,
        });
    }

    let short_variant: Option<(i64, i64)> = sqlx::query_as(
        "SELECT s.item_id, s.variant_id FROM staged_order_variants AS s
         LEFT JOIN order_variants AS o
           ON o.shop_id = $1 AND o.tab_id = $2 AND o.bill_id = $3
          AND o.item_id = s.item_id AND o.variant_id = s.variant_id
         WHERE COALESCE(o.quantity, 0) < s.quantity
         ORDER BY s.item_id, s.variant_id
         LIMIT 1",
    )
    .persistent(false)
    .bind(shop_id)
    .bind(tab_id)
    .bind(bill_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some((item_id, variant_id)) = short_variant {
        return Err(StoreError::InsufficientQuantity {
            item_id,
            variant_id: Some(variant_id),
        });
    }
    Ok(())
}

async fn remove(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    bill_id: i64,
    policy: RemovalPolicy,
) -> Result<(), sqlx::Error> {
    let (items_sql, variants_sql) = match policy {
        RemovalPolicy::ClampAtZero => (
            "UPDATE order_items AS o SET quantity = GREATEST(o.quantity - s.quantity, 0)
             FROM staged_order_items AS s
             WHERE o.shop_id = $1 AND o.tab_id = $2 AND o.bill_id = $3 AND o.item_id = s.item_id",
            "UPDATE order_variants AS o SET quantity = GREATEST(o.quantity - s.quantity, 0)
             FROM staged_order_variants AS s
             WHERE o.shop_id = $1 AND o.tab_id = $2 AND o.bill_id = $3
               AND o.item_id = s.item_id AND o.variant_id = s.variant_id",
        ),
        RemovalPolicy::Unchecked | RemovalPolicy::RejectIfInsufficient => (
            "UPDATE order_items AS o SET quantity = o.quantity - s.quantity
             FROM staged_order_items AS s
             WHERE o.shop_id = $1 AND o.tab_id = $2 AND o.bill_id = $3 AND o.item_id = s.item_id",
            "UPDATE order_variants AS o SET quantity = o.quantity - s.quantity
             FROM staged_order_variants AS s
             WHERE o.shop_id = $1 AND o.tab_id = $2 AND o.bill_id = $3
               AND o.item_id = s.item_id AND o.variant_id = s.variant_id",
        ),
    };

    for sql in [items_sql, variants_sql] {
        sqlx::query(sql)
            .persistent(false)
            .bind(shop_id)
            .bind(tab_id)
            .bind(bill_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
