//! Membership diff-sync for tab_users / tab_locations
//!
//! The target set is staged in a transaction-scoped temp table, then two set
//! statements make the persistent table under (shop_id, tab_id) match it:
//! insert what is missing (existing keys are no-ops) and delete what the
//! target no longer holds.

use sqlx::PgConnection;

/// A target membership set and the table it lives in
#[derive(Debug, Clone, Copy)]
pub(super) enum Members<'a> {
    Emails(&'a [String]),
    Locations(&'a [i64]),
}

impl Members<'_> {
    fn table(&self) -> &'static str {
        match self {
            Members::Emails(_) => "tab_users",
            Members::Locations(_) => "tab_locations",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Members::Emails(_) => "email",
            Members::Locations(_) => "location_id",
        }
    }

    fn sql_type(&self) -> &'static str {
        match self {
            Members::Emails(_) => "text",
            Members::Locations(_) => "bigint",
        }
    }
}

pub(super) async fn sync_members(
    conn: &mut PgConnection,
    shop_id: i64,
    tab_id: i64,
    members: Members<'_>,
) -> Result<(), sqlx::Error> {
    let table = members.table();
    let column = members.column();
    let ty = members.sql_type();
    let staging = format!("staged_{table}");

    sqlx::query(&format!(
        "CREATE TEMPORARY TABLE IF NOT EXISTS {staging} (member {ty} PRIMARY KEY) ON COMMIT DROP"
    ))
    .persistent(false)
    .execute(&mut *conn)
    .await?;
    sqlx::query(&format!("TRUNCATE {staging}"))
        .persistent(false)
        .execute(&mut *conn)
        .await?;

    let fill_sql = format!(
        "INSERT INTO {staging} (member) SELECT DISTINCT m FROM UNNEST($1::{ty}[]) AS m ON CONFLICT DO NOTHING"
    );
    let fill = sqlx::query(&fill_sql).persistent(false);
    let fill = match members {
        Members::Emails(emails) => fill.bind(emails),
        Members::Locations(ids) => fill.bind(ids),
    };
    fill.execute(&mut *conn).await?;

    sqlx::query(&format!(
        "INSERT INTO {table} (shop_id, tab_id, {column})
         SELECT $1, $2, member FROM {staging}
         ON CONFLICT DO NOTHING"
    ))
    .persistent(false)
    .bind(shop_id)
    .bind(tab_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "DELETE FROM {table} AS t
         WHERE t.shop_id = $1 AND t.tab_id = $2
           AND NOT EXISTS (SELECT 1 FROM {staging} AS s WHERE s.member = t.{column})"
    ))
    .persistent(false)
    .bind(shop_id)
    .bind(tab_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
