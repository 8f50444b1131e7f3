//! Row shapes read from PostgreSQL and their conversion to domain models
//!
//! Enum columns are TEXT; they are parsed here so a bad value surfaces as
//! `StoreError::Corrupt` instead of a driver decode failure.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::models::{PendingUpdate, Tab, TabSettings, TabSummary};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use uuid::Uuid;

use crate::db::StoreError;

/// Editable columns shared by `tabs` and `tab_updates`, in bind order
macro_rules! settings_columns {
    () => {
        "payment_method, organization, display_name, start_date, end_date, \
         daily_start_time, daily_end_time, active_days_of_wk, dollar_limit_per_order, \
         verification_method, payment_details, billing_interval_days"
    };
}
pub(super) use settings_columns;

#[derive(sqlx::FromRow)]
pub(super) struct SettingsRow {
    payment_method: String,
    organization: String,
    display_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    daily_start_time: NaiveTime,
    daily_end_time: NaiveTime,
    active_days_of_wk: i16,
    dollar_limit_per_order: Decimal,
    verification_method: String,
    payment_details: String,
    billing_interval_days: i32,
}

impl TryFrom<SettingsRow> for TabSettings {
    type Error = StoreError;

    fn try_from(row: SettingsRow) -> Result<Self, Self::Error> {
        Ok(TabSettings {
            payment_method: row
                .payment_method
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            organization: row.organization,
            display_name: row.display_name,
            start_date: row.start_date,
            end_date: row.end_date,
            daily_start_time: row.daily_start_time,
            daily_end_time: row.daily_end_time,
            active_days_of_wk: row.active_days_of_wk,
            dollar_limit_per_order: row.dollar_limit_per_order,
            verification_method: row
                .verification_method
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            payment_details: row.payment_details,
            billing_interval_days: row.billing_interval_days,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct TabRow {
    shop_id: i64,
    id: i64,
    owner_id: Uuid,
    status: String,
    #[sqlx(flatten)]
    settings: SettingsRow,
}

impl TryFrom<TabRow> for Tab {
    type Error = StoreError;

    fn try_from(row: TabRow) -> Result<Self, Self::Error> {
        Ok(Tab {
            shop_id: row.shop_id,
            id: row.id,
            owner_id: row.owner_id,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            settings: row.settings.try_into()?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct PendingRow {
    #[sqlx(flatten)]
    settings: SettingsRow,
    verification_list: Vec<String>,
}

impl TryFrom<PendingRow> for PendingUpdate {
    type Error = StoreError;

    fn try_from(row: PendingRow) -> Result<Self, Self::Error> {
        Ok(PendingUpdate {
            settings: row.settings.try_into()?,
            verification_list: row.verification_list,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct SummaryRow {
    #[sqlx(flatten)]
    tab: TabRow,
    has_pending_update: bool,
    has_open_balance: bool,
    verification_list: Vec<String>,
}

impl TryFrom<SummaryRow> for TabSummary {
    type Error = StoreError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(TabSummary {
            tab: row.tab.try_into()?,
            has_pending_update: row.has_pending_update,
            has_open_balance: row.has_open_balance,
            verification_list: row.verification_list,
        })
    }
}

/// Bind the editable settings in `settings_columns!` order
pub(super) fn bind_settings<'q>(
    query: Query<'q, Postgres, PgArguments>,
    s: &'q TabSettings,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(s.payment_method.as_str())
        .bind(&s.organization)
        .bind(&s.display_name)
        .bind(s.start_date)
        .bind(s.end_date)
        .bind(s.daily_start_time)
        .bind(s.daily_end_time)
        .bind(s.active_days_of_wk)
        .bind(s.dollar_limit_per_order)
        .bind(s.verification_method.as_str())
        .bind(&s.payment_details)
        .bind(s.billing_interval_days)
}
