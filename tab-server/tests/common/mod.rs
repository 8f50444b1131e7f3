//! Shared fixtures for the service-level integration tests
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    BillOrderCreate, ItemOrder, PaymentMethod, TabCreate, TabSettings, VariantOrder,
    VerificationMethod,
};
use tab_server::auth::{Actor, RequestContext, ShopRolePolicy};
use tab_server::clock::FixedClock;
use tab_server::db::MemoryTabStore;
use tab_server::reconcile::RemovalPolicy;
use tab_server::{ServiceError, TabService};
use uuid::Uuid;

pub const SHOP: i64 = 1;
pub const OTHER_SHOP: i64 = 2;

/// First day of every fixture tab (a Monday)
pub fn d0() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 7).unwrap()
}

/// `d0() + offset` days
pub fn day(offset: u64) -> NaiveDate {
    d0().checked_add_days(Days::new(offset)).unwrap()
}

pub fn settings(interval_days: i32, end: NaiveDate) -> TabSettings {
    TabSettings {
        payment_method: PaymentMethod::Chartstring,
        organization: "Physics".into(),
        display_name: "Physics Colloquium".into(),
        start_date: d0(),
        end_date: end,
        daily_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        daily_end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        active_days_of_wk: 0b011_1110,
        dollar_limit_per_order: Decimal::new(2500, 2),
        verification_method: VerificationMethod::Specify,
        payment_details: "PHYS-1200-44".into(),
        billing_interval_days: interval_days,
    }
}

pub fn tab_create(interval_days: i32, end: NaiveDate) -> TabCreate {
    TabCreate {
        settings: settings(interval_days, end),
        verification_list: vec!["Reader@Example.edu".into(), "chair@example.edu".into()],
        location_ids: vec![3, 5],
    }
}

/// Items only: `[(item_id, quantity)]`
pub fn order(lines: &[(i64, i32)]) -> BillOrderCreate {
    BillOrderCreate {
        items: lines
            .iter()
            .map(|(id, quantity)| ItemOrder {
                id: *id,
                quantity: *quantity,
                variants: Vec::new(),
            })
            .collect(),
    }
}

/// One item with variants: `(item_id, quantity, [(variant_id, quantity)])`
pub fn order_with_variants(
    item_id: i64,
    quantity: i32,
    variants: &[(i64, i32)],
) -> BillOrderCreate {
    BillOrderCreate {
        items: vec![ItemOrder {
            id: item_id,
            quantity,
            variants: variants
                .iter()
                .map(|(id, quantity)| VariantOrder {
                    id: *id,
                    quantity: *quantity,
                })
                .collect(),
        }],
    }
}

pub fn ctx(staff_shops: &[i64], email: &str) -> RequestContext {
    RequestContext::new(Actor {
        user_id: Uuid::new_v4(),
        email: email.into(),
        staff_shops: staff_shops.iter().copied().collect::<BTreeSet<_>>(),
    })
}

/// Error code carried by a service failure
pub fn code(err: ServiceError) -> ErrorCode {
    AppError::from(err).code
}

pub struct Harness {
    pub service: TabService,
    pub clock: Arc<FixedClock>,
    /// Staff of `SHOP`
    pub staff: RequestContext,
    /// Tab owner, no staff role
    pub owner: RequestContext,
    /// Signed in, no relation to any tab
    pub stranger: RequestContext,
}

impl Harness {
    pub fn new(today: NaiveDate) -> Self {
        Self::with_policy(today, RemovalPolicy::default())
    }

    pub fn with_policy(today: NaiveDate, policy: RemovalPolicy) -> Self {
        let clock = Arc::new(FixedClock::new(today));
        let service = TabService::new(
            Arc::new(MemoryTabStore::new()),
            Arc::new(ShopRolePolicy),
            clock.clone(),
        )
        .with_removal_policy(policy);
        Self {
            service,
            clock,
            staff: ctx(&[SHOP], "cashier@example.edu"),
            owner: ctx(&[], "owner@example.edu"),
            stranger: ctx(&[], "stranger@example.edu"),
        }
    }

    /// Create a tab owned by `self.owner`
    pub async fn open_tab(&self, interval_days: i32, end: NaiveDate) -> i64 {
        self.service
            .create_tab(&self.owner, SHOP, tab_create(interval_days, end))
            .await
            .unwrap()
    }

    pub async fn add(&self, tab_id: i64, order: &BillOrderCreate) -> i64 {
        self.service
            .add_order(&self.staff, SHOP, tab_id, order)
            .await
            .unwrap()
    }
}
