//! PostgreSQL store tests
//!
//! Run with a disposable database:
//! `DATABASE_URL=postgres://... cargo test -p tab-server --test postgres_store -- --ignored`

mod common;

use std::sync::Arc;

use common::*;
use shared::error::ErrorCode;
use shared::models::{TabStatus, TabUpdate};
use tab_server::auth::{RequestContext, ShopRolePolicy};
use tab_server::clock::FixedClock;
use tab_server::db::PgTabStore;
use tab_server::reconcile::RemovalPolicy;
use tab_server::TabService;
use uuid::Uuid;

struct PgHarness {
    service: TabService,
    clock: Arc<FixedClock>,
    shop_id: i64,
    staff: RequestContext,
    owner: RequestContext,
}

async fn pg_harness(policy: RemovalPolicy) -> PgHarness {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
    let store = PgTabStore::connect(&url, 8).await.unwrap();
    store.migrate().await.unwrap();

    // Fresh shop per test so runs never see each other's rows
    let shop_id = (Uuid::new_v4().as_u64_pair().0 >> 2) as i64 + 1;
    let clock = Arc::new(FixedClock::new(day(1)));
    let service = TabService::new(Arc::new(store), Arc::new(ShopRolePolicy), clock.clone())
        .with_removal_policy(policy);

    PgHarness {
        service,
        clock,
        shop_id,
        staff: ctx(&[shop_id], "cashier@example.edu"),
        owner: ctx(&[], "owner@example.edu"),
    }
}

impl PgHarness {
    async fn open_tab(&self, interval_days: i32, end_offset: u64) -> i64 {
        self.service
            .create_tab(&self.owner, self.shop_id, tab_create(interval_days, day(end_offset)))
            .await
            .unwrap()
    }
}

#[tokio::test]
#[ignore]
async fn test_pg_lifecycle_round_trip() {
    let h = pg_harness(RemovalPolicy::Unchecked).await;
    let tab_id = h.open_tab(7, 90).await;

    let mut update = TabUpdate {
        settings: settings(14, day(60)),
        verification_list: Some(vec!["solo@example.edu".into()]),
        location_ids: Some(vec![8]),
    };
    update.settings.display_name = "Renamed".into();
    h.service
        .submit_update(&h.owner, h.shop_id, tab_id, update)
        .await
        .unwrap();

    let overview = h
        .service
        .get_tab_overview(&h.staff, h.shop_id, tab_id)
        .await
        .unwrap();
    assert_eq!(overview.tab.status, TabStatus::AwaitingApproval);
    assert_eq!(overview.pending_update.unwrap().settings.display_name, "Renamed");
    assert_eq!(overview.verification_list, vec!["solo@example.edu"]);
    assert_eq!(overview.location_ids, vec![8]);

    h.service.approve_tab(&h.staff, h.shop_id, tab_id).await.unwrap();
    let overview = h
        .service
        .get_tab_overview(&h.staff, h.shop_id, tab_id)
        .await
        .unwrap();
    assert_eq!(overview.tab.status, TabStatus::Confirmed);
    assert_eq!(overview.tab.settings.display_name, "Renamed");
    assert_eq!(overview.tab.settings.billing_interval_days, 14);
    assert!(overview.pending_update.is_none());

    let err = h
        .service
        .approve_tab(&h.staff, h.shop_id, tab_id + 1_000_000)
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::TabNotFound);

    h.service.close_tab(&h.staff, h.shop_id, tab_id).await.unwrap();
    let err = h
        .service
        .add_order(&h.staff, h.shop_id, tab_id, &order(&[(1, 1)]))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::TabClosed);
}

#[tokio::test]
#[ignore]
async fn test_pg_billing_and_ledger() {
    let h = pg_harness(RemovalPolicy::Unchecked).await;
    let tab_id = h.open_tab(7, 365).await;

    let first = h
        .service
        .add_order(&h.staff, h.shop_id, tab_id, &order(&[(42, 2)]))
        .await
        .unwrap();
    let same = h
        .service
        .add_order(&h.staff, h.shop_id, tab_id, &order_with_variants(42, 3, &[(420, 1)]))
        .await
        .unwrap();
    assert_eq!(first, same);

    h.service
        .remove_order(&h.staff, h.shop_id, tab_id, &order(&[(42, 5), (43, 1)]))
        .await
        .unwrap();

    h.clock.set(day(6));
    h.service
        .mark_bill_paid(&h.staff, h.shop_id, tab_id, first)
        .await
        .unwrap();
    let second = h
        .service
        .add_order(&h.staff, h.shop_id, tab_id, &order(&[(42, 1)]))
        .await
        .unwrap();
    assert_ne!(first, second);

    let overview = h
        .service
        .get_tab_overview(&h.staff, h.shop_id, tab_id)
        .await
        .unwrap();
    assert_eq!(overview.bills.len(), 2);
    let (paid, open) = (&overview.bills[0], &overview.bills[1]);
    assert!(paid.bill.is_paid);
    assert_eq!((paid.bill.start_date, paid.bill.end_date), (day(0), day(6)));
    assert_eq!(paid.items.len(), 1);
    assert_eq!(paid.items[0].quantity, 0);
    assert_eq!(paid.items[0].variants[0].variant_id, 420);
    assert_eq!((open.bill.start_date, open.bill.end_date), (day(6), day(12)));
    assert_eq!(open.items[0].quantity, 1);
    assert!(overview.has_open_balance);
}

#[tokio::test]
#[ignore]
async fn test_pg_reject_policy_rolls_back() {
    let h = pg_harness(RemovalPolicy::RejectIfInsufficient).await;
    let tab_id = h.open_tab(7, 365).await;
    h.service
        .add_order(&h.staff, h.shop_id, tab_id, &order(&[(1, 2), (2, 1)]))
        .await
        .unwrap();

    let err = h
        .service
        .remove_order(&h.staff, h.shop_id, tab_id, &order(&[(1, 1), (2, 5)]))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderInsufficientQuantity);

    let overview = h
        .service
        .get_tab_overview(&h.staff, h.shop_id, tab_id)
        .await
        .unwrap();
    let lines: Vec<_> = overview.bills[0]
        .items
        .iter()
        .map(|i| (i.item_id, i.quantity))
        .collect();
    assert_eq!(lines, vec![(1, 2), (2, 1)]);
}

#[tokio::test]
#[ignore]
async fn test_pg_verification_sync_converges() {
    let h = pg_harness(RemovalPolicy::Unchecked).await;
    let tab_id = h.open_tab(7, 90).await;
    let emails: Vec<String> = vec!["a@example.edu".into(), "b@example.edu".into()];

    for target in [&emails[..], &emails[..], &emails[..1]] {
        h.service
            .set_verification_list(&h.staff, h.shop_id, tab_id, target)
            .await
            .unwrap();
        let list = h
            .service
            .get_tab_overview(&h.staff, h.shop_id, tab_id)
            .await
            .unwrap()
            .verification_list;
        assert_eq!(list, target.to_vec());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_pg_concurrent_orders_share_one_bill() {
    let h = Arc::new(pg_harness(RemovalPolicy::Unchecked).await);
    let tab_id = h.open_tab(7, 365).await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let h = h.clone();
            tokio::spawn(async move {
                h.service
                    .add_order(&h.staff, h.shop_id, tab_id, &order(&[(1, 1)]))
                    .await
                    .unwrap()
            })
        })
        .collect();
    let mut bill_ids = Vec::new();
    for task in tasks {
        bill_ids.push(task.await.unwrap());
    }
    bill_ids.dedup();
    assert_eq!(bill_ids.len(), 1);

    let overview = h
        .service
        .get_tab_overview(&h.staff, h.shop_id, tab_id)
        .await
        .unwrap();
    assert_eq!(overview.bills.len(), 1);
    assert_eq!(overview.bills[0].items[0].quantity, 16);
}

#[tokio::test]
#[ignore]
async fn test_pg_list_tabs_flags() {
    let h = pg_harness(RemovalPolicy::Unchecked).await;
    let quiet = h.open_tab(7, 90).await;
    let busy = h.open_tab(7, 90).await;
    h.service
        .add_order(&h.staff, h.shop_id, busy, &order(&[(1, 1)]))
        .await
        .unwrap();
    h.service
        .submit_update(
            &h.owner,
            h.shop_id,
            quiet,
            TabUpdate {
                settings: settings(7, day(30)),
                verification_list: None,
                location_ids: None,
            },
        )
        .await
        .unwrap();

    let tabs = h.service.list_tabs(&h.staff, h.shop_id).await.unwrap();
    assert_eq!(tabs.len(), 2);
    let quiet_summary = tabs.iter().find(|t| t.tab.id == quiet).unwrap();
    assert!(quiet_summary.has_pending_update);
    assert!(!quiet_summary.has_open_balance);
    assert_eq!(quiet_summary.verification_list.len(), 2);
    let busy_summary = tabs.iter().find(|t| t.tab.id == busy).unwrap();
    assert!(busy_summary.has_open_balance);
}

#[tokio::test]
#[ignore]
async fn test_pg_rejected_orders_write_nothing() {
    let h = pg_harness(RemovalPolicy::Unchecked).await;
    let tab_id = h.open_tab(7, 9).await;
    let near_max = vec![(5, 10_000); 214_748];
    h.service
        .add_order(&h.staff, h.shop_id, tab_id, &order(&near_max))
        .await
        .unwrap();

    let err = h
        .service
        .add_order(&h.staff, h.shop_id, tab_id, &order(&[(5, 10_000)]))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderQuantityOverflow);

    h.clock.set(day(12));
    let err = h
        .service
        .add_order(&h.staff, h.shop_id, tab_id, &order(&[(1, 1)]))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::TabNotActive);

    let overview = h
        .service
        .get_tab_overview(&h.staff, h.shop_id, tab_id)
        .await
        .unwrap();
    assert_eq!(overview.bills.len(), 1);
    assert_eq!(overview.bills[0].items[0].quantity, 2_147_480_000);
}
