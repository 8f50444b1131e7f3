//! In-memory `TabStore`
//!
//! Used for development without a database and by the integration tests.
//! One async mutex serializes every operation; each operation mutates a copy
//! of the state that replaces the original only when the operation succeeds.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{
    Bill, BillDetail, OrderedItem, OrderedVariant, PendingUpdate, Tab, TabOverview, TabStatus,
    TabSummary, TabUpdate,
};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

use super::{NewTab, OrderApplication, StoreError, StoreResult, TabStore};
use crate::billing::{self, BillPlan};
use crate::reconcile::{self, MergeError, OrderDirection};

#[derive(Debug, Clone)]
struct BillRecord {
    bill: Bill,
    items: BTreeMap<i64, i32>,
    variants: BTreeMap<(i64, i64), i32>,
}

impl BillRecord {
    fn detail(&self) -> BillDetail {
        let items = self
            .items
            .iter()
            .map(|(item_id, quantity)| OrderedItem {
                item_id: *item_id,
                quantity: *quantity,
                variants: self
                    .variants
                    .range((*item_id, i64::MIN)..=(*item_id, i64::MAX))
                    .map(|((_, variant_id), quantity)| OrderedVariant {
                        variant_id: *variant_id,
                        quantity: *quantity,
                    })
                    .collect(),
            })
            .collect();
        BillDetail {
            bill: self.bill.clone(),
            items,
        }
    }
}

#[derive(Debug, Clone)]
struct TabRecord {
    tab: Tab,
    pending: Option<PendingUpdate>,
    verification_list: BTreeSet<String>,
    location_ids: BTreeSet<i64>,
    bills: Vec<BillRecord>,
}

impl TabRecord {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.tab.status.is_closed() {
            return Err(StoreError::TabClosed {
                shop_id: self.tab.shop_id,
                tab_id: self.tab.id,
            });
        }
        Ok(())
    }

    fn has_open_balance(&self) -> bool {
        self.bills.iter().any(|b| !b.bill.is_paid)
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    last_tab_id: i64,
    last_bill_id: i64,
    tabs: BTreeMap<(i64, i64), TabRecord>,
}

impl State {
    fn tab_mut(&mut self, shop_id: i64, tab_id: i64) -> StoreResult<&mut TabRecord> {
        self.tabs
            .get_mut(&(shop_id, tab_id))
            .ok_or(StoreError::TabNotFound { shop_id, tab_id })
    }
}

#[derive(Default)]
pub struct MemoryTabStore {
    state: Mutex<State>,
}

impl MemoryTabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a copy of the state and keep the copy only on success
    async fn transact<T>(&self, f: impl FnOnce(&mut State) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self.state.lock().await;
        let mut draft = state.clone();
        let out = f(&mut draft)?;
        *state = draft;
        Ok(out)
    }
}

#[async_trait]
impl TabStore for MemoryTabStore {
    async fn create_tab(&self, new: &NewTab) -> StoreResult<i64> {
        self.transact(|state| {
            state.last_tab_id += 1;
            let id = state.last_tab_id;
            let record = TabRecord {
                tab: Tab {
                    shop_id: new.shop_id,
                    id,
                    owner_id: new.owner_id,
                    status: TabStatus::AwaitingApproval,
                    settings: new.settings.clone(),
                },
                pending: None,
                verification_list: new.verification_list.iter().cloned().collect(),
                location_ids: new.location_ids.iter().copied().collect(),
                bills: Vec::new(),
            };
            state.tabs.insert((new.shop_id, id), record);
            Ok(id)
        })
        .await
    }

    async fn stage_update(
        &self,
        shop_id: i64,
        tab_id: i64,
        update: &TabUpdate,
    ) -> StoreResult<()> {
        self.transact(|state| {
            let record = state.tab_mut(shop_id, tab_id)?;
            record.ensure_open()?;
            record.pending = Some(PendingUpdate {
                settings: update.settings.clone(),
                verification_list: update.verification_list.clone().unwrap_or_default(),
            });
            if let Some(emails) = &update.verification_list {
                let target: BTreeSet<String> = emails.iter().cloned().collect();
                reconcile::sync_membership(&mut record.verification_list, &target);
            }
            if let Some(locations) = &update.location_ids {
                let target: BTreeSet<i64> = locations.iter().copied().collect();
                reconcile::sync_membership(&mut record.location_ids, &target);
            }
            Ok(())
        })
        .await
    }

    async fn approve_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<()> {
        self.transact(|state| {
            let record = state.tab_mut(shop_id, tab_id)?;
            record.ensure_open()?;
            if let Some(pending) = record.pending.take() {
                record.tab.settings = pending.settings;
            }
            record.tab.status = TabStatus::Confirmed;
            Ok(())
        })
        .await
    }

    async fn close_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<()> {
        self.transact(|state| {
            let record = state.tab_mut(shop_id, tab_id)?;
            record.tab.status = TabStatus::Closed;
            record.pending = None;
            Ok(())
        })
        .await
    }

    async fn mark_bill_paid(
        &self,
        shop_id: i64,
        tab_id: i64,
        bill_id: i64,
        today: NaiveDate,
    ) -> StoreResult<()> {
        self.transact(|state| {
            let record = state.tab_mut(shop_id, tab_id)?;
            let bill = record
                .bills
                .iter_mut()
                .find(|b| b.bill.id == bill_id)
                .ok_or(StoreError::BillNotFound {
                    shop_id,
                    tab_id,
                    bill_id,
                })?;
            bill.bill.is_paid = true;
            bill.bill.end_date = bill.bill.end_date.min(today.max(bill.bill.start_date));
            Ok(())
        })
        .await
    }

    async fn apply_order(
        &self,
        shop_id: i64,
        tab_id: i64,
        order: OrderApplication<'_>,
    ) -> StoreResult<i64> {
        self.transact(|state| {
            let State {
                tabs, last_bill_id, ..
            } = state;
            let record = tabs
                .get_mut(&(shop_id, tab_id))
                .ok_or(StoreError::TabNotFound { shop_id, tab_id })?;
            record.ensure_open()?;

            let latest = billing::latest_bill(record.bills.iter().map(|b| &b.bill));
            let furthest_end = billing::furthest_end(record.bills.iter().map(|b| &b.bill));
            let plan = billing::plan_target_bill(
                &record.tab.settings,
                latest,
                furthest_end,
                order.today,
            )?;

            let index = match plan {
                BillPlan::Reuse(bill_id) => record
                    .bills
                    .iter()
                    .position(|b| b.bill.id == bill_id)
                    .ok_or(StoreError::BillNotFound {
                        shop_id,
                        tab_id,
                        bill_id,
                    })?,
                BillPlan::Create {
                    start_date,
                    end_date,
                } => {
                    *last_bill_id += 1;
                    record.bills.push(BillRecord {
                        bill: Bill {
                            shop_id,
                            tab_id,
                            id: *last_bill_id,
                            start_date,
                            end_date,
                            is_paid: false,
                        },
                        items: BTreeMap::new(),
                        variants: BTreeMap::new(),
                    });
                    record.bills.len() - 1
                }
            };

            let bill = &mut record.bills[index];
            for (item_id, delta) in &order.deltas.items {
                let stored = bill.items.get(item_id).copied();
                match reconcile::merge_quantity(stored, *delta, order.direction, order.policy) {
                    Ok(Some(quantity)) => {
                        bill.items.insert(*item_id, quantity);
                    }
                    Ok(None) => {}
                    Err(e) => return Err(merge_error(e, *item_id, None)),
                }
            }
            for (key, delta) in &order.deltas.variants {
                if order.direction == OrderDirection::Add && !bill.items.contains_key(&key.0) {
                    continue;
                }
                let stored = bill.variants.get(key).copied();
                match reconcile::merge_quantity(stored, *delta, order.direction, order.policy) {
                    Ok(Some(quantity)) => {
                        bill.variants.insert(*key, quantity);
                    }
                    Ok(None) => {}
                    Err(e) => return Err(merge_error(e, key.0, Some(key.1))),
                }
            }

            Ok(bill.bill.id)
        })
        .await
    }

    async fn set_verification_list(
        &self,
        shop_id: i64,
        tab_id: i64,
        emails: &[String],
    ) -> StoreResult<()> {
        self.transact(|state| {
            let record = state.tab_mut(shop_id, tab_id)?;
            let target: BTreeSet<String> = emails.iter().cloned().collect();
            reconcile::sync_membership(&mut record.verification_list, &target);
            Ok(())
        })
        .await
    }

    async fn get_tab(&self, shop_id: i64, tab_id: i64) -> StoreResult<Option<Tab>> {
        let state = self.state.lock().await;
        Ok(state.tabs.get(&(shop_id, tab_id)).map(|r| r.tab.clone()))
    }

    async fn get_tab_overview(
        &self,
        shop_id: i64,
        tab_id: i64,
    ) -> StoreResult<Option<TabOverview>> {
        let state = self.state.lock().await;
        let Some(record) = state.tabs.get(&(shop_id, tab_id)) else {
            return Ok(None);
        };

        let mut bills: Vec<BillDetail> = record.bills.iter().map(BillRecord::detail).collect();
        bills.sort_by_key(|b| (b.bill.start_date, b.bill.id));

        Ok(Some(TabOverview {
            tab: record.tab.clone(),
            pending_update: record.pending.clone(),
            has_open_balance: record.has_open_balance(),
            bills,
            verification_list: record.verification_list.iter().cloned().collect(),
            location_ids: record.location_ids.iter().copied().collect(),
        }))
    }

    async fn list_tabs(&self, shop_id: i64) -> StoreResult<Vec<TabSummary>> {
        let state = self.state.lock().await;
        Ok(state
            .tabs
            .range((shop_id, i64::MIN)..=(shop_id, i64::MAX))
            .map(|(_, record)| TabSummary {
                tab: record.tab.clone(),
                has_pending_update: record.pending.is_some(),
                has_open_balance: record.has_open_balance(),
                verification_list: record.verification_list.iter().cloned().collect(),
            })
            .collect())
    }
}

fn merge_error(err: MergeError, item_id: i64, variant_id: Option<i64>) -> StoreError {
    match err {
        MergeError::Insufficient => StoreError::InsufficientQuantity {
            item_id,
            variant_id,
        },
        MergeError::Overflow => StoreError::QuantityOverflow {
            item_id: Some(item_id),
            variant_id,
        },
    }
}
