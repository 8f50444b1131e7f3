//! Billing cycle selection
//!
//! Bills are materialized lazily: the first order of a tab creates a window
//! starting at the tab's start date, later orders reuse the current window
//! while it is unpaid and covers today, and otherwise a successor window is
//! opened starting on the previous window's end date. A successor never
//! starts before the furthest end date of any bill on the tab, so windows
//! touch but never overlap. Every window is clipped to the tab's end date.
//!
//! Orders are only accepted while today lies inside the tab's date range, and
//! a new window always covers today: windows no order landed in are skipped
//! rather than materialized. Two orders on the same day therefore land on the
//! same bill.
//!
//! The functions here are pure. Callers hold the per-tab lock while they read
//! the latest bill and persist the plan.

use chrono::{Days, NaiveDate};
use shared::models::{Bill, TabSettings};
use std::cmp::Ordering;

/// What the order path should do to obtain its target bill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillPlan {
    /// The latest bill is open and covers today
    Reuse(i64),
    /// Insert a new bill with this window
    Create {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    /// Today lies outside the tab's date range
    #[error("tab accepts orders from {start_date} to {end_date}")]
    NotActive {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },

    /// The tab's end date leaves no room for another window
    #[error("no billing window remains before {tab_end}")]
    HorizonExhausted { tab_end: NaiveDate },
}

/// Order in which bills compete for "latest": unpaid before paid, then the
/// latest end date first.
pub fn latest_first(a: &Bill, b: &Bill) -> Ordering {
    a.is_paid
        .cmp(&b.is_paid)
        .then_with(|| b.end_date.cmp(&a.end_date))
        .then_with(|| b.id.cmp(&a.id))
}

/// The bill the selector starts from, if the tab has any
pub fn latest_bill<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> Option<&'a Bill> {
    bills.into_iter().min_by(|a, b| latest_first(a, b))
}

/// Furthest end date over all of a tab's bills
pub fn furthest_end<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> Option<NaiveDate> {
    bills.into_iter().map(|b| b.end_date).max()
}

/// Last day of a window opened on `start`, clipped to `tab_end`
pub fn window_end(start: NaiveDate, interval_days: i32, tab_end: NaiveDate) -> NaiveDate {
    let span = u64::try_from(interval_days.max(1) - 1).unwrap_or(0);
    start
        .checked_add_days(Days::new(span))
        .map_or(tab_end, |end| end.min(tab_end))
}

/// Decide which bill receives an order placed on `today`
///
/// `latest` is the selector's candidate (see `latest_first`) and
/// `furthest_end` the latest end date over all of the tab's bills.
pub fn plan_target_bill(
    tab: &TabSettings,
    latest: Option<&Bill>,
    furthest_end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<BillPlan, BillingError> {
    if today < tab.start_date || today > tab.end_date {
        return Err(BillingError::NotActive {
            start_date: tab.start_date,
            end_date: tab.end_date,
        });
    }

    let mut start_date = match latest {
        None => tab.start_date,
        Some(bill) if !bill.is_paid && bill.covers(today) => return Ok(BillPlan::Reuse(bill.id)),
        Some(bill) => furthest_end.map_or(bill.end_date, |end| end.max(bill.end_date)),
    };

    let mut end_date = window_end(start_date, tab.billing_interval_days, tab.end_date);
    if end_date < start_date {
        return Err(BillingError::HorizonExhausted {
            tab_end: tab.end_date,
        });
    }

    // Skip empty windows until one covers today; today <= tab end bounds the walk
    while end_date < today {
        start_date = if end_date > start_date {
            end_date
        } else {
            match end_date.succ_opt() {
                Some(next) => next,
                None => break,
            }
        };
        end_date = window_end(start_date, tab.billing_interval_days, tab.end_date);
    }

    Ok(BillPlan::Create {
        start_date,
        end_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use rust_decimal::Decimal;
    use shared::models::{PaymentMethod, VerificationMethod};

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    }

    fn tab(interval: i32, end: NaiveDate) -> TabSettings {
        TabSettings {
            payment_method: PaymentMethod::InPerson,
            organization: "Chemistry".into(),
            display_name: "Chem Lab".into(),
            start_date: day(0),
            end_date: end,
            daily_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            daily_end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            active_days_of_wk: 127,
            dollar_limit_per_order: Decimal::ZERO,
            verification_method: VerificationMethod::Email,
            payment_details: String::new(),
            billing_interval_days: interval,
        }
    }

    fn bill(id: i64, start: u64, end: u64, is_paid: bool) -> Bill {
        Bill {
            shop_id: 1,
            tab_id: 1,
            id,
            start_date: day(start),
            end_date: day(end),
            is_paid,
        }
    }

    #[test]
    fn test_first_bill_spans_one_interval() {
        let plan = plan_target_bill(&tab(7, day(365)), None, None, day(0)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(0),
                end_date: day(6)
            }
        );
    }

    #[test]
    fn test_first_bill_clipped_to_tab_end() {
        let plan = plan_target_bill(&tab(30, day(9)), None, None, day(2)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(0),
                end_date: day(9)
            }
        );
    }

    #[test]
    fn test_open_bill_reused_on_both_edges() {
        let current = bill(4, 0, 6, false);
        let settings = tab(7, day(365));
        assert_eq!(
            plan_target_bill(&settings, Some(&current), None, day(0)).unwrap(),
            BillPlan::Reuse(4)
        );
        assert_eq!(
            plan_target_bill(&settings, Some(&current), None, day(6)).unwrap(),
            BillPlan::Reuse(4)
        );
    }

    #[test]
    fn test_paid_bill_gets_successor_from_its_end() {
        let paid = bill(4, 0, 6, true);
        let plan = plan_target_bill(&tab(7, day(365)), Some(&paid), None, day(6)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(6),
                end_date: day(12)
            }
        );
    }

    #[test]
    fn test_elapsed_bill_gets_successor() {
        let elapsed = bill(4, 0, 6, false);
        let plan = plan_target_bill(&tab(7, day(10)), Some(&elapsed), None, day(8)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(6),
                end_date: day(10)
            }
        );
    }

    #[test]
    fn test_successor_starts_after_newer_paid_bill() {
        // An older window is still unpaid while a newer one was settled early
        let stale = bill(2, 6, 12, false);
        let settled = bill(3, 12, 14, true);
        let bills = [bill(1, 0, 6, true), stale, settled];
        let latest = latest_bill(&bills);
        assert_eq!(latest.map(|b| b.id), Some(2));

        let plan =
            plan_target_bill(&tab(7, day(365)), latest, furthest_end(&bills), day(15)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(14),
                end_date: day(20)
            }
        );
    }

    #[test]
    fn test_successor_past_tab_end_is_rejected() {
        // Tab end moved before the last window closed
        let paid = bill(4, 0, 6, true);
        let err = plan_target_bill(&tab(7, day(3)), Some(&paid), None, day(2)).unwrap_err();
        assert_eq!(err, BillingError::HorizonExhausted { tab_end: day(3) });
    }

    #[test]
    fn test_orders_outside_tab_range_are_rejected() {
        let mut settings = tab(7, day(30));
        settings.start_date = day(5);
        let not_active = BillingError::NotActive {
            start_date: day(5),
            end_date: day(30),
        };

        assert_eq!(plan_target_bill(&settings, None, None, day(4)), Err(not_active));
        let last = bill(9, 26, 30, false);
        assert_eq!(
            plan_target_bill(&settings, Some(&last), Some(day(30)), day(31)),
            Err(not_active)
        );
        assert_eq!(
            plan_target_bill(&settings, Some(&last), Some(day(30)), day(30)),
            Ok(BillPlan::Reuse(9))
        );
    }

    #[test]
    fn test_successor_skips_empty_windows() {
        let elapsed = bill(4, 0, 6, false);
        let plan = plan_target_bill(&tab(7, day(365)), Some(&elapsed), None, day(20)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(18),
                end_date: day(24)
            }
        );
    }

    #[test]
    fn test_late_first_order_opens_window_covering_today() {
        let plan = plan_target_bill(&tab(7, day(365)), None, None, day(9)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(6),
                end_date: day(12)
            }
        );
    }

    #[test]
    fn test_single_day_windows_advance_daily() {
        let yesterday = bill(4, 3, 3, false);
        let plan = plan_target_bill(&tab(1, day(365)), Some(&yesterday), None, day(4)).unwrap();
        assert_eq!(
            plan,
            BillPlan::Create {
                start_date: day(4),
                end_date: day(4)
            }
        );
    }

    #[test]
    fn test_latest_prefers_unpaid_then_latest_end() {
        let bills = [
            bill(1, 0, 6, true),
            bill(2, 6, 12, false),
            bill(3, 12, 18, true),
            bill(4, 3, 9, false),
        ];
        assert_eq!(latest_bill(&bills).map(|b| b.id), Some(2));

        let paid_only = [bill(1, 0, 6, true), bill(3, 12, 18, true)];
        assert_eq!(latest_bill(&paid_only).map(|b| b.id), Some(3));
        assert!(latest_bill(&Vec::<Bill>::new()).is_none());
    }

    #[test]
    fn test_window_end_single_day_interval() {
        assert_eq!(window_end(day(3), 1, day(100)), day(3));
    }
}
