//! Set reconciliation and quantity merge rules
//!
//! Two modes share one contract: the persisted collection under a scope is
//! made equal to a target. Membership sets (verification emails, locations)
//! carry only keys. Order lines carry a signed quantity delta merged into the
//! stored quantity. The PostgreSQL store expresses these rules as bulk set
//! statements; the in-memory store applies them through the helpers below.

use shared::models::BillOrderCreate;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// What a removal does when it exceeds the stored quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Subtract as is; the stored quantity may go negative
    #[default]
    Unchecked,
    /// Fail the whole order without touching any line
    RejectIfInsufficient,
    /// Floor the stored quantity at zero
    ClampAtZero,
}

impl RemovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Unchecked => "unchecked",
            RemovalPolicy::RejectIfInsufficient => "reject_if_insufficient",
            RemovalPolicy::ClampAtZero => "clamp_at_zero",
        }
    }
}

impl FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unchecked" => Ok(RemovalPolicy::Unchecked),
            "reject_if_insufficient" => Ok(RemovalPolicy::RejectIfInsufficient),
            "clamp_at_zero" => Ok(RemovalPolicy::ClampAtZero),
            other => Err(format!("unknown order removal policy: {other}")),
        }
    }
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Add,
    Remove,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Add => "add",
            OrderDirection::Remove => "remove",
        }
    }
}

/// Why a delta could not be merged into its line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeError {
    /// Removal would leave a line below zero under `RejectIfInsufficient`
    Insufficient,
    /// The merged quantity does not fit a line
    Overflow,
}

/// Order quantities keyed by line, duplicates summed
///
/// Every variant key has its item key present as well, since variants travel
/// nested under the item they modify.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDeltas {
    pub items: BTreeMap<i64, i32>,
    pub variants: BTreeMap<(i64, i64), i32>,
}

impl OrderDeltas {
    /// Sum the order's lines per key; `None` when a sum overflows
    pub fn from_order(order: &BillOrderCreate) -> Option<Self> {
        let mut deltas = Self::default();
        for item in &order.items {
            let quantity = deltas.items.entry(item.id).or_insert(0);
            *quantity = quantity.checked_add(item.quantity)?;
            for variant in &item.variants {
                let quantity = deltas.variants.entry((item.id, variant.id)).or_insert(0);
                *quantity = quantity.checked_add(variant.quantity)?;
            }
        }
        Some(deltas)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Column-wise item rows for `UNNEST` staging
    pub fn item_columns(&self) -> (Vec<i64>, Vec<i32>) {
        self.items.iter().map(|(id, qty)| (*id, *qty)).unzip()
    }

    /// Column-wise variant rows for `UNNEST` staging
    pub fn variant_columns(&self) -> (Vec<i64>, Vec<i64>, Vec<i32>) {
        let mut item_ids = Vec::with_capacity(self.variants.len());
        let mut variant_ids = Vec::with_capacity(self.variants.len());
        let mut quantities = Vec::with_capacity(self.variants.len());
        for ((item_id, variant_id), qty) in &self.variants {
            item_ids.push(*item_id);
            variant_ids.push(*variant_id);
            quantities.push(*qty);
        }
        (item_ids, variant_ids, quantities)
    }
}

/// Merge one delta into a stored line
///
/// Returns the quantity to store, or `None` when the line stays absent
/// (removals never create lines). Quantities are `INTEGER` columns, so a
/// result outside `i32` is an error rather than a saturated value.
pub fn merge_quantity(
    stored: Option<i32>,
    delta: i32,
    direction: OrderDirection,
    policy: RemovalPolicy,
) -> Result<Option<i32>, MergeError> {
    match direction {
        OrderDirection::Add => {
            let next = stored.unwrap_or(0).checked_add(delta);
            next.map(Some).ok_or(MergeError::Overflow)
        }
        OrderDirection::Remove => {
            let current = match stored {
                Some(q) => q,
                None if policy == RemovalPolicy::RejectIfInsufficient => {
                    return Err(MergeError::Insufficient);
                }
                None => return Ok(None),
            };
            let next = current.checked_sub(delta).ok_or(MergeError::Overflow)?;
            match policy {
                RemovalPolicy::Unchecked => Ok(Some(next)),
                RemovalPolicy::RejectIfInsufficient if next < 0 => Err(MergeError::Insufficient),
                RemovalPolicy::RejectIfInsufficient => Ok(Some(next)),
                RemovalPolicy::ClampAtZero => Ok(Some(next.max(0))),
            }
        }
    }
}

/// Rows to insert and delete to turn `current` into `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDiff<T> {
    pub insert: Vec<T>,
    pub delete: Vec<T>,
}

impl<T> MembershipDiff<T> {
    pub fn is_noop(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }
}

pub fn membership_diff<T: Ord + Clone>(
    current: &BTreeSet<T>,
    target: &BTreeSet<T>,
) -> MembershipDiff<T> {
    MembershipDiff {
        insert: target.difference(current).cloned().collect(),
        delete: current.difference(target).cloned().collect(),
    }
}

/// Apply a membership diff in place
pub fn sync_membership<T: Ord + Clone>(current: &mut BTreeSet<T>, target: &BTreeSet<T>) {
    let diff = membership_diff(current, target);
    for key in diff.delete {
        current.remove(&key);
    }
    current.extend(diff.insert);
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ItemOrder, VariantOrder};

    fn item(id: i64, quantity: i32, variants: &[(i64, i32)]) -> ItemOrder {
        ItemOrder {
            id,
            quantity,
            variants: variants
                .iter()
                .map(|(id, quantity)| VariantOrder {
                    id: *id,
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn test_duplicate_lines_are_summed() {
        let order = BillOrderCreate {
            items: vec![
                item(7, 2, &[(70, 1)]),
                item(3, 1, &[]),
                item(7, 3, &[(70, 2), (71, 1)]),
            ],
        };
        let deltas = OrderDeltas::from_order(&order).unwrap();
        assert_eq!(deltas.items.get(&7), Some(&5));
        assert_eq!(deltas.items.get(&3), Some(&1));
        assert_eq!(deltas.variants.get(&(7, 70)), Some(&3));
        assert_eq!(deltas.variants.get(&(7, 71)), Some(&1));

        let (ids, qtys) = deltas.item_columns();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(qtys, vec![1, 5]);
    }

    #[test]
    fn test_add_creates_or_accumulates() {
        let add = |stored| merge_quantity(stored, 3, OrderDirection::Add, RemovalPolicy::Unchecked);
        assert_eq!(add(None), Ok(Some(3)));
        assert_eq!(add(Some(2)), Ok(Some(5)));
    }

    #[test]
    fn test_removal_never_creates_lines() {
        for policy in [RemovalPolicy::Unchecked, RemovalPolicy::ClampAtZero] {
            assert_eq!(merge_quantity(None, 1, OrderDirection::Remove, policy), Ok(None));
        }
        assert_eq!(
            merge_quantity(None, 1, OrderDirection::Remove, RemovalPolicy::RejectIfInsufficient),
            Err(MergeError::Insufficient)
        );
    }

    #[test]
    fn test_over_removal_per_policy() {
        let remove = |policy| merge_quantity(Some(2), 5, OrderDirection::Remove, policy);
        assert_eq!(remove(RemovalPolicy::Unchecked), Ok(Some(-3)));
        assert_eq!(remove(RemovalPolicy::ClampAtZero), Ok(Some(0)));
        assert_eq!(
            remove(RemovalPolicy::RejectIfInsufficient),
            Err(MergeError::Insufficient)
        );
    }

    #[test]
    fn test_overflow_is_an_error() {
        let unchecked = |stored, delta, direction| {
            merge_quantity(Some(stored), delta, direction, RemovalPolicy::Unchecked)
        };
        assert_eq!(
            unchecked(i32::MAX - 1, 2, OrderDirection::Add),
            Err(MergeError::Overflow)
        );
        assert_eq!(
            unchecked(i32::MIN + 1, 2, OrderDirection::Remove),
            Err(MergeError::Overflow)
        );
        assert_eq!(
            unchecked(i32::MAX - 2, 2, OrderDirection::Add),
            Ok(Some(i32::MAX))
        );

        let order = BillOrderCreate {
            items: vec![item(1, i32::MAX, &[]), item(1, 1, &[])],
        };
        assert!(OrderDeltas::from_order(&order).is_none());
    }

    #[test]
    fn test_exact_removal_reaches_zero() {
        for policy in [
            RemovalPolicy::Unchecked,
            RemovalPolicy::RejectIfInsufficient,
            RemovalPolicy::ClampAtZero,
        ] {
            assert_eq!(
                merge_quantity(Some(5), 5, OrderDirection::Remove, policy),
                Ok(Some(0))
            );
        }
    }

    #[test]
    fn test_membership_diff() {
        let current: BTreeSet<&str> = ["a", "b", "c"].into_iter().collect();
        let target: BTreeSet<&str> = ["b", "c", "d"].into_iter().collect();
        let diff = membership_diff(&current, &target);
        assert_eq!(diff.insert, vec!["d"]);
        assert_eq!(diff.delete, vec!["a"]);
        assert!(membership_diff(&target, &target).is_noop());
    }

    #[test]
    fn test_sync_to_subset_removes_only_extras() {
        let mut current: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
        let target: BTreeSet<i64> = [2].into_iter().collect();
        sync_membership(&mut current, &target);
        assert_eq!(current, target);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "Reject_If_Insufficient".parse::<RemovalPolicy>(),
            Ok(RemovalPolicy::RejectIfInsufficient)
        );
        assert!("strict".parse::<RemovalPolicy>().is_err());
        assert_eq!(RemovalPolicy::default(), RemovalPolicy::Unchecked);
    }
}
