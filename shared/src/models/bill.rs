//! Bill (billing period) Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One invoicing window of a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Bill {
    pub shop_id: i64,
    pub tab_id: i64,
    pub id: i64,
    pub start_date: NaiveDate,
    /// Inclusive; moved to the payment day when the bill is marked paid
    pub end_date: NaiveDate,
    pub is_paid: bool,
}

impl Bill {
    /// Whether `day` falls inside the window, both ends inclusive
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// Accumulated quantity of one variant of an ordered item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedVariant {
    pub variant_id: i64,
    pub quantity: i32,
}

/// Accumulated quantity of one item on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub item_id: i64,
    pub quantity: i32,
    pub variants: Vec<OrderedVariant>,
}

/// Bill with its order lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub items: Vec<OrderedItem>,
}
