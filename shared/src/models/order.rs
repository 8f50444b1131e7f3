//! Bill order payloads

use serde::{Deserialize, Serialize};

/// Variant quantity nested under an ordered item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOrder {
    pub id: i64,
    pub quantity: i32,
}

/// Item quantity of an order submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOrder {
    pub id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub variants: Vec<VariantOrder>,
}

/// Add-order / remove-order payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOrderCreate {
    pub items: Vec<ItemOrder>,
}

/// Bill that received an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub bill_id: i64,
}
