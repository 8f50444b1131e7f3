//! Tab Model

use super::UnknownVariant;
use super::bill::BillDetail;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Tab lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStatus {
    /// Created or updated, waiting for the shop to approve
    AwaitingApproval,
    Confirmed,
    /// Terminal
    Closed,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabStatus::AwaitingApproval => "awaiting_approval",
            TabStatus::Confirmed => "confirmed",
            TabStatus::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TabStatus::Closed)
    }
}

impl FromStr for TabStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_approval" => Ok(TabStatus::AwaitingApproval),
            "confirmed" => Ok(TabStatus::Confirmed),
            "closed" => Ok(TabStatus::Closed),
            other => Err(UnknownVariant {
                kind: "tab status",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TabStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the tab is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    InPerson,
    /// Internal department account string
    Chartstring,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::InPerson => "in_person",
            PaymentMethod::Chartstring => "chartstring",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_person" => Ok(PaymentMethod::InPerson),
            "chartstring" => Ok(PaymentMethod::Chartstring),
            other => Err(UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a customer proves they may order against the tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// Only emails on the verification list
    Specify,
    Voucher,
    /// Any email in the organization's domain
    Email,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::Specify => "specify",
            VerificationMethod::Voucher => "voucher",
            VerificationMethod::Email => "email",
        }
    }
}

impl FromStr for VerificationMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "specify" => Ok(VerificationMethod::Specify),
            "voucher" => Ok(VerificationMethod::Voucher),
            "email" => Ok(VerificationMethod::Email),
            other => Err(UnknownVariant {
                kind: "verification method",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Editable tab configuration
///
/// Shared by create payloads, staged updates and the live tab, so approval
/// can copy a staged record onto the tab field for field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabSettings {
    pub payment_method: PaymentMethod,
    pub organization: String,
    pub display_name: String,
    /// First day orders may be placed (inclusive)
    pub start_date: NaiveDate,
    /// Last day orders may be placed (inclusive); no bill extends past it
    pub end_date: NaiveDate,
    pub daily_start_time: NaiveTime,
    pub daily_end_time: NaiveTime,
    /// Bit 0 = Sunday ... bit 6 = Saturday
    pub active_days_of_wk: i16,
    pub dollar_limit_per_order: Decimal,
    pub verification_method: VerificationMethod,
    #[serde(default)]
    pub payment_details: String,
    pub billing_interval_days: i32,
}

/// Create tab payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabCreate {
    #[serde(flatten)]
    pub settings: TabSettings,
    #[serde(default)]
    pub verification_list: Vec<String>,
    #[serde(default)]
    pub location_ids: Vec<i64>,
}

/// Update tab payload (staged until approval)
///
/// Membership lists, when present, are applied to the live tab immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabUpdate {
    #[serde(flatten)]
    pub settings: TabSettings,
    pub verification_list: Option<Vec<String>>,
    pub location_ids: Option<Vec<i64>>,
}

/// Tab entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub shop_id: i64,
    pub id: i64,
    pub owner_id: Uuid,
    pub status: TabStatus,
    #[serde(flatten)]
    pub settings: TabSettings,
}

/// Staged replacement of a tab's configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpdate {
    #[serde(flatten)]
    pub settings: TabSettings,
    #[serde(default)]
    pub verification_list: Vec<String>,
}

/// Single tab with everything a shop or owner needs to review it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabOverview {
    #[serde(flatten)]
    pub tab: Tab,
    pub pending_update: Option<PendingUpdate>,
    /// Any bill still unpaid
    pub has_open_balance: bool,
    /// Ordered by start date
    pub bills: Vec<BillDetail>,
    pub verification_list: Vec<String>,
    pub location_ids: Vec<i64>,
}

/// Row of the per-shop tab listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabSummary {
    #[serde(flatten)]
    pub tab: Tab,
    pub has_pending_update: bool,
    pub has_open_balance: bool,
    pub verification_list: Vec<String>,
}
