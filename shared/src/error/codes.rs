//! Unified error codes for the tab service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Tab errors
//! - 5xxx: Bill / order ledger errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 4xxx: Tab ====================
    /// Tab not found
    TabNotFound = 4001,
    /// Tab is closed
    TabClosed = 4002,
    /// Tab date range is invalid
    TabInvalidDateRange = 4003,
    /// Tab billing interval is invalid
    TabInvalidBillingInterval = 4004,
    /// Verification email is invalid
    TabInvalidVerificationEmail = 4005,
    /// Order placed outside the tab's date range
    TabNotActive = 4006,

    // ==================== 5xxx: Bill / Order ====================
    /// Bill not found
    BillNotFound = 5001,
    /// No billing window left before the tab end date
    BillingHorizonExhausted = 5002,
    /// Order contains no items
    OrderEmpty = 5003,
    /// Order quantity out of range
    OrderInvalidQuantity = 5004,
    /// Removal exceeds the quantity on the bill
    OrderInsufficientQuantity = 5005,
    /// Accumulated quantity no longer fits a bill line
    OrderQuantityOverflow = 5006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Tab
            ErrorCode::TabNotFound => "Tab not found",
            ErrorCode::TabClosed => "Tab is closed",
            ErrorCode::TabInvalidDateRange => "Tab start date must not be after its end date",
            ErrorCode::TabInvalidBillingInterval => {
                "Billing interval must be between 1 and 365 days"
            }
            ErrorCode::TabInvalidVerificationEmail => "Verification email is invalid",
            ErrorCode::TabNotActive => "Tab does not accept orders outside its date range",

            // Bill / Order
            ErrorCode::BillNotFound => "Bill not found",
            ErrorCode::BillingHorizonExhausted => {
                "No billing window remains before the tab end date"
            }
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::OrderInvalidQuantity => "Order quantity is out of range",
            ErrorCode::OrderInsufficientQuantity => "Removal exceeds the quantity on the bill",
            ErrorCode::OrderQuantityOverflow => "Quantity exceeds the capacity of a bill line",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Tab
            4001 => Ok(ErrorCode::TabNotFound),
            4002 => Ok(ErrorCode::TabClosed),
            4003 => Ok(ErrorCode::TabInvalidDateRange),
            4004 => Ok(ErrorCode::TabInvalidBillingInterval),
            4005 => Ok(ErrorCode::TabInvalidVerificationEmail),
            4006 => Ok(ErrorCode::TabNotActive),

            // Bill / Order
            5001 => Ok(ErrorCode::BillNotFound),
            5002 => Ok(ErrorCode::BillingHorizonExhausted),
            5003 => Ok(ErrorCode::OrderEmpty),
            5004 => Ok(ErrorCode::OrderInvalidQuantity),
            5005 => Ok(ErrorCode::OrderInsufficientQuantity),
            5006 => Ok(ErrorCode::OrderQuantityOverflow),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
