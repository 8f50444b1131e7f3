//! Data models
//!
//! Shared between tab-server and its API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL); shop and tab form a compound key.

pub mod bill;
pub mod order;
pub mod tab;

// Re-exports
pub use bill::*;
pub use order::*;
pub use tab::*;

/// A stored text value did not match any variant of a domain enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
