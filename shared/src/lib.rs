//! Shared types for the tab service
//!
//! Domain models and the unified error system used by tab-server and its
//! API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
