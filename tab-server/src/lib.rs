//! tab-server: running tabs, billing cycles and the order ledger
//!
//! - Tab lifecycle with staged updates awaiting shop approval
//! - Lazily created, non-overlapping billing periods per tab
//! - Per-bill item and variant quantities merged from order submissions
//! - PostgreSQL storage with an in-memory store for development and tests

pub mod api;
pub mod auth;
pub mod billing;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod reconcile;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use services::TabService;
pub use state::AppState;
