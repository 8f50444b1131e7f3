//! Service layer

pub mod tab_service;
pub mod validation;

pub use tab_service::TabService;
