//! Unified service-layer error type for tab-server
//!
//! `ServiceError` bridges store errors (`StoreError`, `sqlx::Error`) and the
//! API-layer error (`AppError`), so handlers and the service can use `?`
//! without hand-written `map_err` logging at every call site.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::StoreError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error, two variants.
///
/// - `Db`: storage/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TabNotFound { shop_id, tab_id } => {
                ServiceError::App(AppError::tab_not_found(shop_id, tab_id))
            }
            StoreError::BillNotFound {
                shop_id,
                tab_id,
                bill_id,
            } => ServiceError::App(AppError::bill_not_found(shop_id, tab_id, bill_id)),
            StoreError::TabClosed { shop_id, tab_id } => ServiceError::App(
                AppError::new(ErrorCode::TabClosed)
                    .with_detail("shop_id", shop_id)
                    .with_detail("tab_id", tab_id),
            ),
            StoreError::InsufficientQuantity {
                item_id,
                variant_id,
            } => {
                let mut err = AppError::new(ErrorCode::OrderInsufficientQuantity)
                    .with_detail("item_id", item_id);
                if let Some(variant_id) = variant_id {
                    err = err.with_detail("variant_id", variant_id);
                }
                ServiceError::App(err)
            }
            StoreError::BillingHorizonExhausted { tab_end } => ServiceError::App(
                AppError::new(ErrorCode::BillingHorizonExhausted)
                    .with_detail("tab_end_date", tab_end.to_string()),
            ),
            StoreError::TabNotActive {
                start_date,
                end_date,
            } => ServiceError::App(
                AppError::new(ErrorCode::TabNotActive)
                    .with_detail("start_date", start_date.to_string())
                    .with_detail("end_date", end_date.to_string()),
            ),
            StoreError::QuantityOverflow {
                item_id,
                variant_id,
            } => {
                let mut err = AppError::new(ErrorCode::OrderQuantityOverflow);
                if let Some(item_id) = item_id {
                    err = err.with_detail("item_id", item_id);
                }
                if let Some(variant_id) = variant_id {
                    err = err.with_detail("variant_id", variant_id);
                }
                ServiceError::App(err)
            }
            StoreError::Database(e) => ServiceError::Db(e.into()),
            e @ StoreError::Corrupt(_) => ServiceError::Db(e.into()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
