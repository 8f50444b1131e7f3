//! API routes for tab-server

pub mod health;
pub mod tabs;

use std::time::Duration;

use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use http::{HeaderName, HeaderValue, StatusCode};
use shared::error::AppError;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::session_auth::session_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<Json<T>, AppError>;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// UUID v4 request ids
#[derive(Clone, Copy, Default)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the combined router
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let shop_tabs = Router::new()
        .route(
            "/api/shops/{shop_id}/tabs",
            post(tabs::create_tab).get(tabs::list_tabs),
        )
        .route(
            "/api/shops/{shop_id}/tabs/{tab_id}",
            get(tabs::get_tab).patch(tabs::submit_update),
        )
        .route(
            "/api/shops/{shop_id}/tabs/{tab_id}/verification-list",
            axum::routing::put(tabs::set_verification_list),
        )
        .route(
            "/api/shops/{shop_id}/tabs/{tab_id}/approve",
            post(tabs::approve_tab),
        )
        .route("/api/shops/{shop_id}/tabs/{tab_id}/close", post(tabs::close_tab))
        .route(
            "/api/shops/{shop_id}/tabs/{tab_id}/add-order",
            post(tabs::add_order),
        )
        .route(
            "/api/shops/{shop_id}/tabs/{tab_id}/remove-order",
            post(tabs::remove_order),
        )
        .route(
            "/api/shops/{shop_id}/tabs/{tab_id}/bills/{bill_id}/close",
            post(tabs::close_bill),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_auth_middleware,
        ))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health_check))
        .merge(shop_tabs)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, XRequestId))
        .with_state(state)
}
