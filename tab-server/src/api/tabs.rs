//! Tab endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::error::ApiResponse;
use shared::models::{BillOrderCreate, OrderReceipt, TabCreate, TabOverview, TabSummary, TabUpdate};

use crate::auth::RequestContext;
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Serialize, Deserialize)]
pub struct TabCreated {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct VerificationListBody {
    pub emails: Vec<String>,
}

/// POST /api/shops/{shop_id}/tabs
pub async fn create_tab(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(shop_id): Path<i64>,
    Json(body): Json<TabCreate>,
) -> ApiResult<TabCreated> {
    let id = state.service.create_tab(&ctx, shop_id, body).await?;
    Ok(Json(TabCreated { id }))
}

/// GET /api/shops/{shop_id}/tabs
pub async fn list_tabs(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(shop_id): Path<i64>,
) -> ApiResult<Vec<TabSummary>> {
    let tabs = state.service.list_tabs(&ctx, shop_id).await?;
    Ok(Json(tabs))
}

/// GET /api/shops/{shop_id}/tabs/{tab_id}
pub async fn get_tab(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id)): Path<(i64, i64)>,
) -> ApiResult<TabOverview> {
    let overview = state.service.get_tab_overview(&ctx, shop_id, tab_id).await?;
    Ok(Json(overview))
}

/// PATCH /api/shops/{shop_id}/tabs/{tab_id}
pub async fn submit_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id)): Path<(i64, i64)>,
    Json(body): Json<TabUpdate>,
) -> ApiResult<ApiResponse<()>> {
    state
        .service
        .submit_update(&ctx, shop_id, tab_id, body)
        .await?;
    Ok(Json(ApiResponse::ok()))
}

/// PUT /api/shops/{shop_id}/tabs/{tab_id}/verification-list
pub async fn set_verification_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id)): Path<(i64, i64)>,
    Json(body): Json<VerificationListBody>,
) -> ApiResult<ApiResponse<()>> {
    state
        .service
        .set_verification_list(&ctx, shop_id, tab_id, &body.emails)
        .await?;
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/shops/{shop_id}/tabs/{tab_id}/approve
pub async fn approve_tab(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id)): Path<(i64, i64)>,
) -> ApiResult<ApiResponse<()>> {
    state.service.approve_tab(&ctx, shop_id, tab_id).await?;
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/shops/{shop_id}/tabs/{tab_id}/close
pub async fn close_tab(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id)): Path<(i64, i64)>,
) -> ApiResult<ApiResponse<()>> {
    state.service.close_tab(&ctx, shop_id, tab_id).await?;
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/shops/{shop_id}/tabs/{tab_id}/add-order
pub async fn add_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id)): Path<(i64, i64)>,
    Json(body): Json<BillOrderCreate>,
) -> ApiResult<OrderReceipt> {
    let bill_id = state
        .service
        .add_order(&ctx, shop_id, tab_id, &body)
        .await?;
    Ok(Json(OrderReceipt { bill_id }))
}

/// POST /api/shops/{shop_id}/tabs/{tab_id}/remove-order
pub async fn remove_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id)): Path<(i64, i64)>,
    Json(body): Json<BillOrderCreate>,
) -> ApiResult<OrderReceipt> {
    let bill_id = state
        .service
        .remove_order(&ctx, shop_id, tab_id, &body)
        .await?;
    Ok(Json(OrderReceipt { bill_id }))
}

/// POST /api/shops/{shop_id}/tabs/{tab_id}/bills/{bill_id}/close
pub async fn close_bill(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((shop_id, tab_id, bill_id)): Path<(i64, i64, i64)>,
) -> ApiResult<ApiResponse<()>> {
    state
        .service
        .mark_bill_paid(&ctx, shop_id, tab_id, bill_id)
        .await?;
    Ok(Json(ApiResponse::ok()))
}
