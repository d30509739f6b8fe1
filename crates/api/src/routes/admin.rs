//! Administrator endpoints: unrestricted listing, generic status updates,
//! and the confirm shortcut.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use common::OrderId;
use domain::{Order, OrderStatus};
use engine::{Page, ShopOrderDetails};
use market_store::MarketStore;

use crate::envelope::Envelope;
use crate::identity;
use crate::routes::orders::AppState;
use crate::routes::shop::{ShopOrdersParams, UpdateStatusBody, to_list_query};

/// GET /admin/orders — paged listing; the shop filter is optional.
pub async fn list<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(params): Query<ShopOrdersParams>,
) -> Envelope<Page<ShopOrderDetails>> {
    if !identity::is_admin(&headers) {
        return Envelope::unauthorized();
    }
    let query = match to_list_query(params) {
        Ok(query) => query,
        Err(err) => return Envelope::error("400", err.to_string()),
    };

    match state.engine.admin_orders(query).await {
        Ok(page) => Envelope::success(page),
        Err(err) => err.into(),
    }
}

/// PUT /orders/{id}/status — generic status update.
pub async fn update_status<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusBody>,
) -> Envelope<Order> {
    if !identity::is_admin(&headers) {
        tracing::warn!(order_id = id, "unauthorized status update");
        return Envelope::unauthorized();
    }
    let Some(raw) = body.status else {
        return Envelope::error("400", "Status is required");
    };
    let new_status = match OrderStatus::from_code(&raw) {
        Ok(status) => status,
        Err(err) => return Envelope::error("400", err.to_string()),
    };

    match state
        .engine
        .update_order_status(OrderId::new(id), new_status)
        .await
    {
        Ok(order) => Envelope::success(order),
        Err(err) => err.into(),
    }
}

/// POST /orders/{id}/confirm — the `PENDING -> COMPLETED` shortcut.
pub async fn confirm<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Envelope<Order> {
    if !identity::is_admin(&headers) {
        return Envelope::unauthorized();
    }

    match state.engine.confirm_order(OrderId::new(id)).await {
        Ok(order) => Envelope::success(order),
        Err(err) => err.into(),
    }
}
