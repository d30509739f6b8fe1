//! Shop-operator endpoints: order listing and status updates, both gated
//! on shop membership.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use common::{OrderId, ShopId};
use engine::{OrderListQuery, Page, ShopOrderDetails};
use market_store::MarketStore;
use serde::Deserialize;

use crate::envelope::Envelope;
use crate::identity;
use crate::routes::orders::{AppState, parse_status_filter};

#[derive(Deserialize)]
pub struct ShopOrdersParams {
    pub shop_id: Option<i64>,
    pub status: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub status: Option<String>,
}

pub(crate) fn to_list_query(
    params: ShopOrdersParams,
) -> Result<OrderListQuery, domain::StatusParseError> {
    Ok(OrderListQuery {
        shop_id: params.shop_id.map(ShopId::new),
        status: parse_status_filter(params.status.as_deref())?,
        from_date: params.from_date,
        to_date: params.to_date,
        page: params.page,
        size: params.size,
        sort_by: params.sort_by,
        sort_direction: params.sort_direction,
    })
}

/// GET /shop/orders — paged listing of a shop's orders.
pub async fn list<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(params): Query<ShopOrdersParams>,
) -> Envelope<Page<ShopOrderDetails>> {
    let Some(operator) = identity::operator_id(&headers) else {
        return Envelope::unauthorized();
    };
    let query = match to_list_query(params) {
        Ok(query) => query,
        Err(err) => return Envelope::error("400", err.to_string()),
    };

    match state.engine.shop_orders(operator, query).await {
        Ok(page) => Envelope::success(page),
        Err(err) => err.into(),
    }
}

/// PUT /shop/orders/{id}/status — status update by a shop operator.
pub async fn update_status<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusBody>,
) -> Envelope<ShopOrderDetails> {
    let Some(operator) = identity::operator_id(&headers) else {
        tracing::warn!(order_id = id, "unauthorized shop status update");
        return Envelope::unauthorized();
    };
    let Some(raw) = body.status else {
        return Envelope::error("400", "Status is required");
    };
    let new_status = match domain::OrderStatus::from_code(&raw) {
        Ok(status) => status,
        Err(err) => return Envelope::error("400", err.to_string()),
    };

    let order_id = OrderId::new(id);
    match state
        .engine
        .update_order_status_for_operator(order_id, new_status, operator)
        .await
    {
        Ok(_) => match state.engine.shop_order_details(order_id).await {
            Ok(details) => Envelope::success(details),
            Err(err) => err.into(),
        },
        Err(err) => err.into(),
    }
}
