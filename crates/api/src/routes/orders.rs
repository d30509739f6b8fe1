//! Customer-facing order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use common::{Money, OrderId, ProductId, ShopId};
use domain::{Order, OrderStatus};
use engine::{CreateOrderRequest, OrderEngine};
use market_store::MarketStore;
use serde::Deserialize;

use crate::envelope::Envelope;
use crate::identity;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub engine: OrderEngine<S>,
}

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub shop_id: Option<i64>,
    pub product_id: Option<i64>,
    pub quantity: Option<i32>,
    /// Absolute pickup time; wins over `pickup_in_minutes`.
    pub pickup_time: Option<DateTime<Utc>>,
    /// Pickup offset from now; defaults to the policy's pickup window.
    pub pickup_in_minutes: Option<i64>,
    pub unit_price_cents: Option<i64>,
    pub total_price_cents: Option<i64>,
}

#[derive(Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<String>,
}

/// Parses an optional status-code filter, treating blank as absent.
pub(crate) fn parse_status_filter(
    raw: Option<&str>,
) -> Result<Option<OrderStatus>, domain::StatusParseError> {
    match raw {
        None => Ok(None),
        Some(code) if code.trim().is_empty() => Ok(None),
        Some(code) => OrderStatus::from_code(code).map(Some),
    }
}

/// POST /orders — create an order, reserving stock.
pub async fn create<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderBody>,
) -> Envelope<Order> {
    let Some(user_id) = identity::user_id(&headers) else {
        tracing::warn!("unauthorized order creation attempt");
        return Envelope::unauthorized();
    };

    let policy = state.engine.policy();
    let pickup_time = match body.pickup_time {
        Some(time) => time,
        None => {
            let minutes = body
                .pickup_in_minutes
                .unwrap_or(policy.default_pickup_minutes);
            if minutes > policy.max_pickup_minutes {
                return Envelope::error(
                    "400",
                    format!(
                        "Pickup must be within {} minutes",
                        policy.max_pickup_minutes
                    ),
                );
            }
            Utc::now() + Duration::minutes(minutes)
        }
    };

    let req = CreateOrderRequest {
        user_id: Some(user_id),
        shop_id: body.shop_id.map(ShopId::new),
        product_id: body.product_id.map(ProductId::new),
        quantity: body.quantity,
        pickup_time: Some(pickup_time),
        unit_price: body.unit_price_cents.map(Money::from_cents),
        total_price: body.total_price_cents.map(Money::from_cents),
    };

    match state.engine.create_order(req).await {
        Ok(order) => Envelope::success(order),
        Err(err) => err.into(),
    }
}

/// GET /orders — the caller's own orders, newest first.
pub async fn list_mine<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(params): Query<ListOrdersParams>,
) -> Envelope<Vec<Order>> {
    let Some(user_id) = identity::user_id(&headers) else {
        return Envelope::unauthorized();
    };
    let status = match parse_status_filter(params.status.as_deref()) {
        Ok(status) => status,
        Err(err) => return Envelope::error("400", err.to_string()),
    };

    match state.engine.orders_for_user(user_id, status).await {
        Ok(orders) => Envelope::success(orders),
        Err(err) => err.into(),
    }
}

/// DELETE /orders/{id} — owner cancellation.
pub async fn cancel<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Envelope<Order> {
    let Some(user_id) = identity::user_id(&headers) else {
        tracing::warn!(order_id = id, "unauthorized cancel attempt");
        return Envelope::unauthorized();
    };

    match state.engine.cancel_order(OrderId::new(id), user_id).await {
        Ok(order) => Envelope::success(order),
        Err(err) => err.into(),
    }
}
