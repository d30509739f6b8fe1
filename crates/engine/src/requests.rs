//! Inbound request types for the engine.
//!
//! Identifying fields are optional on purpose: presence is part of the
//! validation sequence (`MissingRequiredFields`), not of deserialization.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, ShopId, UserId};
use domain::OrderStatus;

/// A request to create an order and reserve stock.
#[derive(Debug, Clone, Default)]
pub struct CreateOrderRequest {
    pub user_id: Option<UserId>,
    pub shop_id: Option<ShopId>,
    pub product_id: Option<ProductId>,
    pub quantity: Option<i32>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub unit_price: Option<Money>,
    pub total_price: Option<Money>,
}

/// Parameters of a shop or admin order listing.
#[derive(Debug, Clone, Default)]
pub struct OrderListQuery {
    /// Required for shop-operator listings, optional for admins.
    pub shop_id: Option<ShopId>,
    pub status: Option<OrderStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    /// Zero-based page number; defaults to 0.
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}
