//! Order entity: the unit of a stock reservation.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, ShopId, UserId};
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;

/// A customer's reservation of a product for pickup.
///
/// Identity fields (`user_id`, `shop_id`, `product_id`) are immutable once
/// created; the record is mutated only through status transitions and is
/// never physically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub status: OrderStatus,
    pub pickup_time: DateTime<Utc>,
    /// Pickup time plus the policy's expiry window.
    pub expires_at: DateTime<Utc>,
    /// Price snapshot taken at creation time.
    pub unit_price: Money,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated order awaiting insertion; the store assigns the id and
/// timestamps and sets the status to [`OrderStatus::Pending`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub pickup_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub unit_price: Money,
    pub total_price: Money,
}
