//! Product entity with its inventory ledger fields.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, ShopId};
use serde::{Deserialize, Serialize};

use crate::status::ProductStatus;

/// A discounted listing offered by a shop.
///
/// `quantity_available` is a ceiling managed by the shop operator;
/// `quantity_pending` is the live reservation counter. Reservations never
/// decrement `quantity_available`: new orders are accepted while
/// `quantity_available - quantity_pending` covers the requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Money,
    pub original_price: Money,
    pub quantity_available: i32,
    /// Signed: the completion path releases without a floor.
    pub quantity_pending: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock still offerable to new orders.
    pub fn capacity(&self) -> i32 {
        self.quantity_available - self.quantity_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(available: i32, pending: i32) -> Product {
        Product {
            id: ProductId::new(1),
            shop_id: ShopId::new(1),
            name: "Day-old sourdough".to_string(),
            description: None,
            image_url: None,
            price: Money::from_cents(350),
            original_price: Money::from_cents(700),
            quantity_available: available,
            quantity_pending: pending,
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_capacity_subtracts_pending() {
        assert_eq!(product(10, 0).capacity(), 10);
        assert_eq!(product(10, 4).capacity(), 6);
        assert_eq!(product(10, 10).capacity(), 0);
    }

    #[test]
    fn test_capacity_with_negative_pending() {
        // A misused completion can drive pending below zero; capacity grows.
        assert_eq!(product(10, -2).capacity(), 12);
    }
}
