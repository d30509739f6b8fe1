//! Status codes for orders, products, and shops.
//!
//! The database and the public API both speak the legacy single-character
//! codes (`"1"`..`"4"` for orders, `"0"`/`"1"` for products and shops).
//! Inside the system every status is an enum; the codes appear only at the
//! serialization boundary.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Raised when an order status code cannot be mapped to a known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order status code: {code:?}")]
pub struct StatusParseError {
    pub code: String,
}

/// The lifecycle status of an order.
///
/// Transitions:
/// ```text
/// PENDING --(confirm/complete)--> COMPLETED   [terminal]
/// PENDING --(cancel)------------> CANCELLED   [terminal]
/// PENDING --(generic update)----> CONFIRMED
/// ```
///
/// Only `Pending` has outgoing transitions; `Completed` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl OrderStatus {
    /// Returns the external wire/storage code.
    pub fn as_code(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "1",
            OrderStatus::Confirmed => "2",
            OrderStatus::Cancelled => "3",
            OrderStatus::Completed => "4",
        }
    }

    /// Parses an external code, trimming surrounding whitespace.
    pub fn from_code(code: &str) -> Result<Self, StatusParseError> {
        match code.trim() {
            "1" => Ok(OrderStatus::Pending),
            "2" => Ok(OrderStatus::Confirmed),
            "3" => Ok(OrderStatus::Cancelled),
            "4" => Ok(OrderStatus::Completed),
            other => Err(StatusParseError {
                code: other.to_string(),
            }),
        }
    }

    /// Returns true if no further transition is permitted from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns true if a transition to any status is permitted.
    ///
    /// Every target is reachable from `Pending`; nothing leaves the other
    /// statuses through the generic update path.
    pub fn allows_transition(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Completed => "Completed",
        }
    }

    /// Human-readable label shown in shop and admin order listings.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending confirmation",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        OrderStatus::from_code(&code).map_err(D::Error::custom)
    }
}

/// Whether a product is offered for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            ProductStatus::Active => "1",
            ProductStatus::Inactive => "0",
        }
    }

    /// Parses an external code. Anything other than the active code counts
    /// as inactive, matching how the listing flag has always behaved.
    pub fn from_code(code: &str) -> Self {
        if code.trim() == "1" {
            ProductStatus::Active
        } else {
            ProductStatus::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }
}

impl Serialize for ProductStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

impl<'de> Deserialize<'de> for ProductStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(ProductStatus::from_code(&code))
    }
}

/// Whether a shop is open for business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShopStatus {
    Active,
    Inactive,
}

impl ShopStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            ShopStatus::Active => "1",
            ShopStatus::Inactive => "0",
        }
    }

    /// Parses an external code; unknown codes count as inactive.
    pub fn from_code(code: &str) -> Self {
        if code.trim() == "1" {
            ShopStatus::Active
        } else {
            ShopStatus::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ShopStatus::Active)
    }
}

impl Serialize for ShopStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

impl<'de> Deserialize<'de> for ShopStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(ShopStatus::from_code(&code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_codes_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Cancelled,
            OrderStatus::Completed,
        ] {
            assert_eq!(OrderStatus::from_code(status.as_code()).unwrap(), status);
        }
    }

    #[test]
    fn test_order_status_parse_trims_whitespace() {
        assert_eq!(OrderStatus::from_code(" 1 ").unwrap(), OrderStatus::Pending);
    }

    #[test]
    fn test_order_status_parse_rejects_unknown_codes() {
        let err = OrderStatus::from_code("9").unwrap_err();
        assert_eq!(err.code, "9");
        assert!(OrderStatus::from_code("").is_err());
        assert!(OrderStatus::from_code("pending").is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn test_only_pending_allows_transitions() {
        assert!(OrderStatus::Pending.allows_transition());
        assert!(!OrderStatus::Confirmed.allows_transition());
        assert!(!OrderStatus::Cancelled.allows_transition());
        assert!(!OrderStatus::Completed.allows_transition());
    }

    #[test]
    fn test_labels() {
        assert_eq!(OrderStatus::Pending.label(), "Pending confirmation");
        assert_eq!(OrderStatus::Completed.label(), "Completed");
    }

    #[test]
    fn test_order_status_serializes_as_code() {
        let json = serde_json::to_string(&OrderStatus::Completed).unwrap();
        assert_eq!(json, "\"4\"");
        let back: OrderStatus = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn test_product_status_lenient_parse() {
        assert!(ProductStatus::from_code("1").is_active());
        assert!(!ProductStatus::from_code("0").is_active());
        assert!(!ProductStatus::from_code("banana").is_active());
        assert!(!ProductStatus::from_code("").is_active());
    }

    #[test]
    fn test_shop_status_lenient_parse() {
        assert!(ShopStatus::from_code(" 1").is_active());
        assert!(!ShopStatus::from_code("2").is_active());
    }
}
