//! The engine error taxonomy.
//!
//! Every variant except [`EngineError::Internal`] is a recovered
//! validation failure: callers receive it as a typed result with an
//! external code and message, never as a transport-level fault.

use common::{OrderId, ProductId, ShopId};
use domain::StatusParseError;
use market_store::StoreError;
use thiserror::Error;

/// Errors returned by the order lifecycle engine and query service.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input (bad pickup time, price mismatch, bad sort field).
    #[error("{0}")]
    InvalidRequest(String),

    /// One or more identifying fields was absent.
    #[error("Missing required fields")]
    MissingRequiredFields,

    /// Quantity outside the policy's allowed range.
    #[error("Quantity must be between {min} and {max}")]
    InvalidQuantity { min: i32, max: i32 },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product does not belong to shop")]
    ProductNotBelongToShop,

    /// The product exists but is not listed as active.
    #[error("Product is not available")]
    ProductNotAvailable,

    #[error("Shop not found: {0}")]
    ShopNotFound(ShopId),

    #[error("Shop is not active")]
    ShopNotActive,

    /// Requested quantity exceeds `quantity_available - quantity_pending`.
    #[error("Insufficient stock")]
    InsufficientStock,

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Ownership or shop-membership violation.
    #[error("Forbidden")]
    Forbidden,

    /// Illegal transition, or a status code that does not parse.
    #[error("{0}")]
    InvalidOrderStatus(String),

    #[error("Only pending orders can be cancelled")]
    OrderCannotBeCancelled,

    #[error("Page number must be >= 0")]
    InvalidPageNumber,

    /// Unexpected persistence failure; the one category that indicates a
    /// bug or infrastructure fault rather than a rejected request.
    #[error("Internal error: {0}")]
    Internal(#[from] StoreError),
}

impl EngineError {
    /// The external code string carried by the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidRequest(_)
            | EngineError::MissingRequiredFields
            | EngineError::InvalidQuantity { .. }
            | EngineError::ProductNotBelongToShop
            | EngineError::ProductNotAvailable
            | EngineError::ShopNotActive
            | EngineError::InsufficientStock
            | EngineError::InvalidOrderStatus(_)
            | EngineError::OrderCannotBeCancelled
            | EngineError::InvalidPageNumber => "400",
            EngineError::Forbidden => "403",
            EngineError::ProductNotFound(_)
            | EngineError::ShopNotFound(_)
            | EngineError::OrderNotFound(_) => "404",
            EngineError::Internal(_) => "500",
        }
    }
}

impl From<StatusParseError> for EngineError {
    fn from(err: StatusParseError) -> Self {
        EngineError::InvalidOrderStatus(err.to_string())
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(EngineError::InsufficientStock.code(), "400");
        assert_eq!(EngineError::Forbidden.code(), "403");
        assert_eq!(EngineError::OrderNotFound(OrderId::new(1)).code(), "404");
        assert_eq!(
            EngineError::Internal(StoreError::Unavailable("down".into())).code(),
            "500"
        );
    }

    #[test]
    fn test_status_parse_error_maps_to_invalid_order_status() {
        let err: EngineError = domain::OrderStatus::from_code("x").unwrap_err().into();
        assert!(matches!(err, EngineError::InvalidOrderStatus(_)));
        assert_eq!(err.code(), "400");
    }

    #[test]
    fn test_messages_match_external_wording() {
        assert_eq!(
            EngineError::InvalidQuantity { min: 1, max: 20 }.to_string(),
            "Quantity must be between 1 and 20"
        );
        assert_eq!(
            EngineError::OrderCannotBeCancelled.to_string(),
            "Only pending orders can be cancelled"
        );
    }
}
