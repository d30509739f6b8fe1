//! Typed wrappers over database-generated integer identifiers.
//!
//! Every entity id is an `i64` assigned by the storage layer. Wrapping them
//! prevents mixing an order id with a product id in an engine call.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying integer.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of an order row.
    OrderId
);
define_id!(
    /// Identifier of a customer account.
    UserId
);
define_id!(
    /// Identifier of a shop.
    ShopId
);
define_id!(
    /// Identifier of a product listing.
    ProductId
);
define_id!(
    /// Identifier of a back-office operator account.
    OperatorId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_accessors() {
        let id = OrderId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_conversions_roundtrip() {
        let id: ProductId = 7i64.into();
        let raw: i64 = id.into();
        assert_eq!(raw, 7);
    }

    #[test]
    fn test_serialization_is_transparent() {
        let id = ShopId::new(12);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "12");
        let back: ShopId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
