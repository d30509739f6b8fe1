//! Shared primitives for the marketplace: typed identifiers and money.

pub mod ids;
pub mod money;

pub use ids::{OperatorId, OrderId, ProductId, ShopId, UserId};
pub use money::Money;
