//! Order lifecycle engine and query service for the marketplace core.
//!
//! [`OrderEngine`] owns the order state machine: it validates creation
//! requests, reserves stock, executes status transitions with their
//! ledger effects, and keeps the sales aggregate as a best-effort side
//! effect. The query half serves customer, shop-operator, and admin
//! listings with membership authorization and batch enrichment.

pub mod engine;
pub mod error;
pub mod page;
pub mod query;
pub mod requests;

pub use engine::OrderEngine;
pub use error::{EngineError, Result};
pub use page::Page;
pub use query::{PopularProduct, ShopOrderDetails};
pub use requests::{CreateOrderRequest, OrderListQuery};
