//! Per-product rolling sales counters.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

/// Rolling counters of completed-order volume, one row per product.
///
/// Updated by an upsert-style increment when an order completes. Best
/// effort: an update failure is logged and never rolls back the order
/// transition that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesStats {
    pub product_id: ProductId,
    pub total_quantity_sold: i64,
    pub total_orders: i64,
    pub last_sold_at: Option<DateTime<Utc>>,
}
