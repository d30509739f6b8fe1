//! The `MarketStore` trait: the persistence seam of the order core.
//!
//! Mutating operations are composite on purpose: reserving stock and
//! inserting the order, or transitioning a status and adjusting the
//! ledger, must commit or fail as one unit. Keeping each pair behind a
//! single call puts the transaction boundary where the atomicity
//! requirement lives instead of trusting every caller to open one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OperatorId, OrderId, ProductId, ShopId, UserId};
use domain::{Customer, NewOrder, Order, OrderStatus, Product, SalesStats, Shop};

use crate::error::Result;

/// Outcome of an atomic reserve-and-insert.
#[derive(Debug)]
pub enum ReserveOutcome {
    /// Capacity was held and the order row created.
    Created(Order),
    /// The conditional update matched no row: capacity was gone by commit
    /// time (or the product disappeared).
    InsufficientCapacity,
}

/// Ledger effect applied together with a status transition.
///
/// The three mutating variants are deliberately distinct operations, not
/// one function with a flag: the owner-cancellation path and the
/// status-update cancellation path have different, historically grown
/// accounting and must stay separately auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// No ledger change (e.g. `PENDING -> CONFIRMED`).
    None,
    /// Owner cancellation: release the reservation, floored at zero.
    /// `quantity_available` is not restored.
    ReleasePendingClamped { quantity: i32 },
    /// Completion: release the reservation without a floor. The counter
    /// may go negative if the transition is misused.
    ConsumePending { quantity: i32 },
    /// Status-update cancellation: return the units to the shelf
    /// (`quantity_available += q`) and release the reservation, unfloored.
    RestockAndRelease { quantity: i32 },
}

/// Field a paged order listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    PickupTime,
    TotalPrice,
}

impl SortField {
    /// Parses a whitelisted sort field, accepting both snake_case and the
    /// legacy camelCase spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created_at" | "createdAt" => Some(SortField::CreatedAt),
            "pickup_time" | "pickupTime" => Some(SortField::PickupTime),
            "total_price" | "totalPrice" => Some(SortField::TotalPrice),
            _ => None,
        }
    }

    /// The underlying column name.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::PickupTime => "pickup_time",
            SortField::TotalPrice => "total_price_cents",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc`, case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filter for shop/admin order listings. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub shop_id: Option<ShopId>,
    pub status: Option<OrderStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Zero-based page request with a whitelisted sort.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        self.page * self.size
    }
}

/// One page of orders plus the unpaged match count.
#[derive(Debug)]
pub struct PagedOrders {
    pub orders: Vec<Order>,
    pub total_elements: i64,
}

/// Persistence operations needed by the order lifecycle engine and the
/// query service.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>>;

    async fn shops_by_ids(&self, ids: &[ShopId]) -> Result<Vec<Shop>>;

    async fn customer(&self, id: UserId) -> Result<Option<Customer>>;

    async fn customers_by_ids(&self, ids: &[UserId]) -> Result<Vec<Customer>>;

    /// Shop-membership check consulted by shop-scoped paths.
    async fn is_shop_member(&self, operator: OperatorId, shop: ShopId) -> Result<bool>;

    /// All shops the operator belongs to.
    async fn shop_ids_for(&self, operator: OperatorId) -> Result<Vec<ShopId>>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Atomically holds capacity and inserts the order in one transaction.
    ///
    /// The capacity condition
    /// `quantity_available - quantity_pending >= quantity` is re-checked
    /// inside the same statement that increments `quantity_pending`, so
    /// two concurrent reservations cannot both take the last unit.
    async fn create_order(&self, order: NewOrder) -> Result<ReserveOutcome>;

    /// Atomically sets the order status and applies the ledger effect.
    ///
    /// The status update is guarded on `from`; returns `Ok(None)` when the
    /// order's current status no longer matches (a concurrent transition
    /// won), in which case nothing is written. The adjustment applies to
    /// the product row if it still exists.
    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        adjustment: StockAdjustment,
    ) -> Result<Option<Order>>;

    /// Upsert-increments the per-product sales aggregate.
    async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: i32,
        sold_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn sales_stats(&self, product_id: ProductId) -> Result<Option<SalesStats>>;

    /// Active products ranked by total quantity sold, descending.
    async fn popular_products(&self, limit: i64) -> Result<Vec<(Product, SalesStats)>>;

    /// A customer's orders, newest first, optionally filtered by status.
    async fn orders_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>>;

    /// Filtered, sorted, paged listing for shop and admin views.
    async fn orders_filtered(&self, filter: &OrderFilter, page: &PageRequest)
    -> Result<PagedOrders>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_parse_both_spellings() {
        assert_eq!(SortField::parse("created_at"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("createdAt"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("pickupTime"), Some(SortField::PickupTime));
        assert_eq!(SortField::parse("total_price"), Some(SortField::TotalPrice));
        assert_eq!(SortField::parse("unitPrice"), None);
        assert_eq!(SortField::parse(""), None);
    }

    #[test]
    fn test_sort_direction_parse_case_insensitive() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }

    #[test]
    fn test_page_offset() {
        let page = PageRequest {
            page: 3,
            size: 20,
            sort: SortField::CreatedAt,
            direction: SortDirection::Desc,
        };
        assert_eq!(page.offset(), 60);
    }
}
