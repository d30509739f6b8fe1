//! In-memory store implementation for testing and local runs.
//!
//! All state lives behind one `RwLock`, so every mutating operation is
//! trivially atomic and the accept/reject outcomes match the Postgres
//! implementation's conditional updates.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OperatorId, OrderId, ProductId, ShopId, UserId};
use domain::{
    Customer, NewOrder, Order, OrderStatus, Product, ProductStatus, SalesStats, Shop, ShopMember,
    ShopStatus,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{
    MarketStore, OrderFilter, PageRequest, PagedOrders, ReserveOutcome, SortDirection, SortField,
    StockAdjustment,
};

#[derive(Default)]
struct MemoryState {
    orders: BTreeMap<i64, Order>,
    products: BTreeMap<i64, Product>,
    shops: BTreeMap<i64, Shop>,
    customers: BTreeMap<i64, Customer>,
    members: Vec<ShopMember>,
    stats: HashMap<i64, SalesStats>,
    next_order_id: i64,
    next_product_id: i64,
    next_shop_id: i64,
    next_customer_id: i64,
    fail_sales_update: bool,
}

/// In-memory [`MarketStore`] with sequential id assignment.
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryMarketStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a shop and returns it.
    pub async fn add_shop(&self, name: &str, status: ShopStatus) -> Shop {
        let mut state = self.state.write().await;
        state.next_shop_id += 1;
        let now = Utc::now();
        let shop = Shop {
            id: ShopId::new(state.next_shop_id),
            name: name.to_string(),
            address: None,
            phone: None,
            image_url: None,
            status,
            created_at: now,
            updated_at: now,
        };
        state.shops.insert(shop.id.as_i64(), shop.clone());
        shop
    }

    /// Seeds a product with the given ceiling and no pending reservations.
    pub async fn add_product(
        &self,
        shop_id: ShopId,
        name: &str,
        price: Money,
        quantity_available: i32,
        status: ProductStatus,
    ) -> Product {
        let mut state = self.state.write().await;
        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_product_id),
            shop_id,
            name: name.to_string(),
            description: None,
            image_url: None,
            price,
            original_price: price,
            quantity_available,
            quantity_pending: 0,
            status,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id.as_i64(), product.clone());
        product
    }

    /// Seeds a customer account.
    pub async fn add_customer(&self, name: &str, email: &str) -> Customer {
        let mut state = self.state.write().await;
        state.next_customer_id += 1;
        let customer = Customer {
            id: UserId::new(state.next_customer_id),
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            created_at: Utc::now(),
        };
        state.customers.insert(customer.id.as_i64(), customer.clone());
        customer
    }

    /// Registers an operator as a member of a shop.
    pub async fn add_shop_member(&self, operator: OperatorId, shop: ShopId, role: &str) {
        let mut state = self.state.write().await;
        state.members.push(ShopMember {
            shop_id: shop,
            operator_id: operator,
            role: role.to_string(),
            created_at: Utc::now(),
        });
    }

    /// Test hook: overwrites a product's pending counter directly.
    pub async fn set_quantity_pending(&self, product: ProductId, pending: i32) {
        let mut state = self.state.write().await;
        if let Some(p) = state.products.get_mut(&product.as_i64()) {
            p.quantity_pending = pending;
        }
    }

    /// Test hook: removes a product row out from under existing orders.
    pub async fn remove_product(&self, product: ProductId) {
        self.state.write().await.products.remove(&product.as_i64());
    }

    /// Test hook: makes the next sales-aggregate upserts fail.
    pub async fn set_fail_sales_update(&self, fail: bool) {
        self.state.write().await.fail_sales_update = fail;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    fn apply_adjustment(product: &mut Product, adjustment: StockAdjustment) {
        match adjustment {
            StockAdjustment::None => {}
            StockAdjustment::ReleasePendingClamped { quantity } => {
                product.quantity_pending = (product.quantity_pending - quantity).max(0);
            }
            StockAdjustment::ConsumePending { quantity } => {
                product.quantity_pending -= quantity;
            }
            StockAdjustment::RestockAndRelease { quantity } => {
                product.quantity_available += quantity;
                product.quantity_pending -= quantity;
            }
        }
    }

    fn sort_orders(orders: &mut [Order], sort: SortField, direction: SortDirection) {
        orders.sort_by(|a, b| {
            let ordering = match sort {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::PickupTime => a.pickup_time.cmp(&b.pickup_time),
                SortField::TotalPrice => a.total_price.cmp(&b.total_price),
            }
            // Ties resolve by id so pagination is stable.
            .then(a.id.cmp(&b.id));
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id.as_i64()).cloned())
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(&id.as_i64()).cloned())
            .collect())
    }

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>> {
        Ok(self.state.read().await.shops.get(&id.as_i64()).cloned())
    }

    async fn shops_by_ids(&self, ids: &[ShopId]) -> Result<Vec<Shop>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.shops.get(&id.as_i64()).cloned())
            .collect())
    }

    async fn customer(&self, id: UserId) -> Result<Option<Customer>> {
        Ok(self.state.read().await.customers.get(&id.as_i64()).cloned())
    }

    async fn customers_by_ids(&self, ids: &[UserId]) -> Result<Vec<Customer>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.customers.get(&id.as_i64()).cloned())
            .collect())
    }

    async fn is_shop_member(&self, operator: OperatorId, shop: ShopId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .members
            .iter()
            .any(|m| m.operator_id == operator && m.shop_id == shop))
    }

    async fn shop_ids_for(&self, operator: OperatorId) -> Result<Vec<ShopId>> {
        let state = self.state.read().await;
        let mut ids: Vec<ShopId> = state
            .members
            .iter()
            .filter(|m| m.operator_id == operator)
            .map(|m| m.shop_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id.as_i64()).cloned())
    }

    async fn create_order(&self, order: NewOrder) -> Result<ReserveOutcome> {
        let mut state = self.state.write().await;

        let Some(product) = state.products.get_mut(&order.product_id.as_i64()) else {
            return Ok(ReserveOutcome::InsufficientCapacity);
        };
        if product.quantity_available - product.quantity_pending < order.quantity {
            return Ok(ReserveOutcome::InsufficientCapacity);
        }
        product.quantity_pending += order.quantity;

        state.next_order_id += 1;
        let now = Utc::now();
        let stored = Order {
            id: OrderId::new(state.next_order_id),
            user_id: order.user_id,
            shop_id: order.shop_id,
            product_id: order.product_id,
            quantity: order.quantity,
            status: OrderStatus::Pending,
            pickup_time: order.pickup_time,
            expires_at: order.expires_at,
            unit_price: order.unit_price,
            total_price: order.total_price,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(stored.id.as_i64(), stored.clone());
        Ok(ReserveOutcome::Created(stored))
    }

    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        adjustment: StockAdjustment,
    ) -> Result<Option<Order>> {
        let mut state = self.state.write().await;

        let Some(order) = state.orders.get_mut(&id.as_i64()) else {
            return Ok(None);
        };
        if order.status != from {
            return Ok(None);
        }
        order.status = to;
        order.updated_at = Utc::now();
        let product_id = order.product_id.as_i64();
        let updated = order.clone();

        if let Some(product) = state.products.get_mut(&product_id) {
            Self::apply_adjustment(product, adjustment);
            product.updated_at = Utc::now();
        }
        Ok(Some(updated))
    }

    async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: i32,
        sold_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_sales_update {
            return Err(StoreError::Unavailable(
                "sales stats update rejected".to_string(),
            ));
        }
        let entry = state
            .stats
            .entry(product_id.as_i64())
            .or_insert_with(|| SalesStats {
                product_id,
                total_quantity_sold: 0,
                total_orders: 0,
                last_sold_at: None,
            });
        entry.total_quantity_sold += i64::from(quantity);
        entry.total_orders += 1;
        entry.last_sold_at = Some(sold_at);
        Ok(())
    }

    async fn sales_stats(&self, product_id: ProductId) -> Result<Option<SalesStats>> {
        Ok(self
            .state
            .read()
            .await
            .stats
            .get(&product_id.as_i64())
            .cloned())
    }

    async fn popular_products(&self, limit: i64) -> Result<Vec<(Product, SalesStats)>> {
        let state = self.state.read().await;
        let mut ranked: Vec<(Product, SalesStats)> = state
            .stats
            .values()
            .filter_map(|stats| {
                state
                    .products
                    .get(&stats.product_id.as_i64())
                    .filter(|p| p.status.is_active())
                    .map(|p| (p.clone(), stats.clone()))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.total_quantity_sold
                .cmp(&a.1.total_quantity_sold)
                .then(a.0.id.cmp(&b.0.id))
        });
        ranked.truncate(limit.max(0) as usize);
        Ok(ranked)
    }

    async fn orders_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user)
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        Self::sort_orders(&mut orders, SortField::CreatedAt, SortDirection::Desc);
        Ok(orders)
    }

    async fn orders_filtered(
        &self,
        filter: &OrderFilter,
        page: &PageRequest,
    ) -> Result<PagedOrders> {
        let state = self.state.read().await;
        let mut matches: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.shop_id.is_none_or(|s| o.shop_id == s))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.from_date.is_none_or(|d| o.created_at >= d))
            .filter(|o| filter.to_date.is_none_or(|d| o.created_at <= d))
            .cloned()
            .collect();
        let total_elements = matches.len() as i64;

        Self::sort_orders(&mut matches, page.sort, page.direction);
        let start = (page.offset().max(0) as usize).min(matches.len());
        let end = (start + page.size.max(0) as usize).min(matches.len());
        Ok(PagedOrders {
            orders: matches[start..end].to_vec(),
            total_elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn seed(store: &InMemoryMarketStore, available: i32) -> (Shop, Product, Customer) {
        let shop = store.add_shop("Corner Bakery", ShopStatus::Active).await;
        let product = store
            .add_product(
                shop.id,
                "Surprise bag",
                Money::from_cents(500),
                available,
                ProductStatus::Active,
            )
            .await;
        let customer = store.add_customer("Ana", "ana@example.com").await;
        (shop, product, customer)
    }

    fn new_order(product: &Product, user: UserId, quantity: i32) -> NewOrder {
        let pickup = Utc::now() + Duration::minutes(30);
        NewOrder {
            user_id: user,
            shop_id: product.shop_id,
            product_id: product.id,
            quantity,
            pickup_time: pickup,
            expires_at: pickup + Duration::minutes(15),
            unit_price: product.price,
            total_price: product.price.times(quantity),
        }
    }

    #[tokio::test]
    async fn test_create_order_reserves_pending() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 10).await;

        let outcome = store
            .create_order(new_order(&product, customer.id, 4))
            .await
            .unwrap();
        let order = match outcome {
            ReserveOutcome::Created(order) => order,
            ReserveOutcome::InsufficientCapacity => panic!("expected creation"),
        };
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.quantity, 4);

        let product = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_pending, 4);
        assert_eq!(product.quantity_available, 10);
    }

    #[tokio::test]
    async fn test_create_order_accepts_exact_boundary() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 5).await;

        let outcome = store
            .create_order(new_order(&product, customer.id, 5))
            .await
            .unwrap();
        assert!(matches!(outcome, ReserveOutcome::Created(_)));

        let outcome = store
            .create_order(new_order(&product, customer.id, 1))
            .await
            .unwrap();
        assert!(matches!(outcome, ReserveOutcome::InsufficientCapacity));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_reservation_leaves_ledger_untouched() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 3).await;

        let outcome = store
            .create_order(new_order(&product, customer.id, 4))
            .await
            .unwrap();
        assert!(matches!(outcome, ReserveOutcome::InsufficientCapacity));

        let product = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_pending, 0);
    }

    #[tokio::test]
    async fn test_transition_guard_on_stale_status() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 10).await;
        let ReserveOutcome::Created(order) = store
            .create_order(new_order(&product, customer.id, 2))
            .await
            .unwrap()
        else {
            panic!("expected creation");
        };

        let updated = store
            .transition_order(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Completed,
                StockAdjustment::ConsumePending { quantity: 2 },
            )
            .await
            .unwrap();
        assert_eq!(updated.unwrap().status, OrderStatus::Completed);

        // Second transition loses the guard.
        let second = store
            .transition_order(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                StockAdjustment::RestockAndRelease { quantity: 2 },
            )
            .await
            .unwrap();
        assert!(second.is_none());

        let product = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_pending, 0);
        assert_eq!(product.quantity_available, 10);
    }

    #[tokio::test]
    async fn test_release_clamped_floors_at_zero() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 20).await;
        let ReserveOutcome::Created(order) = store
            .create_order(new_order(&product, customer.id, 10))
            .await
            .unwrap()
        else {
            panic!("expected creation");
        };
        store.set_quantity_pending(product.id, 4).await;

        store
            .transition_order(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                StockAdjustment::ReleasePendingClamped { quantity: 10 },
            )
            .await
            .unwrap();

        let product = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_pending, 0);
        // The owner path never restores the ceiling.
        assert_eq!(product.quantity_available, 20);
    }

    #[tokio::test]
    async fn test_consume_pending_can_go_negative() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 20).await;
        let ReserveOutcome::Created(order) = store
            .create_order(new_order(&product, customer.id, 5))
            .await
            .unwrap()
        else {
            panic!("expected creation");
        };
        store.set_quantity_pending(product.id, 2).await;

        store
            .transition_order(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Completed,
                StockAdjustment::ConsumePending { quantity: 5 },
            )
            .await
            .unwrap();

        let product = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_pending, -3);
    }

    #[tokio::test]
    async fn test_restock_and_release_restores_ceiling() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 10).await;
        let ReserveOutcome::Created(order) = store
            .create_order(new_order(&product, customer.id, 3))
            .await
            .unwrap()
        else {
            panic!("expected creation");
        };

        store
            .transition_order(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                StockAdjustment::RestockAndRelease { quantity: 3 },
            )
            .await
            .unwrap();

        let product = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_available, 13);
        assert_eq!(product.quantity_pending, 0);
    }

    #[tokio::test]
    async fn test_record_sale_upserts() {
        let store = InMemoryMarketStore::new();
        let (_, product, _) = seed(&store, 10).await;

        store.record_sale(product.id, 5, Utc::now()).await.unwrap();
        let stats = store.sales_stats(product.id).await.unwrap().unwrap();
        assert_eq!(stats.total_quantity_sold, 5);
        assert_eq!(stats.total_orders, 1);
        assert!(stats.last_sold_at.is_some());

        store.record_sale(product.id, 3, Utc::now()).await.unwrap();
        let stats = store.sales_stats(product.id).await.unwrap().unwrap();
        assert_eq!(stats.total_quantity_sold, 8);
        assert_eq!(stats.total_orders, 2);
    }

    #[tokio::test]
    async fn test_record_sale_failure_hook() {
        let store = InMemoryMarketStore::new();
        let (_, product, _) = seed(&store, 10).await;
        store.set_fail_sales_update(true).await;

        let err = store.record_sale(product.id, 1, Utc::now()).await;
        assert!(matches!(err, Err(StoreError::Unavailable(_))));
        assert!(store.sales_stats(product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_and_batch_lookups() {
        let store = InMemoryMarketStore::new();
        let (shop, product, customer) = seed(&store, 1).await;

        assert_eq!(
            store.customer(customer.id).await.unwrap().unwrap().name,
            "Ana"
        );
        assert!(store.customer(UserId::new(999)).await.unwrap().is_none());

        let shops = store.shops_by_ids(&[shop.id, ShopId::new(999)]).await.unwrap();
        assert_eq!(shops.len(), 1);
        let products = store.products_by_ids(&[product.id]).await.unwrap();
        assert_eq!(products.len(), 1);
        let customers = store.customers_by_ids(&[customer.id]).await.unwrap();
        assert_eq!(customers.len(), 1);
    }

    #[tokio::test]
    async fn test_membership_checks() {
        let store = InMemoryMarketStore::new();
        let (shop, _, _) = seed(&store, 1).await;
        let other = store.add_shop("Deli", ShopStatus::Active).await;
        let operator = OperatorId::new(77);

        store.add_shop_member(operator, shop.id, "staff").await;

        assert!(store.is_shop_member(operator, shop.id).await.unwrap());
        assert!(!store.is_shop_member(operator, other.id).await.unwrap());
        assert_eq!(
            store.shop_ids_for(operator).await.unwrap(),
            vec![shop.id]
        );
        assert!(
            store
                .shop_ids_for(OperatorId::new(1000))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_orders_filtered_paging_and_sort() {
        let store = InMemoryMarketStore::new();
        let (shop, product, customer) = seed(&store, 100).await;

        for quantity in 1..=5 {
            store
                .create_order(new_order(&product, customer.id, quantity))
                .await
                .unwrap();
        }

        let filter = OrderFilter {
            shop_id: Some(shop.id),
            ..OrderFilter::default()
        };
        let page = store
            .orders_filtered(
                &filter,
                &PageRequest {
                    page: 0,
                    size: 2,
                    sort: SortField::TotalPrice,
                    direction: SortDirection::Desc,
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total_elements, 5);
        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.orders[0].quantity, 5);
        assert_eq!(page.orders[1].quantity, 4);

        let last = store
            .orders_filtered(
                &filter,
                &PageRequest {
                    page: 2,
                    size: 2,
                    sort: SortField::TotalPrice,
                    direction: SortDirection::Desc,
                },
            )
            .await
            .unwrap();
        assert_eq!(last.orders.len(), 1);
        assert_eq!(last.orders[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_orders_for_user_newest_first_with_status_filter() {
        let store = InMemoryMarketStore::new();
        let (_, product, customer) = seed(&store, 100).await;
        let stranger = store.add_customer("Bo", "bo@example.com").await;

        for _ in 0..3 {
            store
                .create_order(new_order(&product, customer.id, 1))
                .await
                .unwrap();
        }
        store
            .create_order(new_order(&product, stranger.id, 1))
            .await
            .unwrap();

        let all = store.orders_for_user(customer.id, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].id > all[1].id && all[1].id > all[2].id);

        let cancelled = store
            .orders_for_user(customer.id, Some(OrderStatus::Cancelled))
            .await
            .unwrap();
        assert!(cancelled.is_empty());
    }
}
