//! The order query service: customer, shop, and admin listings.
//!
//! Shop and admin rows are enriched by batch-loading the referenced
//! customer, product, and shop records: one lookup per entity type per
//! page, not per row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{Money, OperatorId, OrderId, ProductId, ShopId, UserId};
use domain::{Order, OrderStatus};
use market_store::{MarketStore, OrderFilter, PageRequest, SortDirection, SortField};
use serde::Serialize;

use crate::engine::OrderEngine;
use crate::error::{EngineError, Result};
use crate::page::Page;
use crate::requests::OrderListQuery;

/// Placeholder shown when a referenced record no longer exists.
const MISSING: &str = "N/A";

/// An order row denormalised for shop and admin views.
#[derive(Debug, Clone, Serialize)]
pub struct ShopOrderDetails {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shop_id: ShopId,
    pub shop_name: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub status: OrderStatus,
    pub status_description: &'static str,
    pub pickup_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub unit_price: Money,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product ranked by completed-order volume.
#[derive(Debug, Clone, Serialize)]
pub struct PopularProduct {
    pub product_id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Money,
    pub original_price: Money,
    pub total_quantity_sold: i64,
    pub total_orders: i64,
    pub last_sold_at: Option<DateTime<Utc>>,
}

impl<S: MarketStore> OrderEngine<S> {
    /// A customer's own orders, newest first, optionally filtered by
    /// status.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let orders = self.store().orders_for_user(user, status).await?;
        tracing::info!(%user, count = orders.len(), "user orders retrieved");
        Ok(orders)
    }

    /// Paged order listing for a shop operator.
    ///
    /// `shop_id` is required, and the operator must be a registered member
    /// of that shop.
    #[tracing::instrument(skip(self, query))]
    pub async fn shop_orders(
        &self,
        operator: OperatorId,
        query: OrderListQuery,
    ) -> Result<Page<ShopOrderDetails>> {
        let shop_id = query
            .shop_id
            .ok_or_else(|| EngineError::InvalidRequest("ShopId is required".to_string()))?;
        if !self.store().is_shop_member(operator, shop_id).await? {
            tracing::warn!(%operator, %shop_id, "shop orders listing forbidden");
            return Err(EngineError::Forbidden);
        }
        self.paged_orders(query).await
    }

    /// Paged order listing for an administrator; the shop filter is
    /// optional and no membership check applies.
    #[tracing::instrument(skip(self, query))]
    pub async fn admin_orders(&self, query: OrderListQuery) -> Result<Page<ShopOrderDetails>> {
        self.paged_orders(query).await
    }

    /// A single order enriched for a shop/admin view.
    pub async fn shop_order_details(&self, order_id: OrderId) -> Result<ShopOrderDetails> {
        let order = self
            .store()
            .order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;
        let mut rows = self.enrich(vec![order]).await?;
        Ok(rows.remove(0))
    }

    /// Active products ranked by total quantity sold.
    #[tracing::instrument(skip(self))]
    pub async fn popular_products(&self, limit: Option<i64>) -> Result<Vec<PopularProduct>> {
        let limit = self.policy().clamp_page_size(limit);
        let ranked = self.store().popular_products(limit).await?;
        Ok(ranked
            .into_iter()
            .map(|(product, stats)| PopularProduct {
                product_id: product.id,
                shop_id: product.shop_id,
                name: product.name,
                image_url: product.image_url,
                price: product.price,
                original_price: product.original_price,
                total_quantity_sold: stats.total_quantity_sold,
                total_orders: stats.total_orders,
                last_sold_at: stats.last_sold_at,
            })
            .collect())
    }

    async fn paged_orders(&self, query: OrderListQuery) -> Result<Page<ShopOrderDetails>> {
        let page = query.page.unwrap_or(0);
        if page < 0 {
            return Err(EngineError::InvalidPageNumber);
        }
        let size = self.policy().clamp_page_size(query.size);

        let sort = match query.sort_by.as_deref() {
            None => SortField::default(),
            Some(raw) => SortField::parse(raw).ok_or_else(|| {
                EngineError::InvalidRequest(format!("Invalid sort field: {raw}"))
            })?,
        };
        let direction = match query.sort_direction.as_deref() {
            None => SortDirection::default(),
            Some(raw) => SortDirection::parse(raw).ok_or_else(|| {
                EngineError::InvalidRequest(format!("Invalid sort direction: {raw}"))
            })?,
        };

        let filter = OrderFilter {
            shop_id: query.shop_id,
            status: query.status,
            from_date: query.from_date,
            to_date: query.to_date,
        };
        let request = PageRequest {
            page,
            size,
            sort,
            direction,
        };

        let paged = self.store().orders_filtered(&filter, &request).await?;
        let total_elements = paged.total_elements;
        let content = self.enrich(paged.orders).await?;

        tracing::info!(
            shop_id = ?filter.shop_id, page, size, total_elements,
            "orders retrieved"
        );
        Ok(Page::new(content, page, size, total_elements))
    }

    /// Batch-loads the entities referenced by a page of orders and maps
    /// each row into its denormalised form.
    async fn enrich(&self, orders: Vec<Order>) -> Result<Vec<ShopOrderDetails>> {
        let mut user_ids: Vec<UserId> = orders.iter().map(|o| o.user_id).collect();
        user_ids.sort();
        user_ids.dedup();
        let mut product_ids: Vec<ProductId> = orders.iter().map(|o| o.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        let mut shop_ids: Vec<ShopId> = orders.iter().map(|o| o.shop_id).collect();
        shop_ids.sort();
        shop_ids.dedup();

        let customers: HashMap<UserId, _> = self
            .store()
            .customers_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let products: HashMap<ProductId, _> = self
            .store()
            .products_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let shops: HashMap<ShopId, _> = self
            .store()
            .shops_by_ids(&shop_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let customer = customers.get(&order.user_id);
                let product = products.get(&order.product_id);
                let shop = shops.get(&order.shop_id);
                ShopOrderDetails {
                    id: order.id,
                    user_id: order.user_id,
                    customer_name: customer
                        .map_or_else(|| MISSING.to_string(), |c| c.name.clone()),
                    customer_email: customer
                        .map_or_else(|| MISSING.to_string(), |c| c.email.clone()),
                    customer_phone: customer
                        .and_then(|c| c.phone.clone())
                        .unwrap_or_else(|| MISSING.to_string()),
                    shop_id: order.shop_id,
                    shop_name: shop.map_or_else(|| MISSING.to_string(), |s| s.name.clone()),
                    product_id: order.product_id,
                    product_name: product
                        .map_or_else(|| MISSING.to_string(), |p| p.name.clone()),
                    product_image: product.and_then(|p| p.image_url.clone()),
                    quantity: order.quantity,
                    status: order.status,
                    status_description: order.status.label(),
                    pickup_time: order.pickup_time,
                    expires_at: order.expires_at,
                    unit_price: order.unit_price,
                    total_price: order.total_price,
                    created_at: order.created_at,
                    updated_at: order.updated_at,
                }
            })
            .collect())
    }
}
