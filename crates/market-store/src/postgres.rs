//! PostgreSQL-backed store implementation.
//!
//! The reserve and transition paths use conditional updates so the
//! capacity check and the status guard are decided by the row itself,
//! not by values read earlier in the request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OperatorId, OrderId, ProductId, ShopId, UserId};
use domain::{
    Customer, NewOrder, Order, OrderStatus, Product, ProductStatus, SalesStats, Shop, ShopStatus,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{Result, StoreError};
use crate::store::{
    MarketStore, OrderFilter, PageRequest, PagedOrders, ReserveOutcome, StockAdjustment,
};

const ORDER_COLUMNS: &str = "id, user_id, shop_id, product_id, quantity, status, pickup_time, \
     expires_at, unit_price_cents, total_price_cents, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, shop_id, name, description, image_url, price_cents, \
     original_price_cents, quantity_available, quantity_pending, status, created_at, updated_at";

/// PostgreSQL [`MarketStore`].
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Creates a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            shop_id: ShopId::new(row.try_get("shop_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            status: OrderStatus::from_code(&status)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            pickup_time: row.try_get("pickup_time")?,
            expires_at: row.try_get("expires_at")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        let status: String = row.try_get("status")?;
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            shop_id: ShopId::new(row.try_get("shop_id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            image_url: row.try_get("image_url")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            original_price: Money::from_cents(row.try_get("original_price_cents")?),
            quantity_available: row.try_get("quantity_available")?,
            quantity_pending: row.try_get("quantity_pending")?,
            status: ProductStatus::from_code(&status),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_shop(row: &PgRow) -> Result<Shop> {
        let status: String = row.try_get("status")?;
        Ok(Shop {
            id: ShopId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            phone: row.try_get("phone")?,
            image_url: row.try_get("image_url")?,
            status: ShopStatus::from_code(&status),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_customer(row: &PgRow) -> Result<Customer> {
        Ok(Customer {
            id: UserId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_stats(row: &PgRow) -> Result<SalesStats> {
        Ok(SalesStats {
            product_id: ProductId::new(row.try_get("product_id")?),
            total_quantity_sold: row.try_get("total_quantity_sold")?,
            total_orders: row.try_get("total_orders")?,
            last_sold_at: row.try_get("last_sold_at")?,
        })
    }
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_product).collect()
    }

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>> {
        let row = sqlx::query(
            "SELECT id, name, address, phone, image_url, status, created_at, updated_at \
             FROM shops WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_shop).transpose()
    }

    async fn shops_by_ids(&self, ids: &[ShopId]) -> Result<Vec<Shop>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let rows = sqlx::query(
            "SELECT id, name, address, phone, image_url, status, created_at, updated_at \
             FROM shops WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_shop).collect()
    }

    async fn customer(&self, id: UserId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, created_at FROM customers WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn customers_by_ids(&self, ids: &[UserId]) -> Result<Vec<Customer>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let rows = sqlx::query(
            "SELECT id, name, email, phone, created_at FROM customers WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_customer).collect()
    }

    async fn is_shop_member(&self, operator: OperatorId, shop: ShopId) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop_members WHERE operator_id = $1 AND shop_id = $2",
        )
        .bind(operator.as_i64())
        .bind(shop.as_i64())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn shop_ids_for(&self, operator: OperatorId) -> Result<Vec<ShopId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT shop_id FROM shop_members WHERE operator_id = $1 ORDER BY shop_id",
        )
        .bind(operator.as_i64())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(ShopId::new).collect())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn create_order(&self, order: NewOrder) -> Result<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;

        // Conditional increment: holds capacity only while
        // available - pending still covers the quantity.
        let reserved = sqlx::query(
            "UPDATE products \
             SET quantity_pending = quantity_pending + $1, updated_at = NOW() \
             WHERE id = $2 AND quantity_available - quantity_pending >= $1",
        )
        .bind(order.quantity)
        .bind(order.product_id.as_i64())
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            // Dropping the transaction rolls back.
            tracing::debug!(product_id = %order.product_id, quantity = order.quantity,
                "conditional reserve matched no row");
            return Ok(ReserveOutcome::InsufficientCapacity);
        }

        let row = sqlx::query(&format!(
            "INSERT INTO orders \
             (user_id, shop_id, product_id, quantity, status, pickup_time, expires_at, \
              unit_price_cents, total_price_cents) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.user_id.as_i64())
        .bind(order.shop_id.as_i64())
        .bind(order.product_id.as_i64())
        .bind(order.quantity)
        .bind(OrderStatus::Pending.as_code())
        .bind(order.pickup_time)
        .bind(order.expires_at)
        .bind(order.unit_price.cents())
        .bind(order.total_price.cents())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReserveOutcome::Created(Self::row_to_order(&row)?))
    }

    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        adjustment: StockAdjustment,
    ) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND status = $3 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(to.as_code())
        .bind(id.as_i64())
        .bind(from.as_code())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = Self::row_to_order(&row)?;

        // The ledger effect targets the product row if it still exists;
        // the completion and status-update paths tolerate a missing one.
        match adjustment {
            StockAdjustment::None => {}
            StockAdjustment::ReleasePendingClamped { quantity } => {
                sqlx::query(
                    "UPDATE products \
                     SET quantity_pending = GREATEST(quantity_pending - $1, 0), \
                         updated_at = NOW() \
                     WHERE id = $2",
                )
                .bind(quantity)
                .bind(order.product_id.as_i64())
                .execute(&mut *tx)
                .await?;
            }
            StockAdjustment::ConsumePending { quantity } => {
                sqlx::query(
                    "UPDATE products \
                     SET quantity_pending = quantity_pending - $1, updated_at = NOW() \
                     WHERE id = $2",
                )
                .bind(quantity)
                .bind(order.product_id.as_i64())
                .execute(&mut *tx)
                .await?;
            }
            StockAdjustment::RestockAndRelease { quantity } => {
                sqlx::query(
                    "UPDATE products \
                     SET quantity_available = quantity_available + $1, \
                         quantity_pending = quantity_pending - $1, \
                         updated_at = NOW() \
                     WHERE id = $2",
                )
                .bind(quantity)
                .bind(order.product_id.as_i64())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(order))
    }

    async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: i32,
        sold_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO product_sales_stats \
             (product_id, total_quantity_sold, total_orders, last_sold_at) \
             VALUES ($1, $2, 1, $3) \
             ON CONFLICT (product_id) DO UPDATE SET \
                 total_quantity_sold = product_sales_stats.total_quantity_sold + EXCLUDED.total_quantity_sold, \
                 total_orders = product_sales_stats.total_orders + 1, \
                 last_sold_at = EXCLUDED.last_sold_at, \
                 updated_at = NOW()",
        )
        .bind(product_id.as_i64())
        .bind(i64::from(quantity))
        .bind(sold_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn sales_stats(&self, product_id: ProductId) -> Result<Option<SalesStats>> {
        let row = sqlx::query(
            "SELECT product_id, total_quantity_sold, total_orders, last_sold_at \
             FROM product_sales_stats WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_stats).transpose()
    }

    async fn popular_products(&self, limit: i64) -> Result<Vec<(Product, SalesStats)>> {
        let rows = sqlx::query(
            "SELECT p.id, p.shop_id, p.name, p.description, p.image_url, p.price_cents, \
                    p.original_price_cents, p.quantity_available, p.quantity_pending, p.status, \
                    p.created_at, p.updated_at, \
                    s.product_id, s.total_quantity_sold, s.total_orders, s.last_sold_at \
             FROM products p \
             JOIN product_sales_stats s ON s.product_id = p.id \
             WHERE p.status = '1' \
             ORDER BY s.total_quantity_sold DESC, p.id ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((Self::row_to_product(row)?, Self::row_to_stats(row)?)))
            .collect()
    }

    async fn orders_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE user_id = $1 AND status = $2 \
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user.as_i64())
                .bind(status.as_code())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE user_id = $1 \
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user.as_i64())
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn orders_filtered(
        &self,
        filter: &OrderFilter,
        page: &PageRequest,
    ) -> Result<PagedOrders> {
        // Build the WHERE clause once, shared by the count and page queries.
        let mut clause = String::from(" FROM orders WHERE 1=1");
        let mut n = 0;
        if filter.shop_id.is_some() {
            n += 1;
            clause.push_str(&format!(" AND shop_id = ${n}"));
        }
        if filter.status.is_some() {
            n += 1;
            clause.push_str(&format!(" AND status = ${n}"));
        }
        if filter.from_date.is_some() {
            n += 1;
            clause.push_str(&format!(" AND created_at >= ${n}"));
        }
        if filter.to_date.is_some() {
            n += 1;
            clause.push_str(&format!(" AND created_at <= ${n}"));
        }

        let count_sql = format!("SELECT COUNT(*){clause}");
        let page_sql = format!(
            "SELECT {ORDER_COLUMNS}{clause} ORDER BY {} {}, id {} LIMIT ${} OFFSET ${}",
            page.sort.column(),
            page.direction.keyword(),
            page.direction.keyword(),
            n + 1,
            n + 2,
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut page_query = sqlx::query(&page_sql);
        if let Some(shop_id) = filter.shop_id {
            count_query = count_query.bind(shop_id.as_i64());
            page_query = page_query.bind(shop_id.as_i64());
        }
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_code());
            page_query = page_query.bind(status.as_code());
        }
        if let Some(from_date) = filter.from_date {
            count_query = count_query.bind(from_date);
            page_query = page_query.bind(from_date);
        }
        if let Some(to_date) = filter.to_date {
            count_query = count_query.bind(to_date);
            page_query = page_query.bind(to_date);
        }

        let total_elements = count_query.fetch_one(&self.pool).await?;
        let rows = page_query
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(PagedOrders {
            orders: rows.iter().map(Self::row_to_order).collect::<Result<_>>()?,
            total_elements,
        })
    }
}
