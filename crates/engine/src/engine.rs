//! The order lifecycle engine.
//!
//! Validates and executes order state transitions, mutating the product
//! inventory ledger and the sales aggregate as side effects. Every
//! mutating call runs its order write and ledger effect inside a single
//! store transaction; the sales aggregate is the one best-effort step.

use chrono::Utc;
use common::{OperatorId, OrderId, ProductId, UserId};
use domain::{NewOrder, Order, OrderPolicy, OrderStatus};
use market_store::{MarketStore, ReserveOutcome, StockAdjustment};

use crate::error::{EngineError, Result};
use crate::requests::CreateOrderRequest;

/// Lifecycle engine over a [`MarketStore`] backend.
pub struct OrderEngine<S> {
    store: S,
    policy: OrderPolicy,
}

impl<S: MarketStore> OrderEngine<S> {
    /// Creates an engine with the default [`OrderPolicy`].
    pub fn new(store: S) -> Self {
        Self::with_policy(store, OrderPolicy::default())
    }

    /// Creates an engine with an explicit policy.
    pub fn with_policy(store: S, policy: OrderPolicy) -> Self {
        Self { store, policy }
    }

    /// The policy this engine enforces.
    pub fn policy(&self) -> &OrderPolicy {
        &self.policy
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order, reserving stock for it.
    ///
    /// Validation runs in a fixed sequence and short-circuits on the first
    /// failure, so callers always see the same error for the same input.
    /// The capacity check is evaluated twice: once here for error
    /// precedence, and again atomically inside the store when the
    /// reservation is taken, which closes the race between concurrent
    /// reservations of the same product.
    #[tracing::instrument(skip(self, req))]
    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<Order> {
        let (Some(user_id), Some(shop_id), Some(product_id), Some(quantity)) =
            (req.user_id, req.shop_id, req.product_id, req.quantity)
        else {
            tracing::warn!("order creation rejected: missing required fields");
            return Err(EngineError::MissingRequiredFields);
        };

        if !self.policy.quantity_in_range(quantity) {
            return Err(EngineError::InvalidQuantity {
                min: self.policy.min_quantity,
                max: self.policy.max_quantity,
            });
        }

        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(EngineError::ProductNotFound(product_id))?;
        if product.shop_id != shop_id {
            tracing::warn!(
                %product_id, %shop_id, product_shop_id = %product.shop_id,
                "product does not belong to shop"
            );
            return Err(EngineError::ProductNotBelongToShop);
        }
        if !product.status.is_active() {
            return Err(EngineError::ProductNotAvailable);
        }

        let shop = self
            .store
            .shop(shop_id)
            .await?
            .ok_or(EngineError::ShopNotFound(shop_id))?;
        if !shop.status.is_active() {
            return Err(EngineError::ShopNotActive);
        }

        if quantity > product.capacity() {
            tracing::warn!(
                %product_id, quantity,
                available = product.quantity_available,
                pending = product.quantity_pending,
                "insufficient stock"
            );
            return Err(EngineError::InsufficientStock);
        }

        let pickup_time = req
            .pickup_time
            .ok_or_else(|| EngineError::InvalidRequest("Pickup time is required".to_string()))?;
        if pickup_time <= Utc::now() {
            return Err(EngineError::InvalidRequest(
                "Pickup time must be in the future".to_string(),
            ));
        }

        let unit_price = req
            .unit_price
            .filter(|p| p.is_positive())
            .ok_or_else(|| {
                EngineError::InvalidRequest("Unit price must be greater than 0".to_string())
            })?;
        let total_price = req
            .total_price
            .filter(|p| p.is_positive())
            .ok_or_else(|| {
                EngineError::InvalidRequest("Total price must be greater than 0".to_string())
            })?;
        if total_price != unit_price.times(quantity) {
            tracing::warn!(
                %user_id, %product_id,
                expected = unit_price.times(quantity).cents(),
                actual = total_price.cents(),
                "total price mismatch"
            );
            return Err(EngineError::InvalidRequest(
                "Total price calculation is incorrect".to_string(),
            ));
        }

        let order = NewOrder {
            user_id,
            shop_id,
            product_id,
            quantity,
            pickup_time,
            expires_at: pickup_time + self.policy.expiry_window(),
            unit_price,
            total_price,
        };

        match self.store.create_order(order).await? {
            ReserveOutcome::Created(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id, %user_id, %shop_id, %product_id, quantity,
                    "order created"
                );
                Ok(order)
            }
            ReserveOutcome::InsufficientCapacity => {
                // Lost the capacity between the pre-check and the reserve.
                tracing::warn!(%product_id, quantity, "reservation lost capacity race");
                Err(EngineError::InsufficientStock)
            }
        }
    }

    /// Cancels an order on behalf of its owner.
    ///
    /// The owner path releases the pending reservation, floored at zero.
    /// Unlike the status-update cancellation it never restores
    /// `quantity_available`. Cancelling an already-cancelled order is an
    /// idempotent no-op.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, requester: UserId) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if order.user_id != requester {
            tracing::warn!(%order_id, %requester, owner = %order.user_id, "cancel forbidden");
            return Err(EngineError::Forbidden);
        }
        if order.status == OrderStatus::Cancelled {
            tracing::info!(%order_id, "order already cancelled");
            return Ok(order);
        }
        if order.status != OrderStatus::Pending {
            return Err(EngineError::OrderCannotBeCancelled);
        }

        // The owner path refuses to cancel when the product row is gone.
        self.store
            .product(order.product_id)
            .await?
            .ok_or(EngineError::ProductNotFound(order.product_id))?;

        let updated = self
            .transition(
                &order,
                OrderStatus::Cancelled,
                StockAdjustment::ReleasePendingClamped {
                    quantity: order.quantity,
                },
            )
            .await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, %requester, "order cancelled by owner");
        Ok(updated)
    }

    /// Confirms an order: the `PENDING -> COMPLETED` shortcut.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Pending {
            tracing::warn!(%order_id, status = %order.status, "order cannot be confirmed");
            return Err(EngineError::InvalidOrderStatus(
                "Only pending orders can be confirmed".to_string(),
            ));
        }
        self.complete_pending(&order).await
    }

    /// Applies a generic status update.
    ///
    /// Transitions are legal only out of `PENDING`; `COMPLETED` and
    /// `CANCELLED` are terminal. Completion consumes the pending
    /// reservation and bumps the sales aggregate; cancellation through
    /// this path restores `quantity_available` in addition to releasing
    /// the reservation.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if !order.status.allows_transition() {
            tracing::warn!(
                %order_id, from = %order.status, to = %new_status,
                "illegal status transition"
            );
            return Err(EngineError::InvalidOrderStatus(format!(
                "Cannot change status from {} to {}",
                order.status, new_status
            )));
        }

        match new_status {
            OrderStatus::Completed => self.complete_pending(&order).await,
            OrderStatus::Cancelled => {
                let updated = self
                    .transition(
                        &order,
                        OrderStatus::Cancelled,
                        StockAdjustment::RestockAndRelease {
                            quantity: order.quantity,
                        },
                    )
                    .await?;
                metrics::counter!("orders_cancelled_total").increment(1);
                tracing::info!(%order_id, "order cancelled by status update");
                Ok(updated)
            }
            OrderStatus::Pending | OrderStatus::Confirmed => {
                let updated = self
                    .transition(&order, new_status, StockAdjustment::None)
                    .await?;
                tracing::info!(%order_id, to = %new_status, "order status updated");
                Ok(updated)
            }
        }
    }

    /// Status update on behalf of a shop operator; requires membership in
    /// the order's shop.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status_for_operator(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        operator: OperatorId,
    ) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if !self.store.is_shop_member(operator, order.shop_id).await? {
            tracing::warn!(%order_id, %operator, shop_id = %order.shop_id, "operator not a member");
            return Err(EngineError::Forbidden);
        }
        self.update_order_status(order_id, new_status).await
    }

    /// `PENDING -> COMPLETED` with its ledger and aggregate side effects.
    async fn complete_pending(&self, order: &Order) -> Result<Order> {
        let updated = self
            .transition(
                order,
                OrderStatus::Completed,
                StockAdjustment::ConsumePending {
                    quantity: order.quantity,
                },
            )
            .await?;

        // Best effort, after the transition committed: a stats failure
        // must not fail the completion.
        self.record_sale_best_effort(order.product_id, order.quantity)
            .await;

        metrics::counter!("orders_completed_total").increment(1);
        tracing::info!(
            order_id = %order.id, product_id = %order.product_id, quantity = order.quantity,
            "order completed"
        );
        Ok(updated)
    }

    async fn transition(
        &self,
        order: &Order,
        to: OrderStatus,
        adjustment: StockAdjustment,
    ) -> Result<Order> {
        self.store
            .transition_order(order.id, order.status, to, adjustment)
            .await?
            .ok_or_else(|| {
                // The guarded update matched nothing: a concurrent
                // transition won after we loaded the order.
                EngineError::InvalidOrderStatus(format!(
                    "Cannot change status from {} to {}",
                    order.status, to
                ))
            })
    }

    async fn record_sale_best_effort(&self, product_id: ProductId, quantity: i32) {
        if let Err(err) = self
            .store
            .record_sale(product_id, quantity, Utc::now())
            .await
        {
            metrics::counter!("sales_stats_update_failures_total").increment(1);
            tracing::warn!(%product_id, quantity, error = %err, "failed to update sales stats");
        }
    }
}
