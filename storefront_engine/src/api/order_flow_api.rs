use std::fmt::Debug;

use log::*;
use storefront_common::Money;

use crate::{
    db_types::{NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus, StockShortfall},
    order_objects::{CheckoutRequest, OrderDetails, OrderQueryFilter, PricingConfig},
    traits::{AccountManagement, CatalogManagement, OrderFlowError, PaymentStateUpdate, StorefrontDatabase},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, cancellation, seller status changes and
/// payment reconciliation. It owns the pricing rules (flat shipping, tax rate) and composes the per-statement stock
/// ledger with the order records.
pub struct OrderFlowApi<B> {
    db: B,
    pricing: PricingConfig,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, pricing: PricingConfig) -> Self {
        Self { db, pricing }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Creates a new order from a checkout request.
    ///
    /// The flow is:
    /// 1. Reject an empty item list.
    /// 2. Load every product; a missing one fails the call naming it.
    /// 3. All-or-nothing stock admission: every item short on stock is collected, and a non-empty shortfall list
    ///    fails the whole call without touching any stock.
    /// 4. Price the order from the current effective prices plus the configured shipping fee and tax rate.
    /// 5. Decrement stock per line with independent atomic statements.
    /// 6. Persist the order. Cash on delivery starts `placed`/`pending`; card starts `processing`/`completed`, since
    ///    a client-side gateway confirmation precedes checkout for card payments.
    /// 7. Clear the customer's cart.
    ///
    /// Note that between steps 3 and 5 another checkout may take the same stock; both calls will then decrement and
    /// the ledger can go negative. This mirrors the per-statement atomicity of the storage layer and is covered by an
    /// integration test.
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<OrderDetails, OrderFlowError> {
        if request.items.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        let mut subtotal = Money::default();
        let mut shortfalls = Vec::new();
        for item in &request.items {
            let product = self
                .db
                .fetch_product(item.product_id)
                .await?
                .ok_or(OrderFlowError::ProductNotFound(item.product_id))?;
            if product.stock < item.quantity {
                shortfalls.push(StockShortfall {
                    product_name: product.name.clone(),
                    requested: item.quantity,
                    available: product.stock,
                });
            }
            subtotal = subtotal + product.effective_price() * item.quantity;
        }
        if !shortfalls.is_empty() {
            info!("🛒️ Checkout rejected for {}: {} item(s) short on stock", request.user_id, shortfalls.len());
            return Err(OrderFlowError::InsufficientStock(shortfalls));
        }
        let shipping = self.pricing.shipping_fee;
        let tax = subtotal.percentage(self.pricing.tax_basis_points);
        let total = subtotal + shipping + tax;

        for item in &request.items {
            self.db.adjust_stock(item.product_id, -item.quantity).await?;
        }

        let (status, payment_status) = match request.payment_method {
            PaymentMethod::Cod => (OrderStatus::Placed, PaymentStatus::Pending),
            PaymentMethod::Card => (OrderStatus::Processing, PaymentStatus::Completed),
        };
        let order = NewOrder {
            user_id: request.user_id.clone(),
            address_id: request.address_id,
            items: request.items,
            subtotal,
            shipping,
            tax,
            total,
            status,
            payment_method: request.payment_method,
            payment_status,
            payment_ref: request.payment_ref,
        };
        let order = self.db.insert_order(order).await?;
        self.db.clear_cart(&request.user_id).await?;
        info!("🛒️ Order #{} created for {}. Total {}", order.id, order.user_id, order.total);
        let items = self.db.fetch_order_items(order.id).await?;
        Ok(OrderDetails { order, items })
    }

    /// Cancels an order on behalf of the customer who owns it.
    ///
    /// Only `placed` or `processing` orders can be cancelled; anything else (including a second cancel of the same
    /// order) fails with the current status, so stock is never restored twice. On success every line item's stock is
    /// restored, and the payment status becomes `failed` for card orders (the charge needs out-of-band refund
    /// handling) or stays `pending` for cash on delivery (nothing was ever collected).
    pub async fn cancel_order(&self, order_id: i64, user_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            debug!("🛒️ {user_id} may not cancel order #{order_id}; it belongs to {}", order.user_id);
            return Err(OrderFlowError::OwnershipViolation);
        }
        if !order.status.is_cancellable() {
            return Err(OrderFlowError::NotCancellable(order.status));
        }
        self.restore_stock(order_id).await?;
        let payment_status = match order.payment_method {
            PaymentMethod::Card => PaymentStatus::Failed,
            PaymentMethod::Cod => PaymentStatus::Pending,
        };
        let update = PaymentStateUpdate {
            payment_status: Some(payment_status),
            order_status: Some(OrderStatus::Cancelled),
            ..Default::default()
        };
        let order = self.db.update_payment_state(order_id, update).await?;
        info!("🛒️ Order #{order_id} cancelled by {user_id}. Stock restored.");
        Ok(order)
    }

    /// Seller-driven status change. The new status is written verbatim; the enum ordering is advisory and skipping
    /// or regressing states is not rejected. The one side effect: a transition into `cancelled` from any other
    /// status restores stock, exactly as a customer cancellation does.
    pub async fn advance_order_status(&self, order_id: i64, new_status: OrderStatus) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if new_status == OrderStatus::Cancelled && order.status != OrderStatus::Cancelled {
            self.restore_stock(order_id).await?;
        }
        let updated = self.db.update_order_status(order_id, new_status).await?;
        info!("🛒️ Order #{order_id} status changed {} → {}", order.status, updated.status);
        Ok(updated)
    }

    /// The client-confirmed payment path: the storefront calls this after the gateway confirms a card payment
    /// synchronously. Marks the payment completed with its transaction reference, and advances a still-`placed`
    /// order to `processing`; any further-along status is left alone. Re-applying a confirmation is a no-op in
    /// effect.
    pub async fn confirm_payment(
        &self,
        order_id: i64,
        user_id: &str,
        payment_ref: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            return Err(OrderFlowError::OwnershipViolation);
        }
        let order_status = (order.status == OrderStatus::Placed).then_some(OrderStatus::Processing);
        let update = PaymentStateUpdate {
            payment_status: Some(PaymentStatus::Completed),
            payment_method: Some(PaymentMethod::Card),
            payment_ref: Some(payment_ref.to_string()),
            order_status,
        };
        let order = self.db.update_payment_state(order_id, update).await?;
        debug!("🛒️ Payment for order #{order_id} confirmed by client with reference {payment_ref}");
        Ok(order)
    }

    /// Applies a verified `payment succeeded` gateway event: payment completed, order moved to `processing`.
    /// Redelivery is harmless; the writes are idempotent.
    pub async fn payment_succeeded(&self, order_id: i64, payment_ref: &str) -> Result<Order, OrderFlowError> {
        let update = PaymentStateUpdate {
            payment_status: Some(PaymentStatus::Completed),
            payment_ref: Some(payment_ref.to_string()),
            order_status: Some(OrderStatus::Processing),
            ..Default::default()
        };
        let order = self.db.update_payment_state(order_id, update).await?;
        info!("🛒️ Gateway reports payment succeeded for order #{order_id}");
        Ok(order)
    }

    /// Applies a verified `payment failed` gateway event. Only the payment status changes; the order status is left
    /// for the seller to resolve, and stock is NOT restored; only an explicit cancellation does that.
    pub async fn payment_failed(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let update = PaymentStateUpdate { payment_status: Some(PaymentStatus::Failed), ..Default::default() };
        let order = self.db.update_payment_state(order_id, update).await?;
        warn!("🛒️ Gateway reports payment failed for order #{order_id}");
        Ok(order)
    }

    /// Stamps an order with the gateway intent reference when a payment intent is created for it. The payment status
    /// itself only changes on confirmation.
    pub async fn attach_payment_ref(
        &self,
        order_id: i64,
        user_id: &str,
        payment_ref: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            return Err(OrderFlowError::OwnershipViolation);
        }
        let update = PaymentStateUpdate {
            payment_method: Some(PaymentMethod::Card),
            payment_ref: Some(payment_ref.to_string()),
            ..Default::default()
        };
        self.db.update_payment_state(order_id, update).await
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<Option<OrderDetails>, OrderFlowError> {
        let order = match self.db.fetch_order(order_id).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(Some(OrderDetails { order, items }))
    }

    /// Fetch orders matching the filter, with their line items, newest first.
    pub async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<OrderDetails>, OrderFlowError> {
        let orders = self.db.search_orders(filter).await?;
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.db.fetch_order_items(order.id).await?;
            result.push(OrderDetails { order, items });
        }
        Ok(result)
    }

    /// Restores every line item's stock, reversing the decrement applied at creation.
    async fn restore_stock(&self, order_id: i64) -> Result<(), OrderFlowError> {
        let items = self.db.fetch_order_items(order_id).await?;
        for item in &items {
            let stock = self.db.adjust_stock(item.product_id, item.quantity).await?;
            trace!("🛒️ Restored {} unit(s) of product {}; stock is now {stock}", item.quantity, item.product_id);
        }
        Ok(())
    }
}
