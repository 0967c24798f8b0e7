use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, StockShortfall},
    order_objects::OrderQueryFilter,
    traits::{AccountError, AccountManagement, CatalogError, CatalogManagement},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Select a delivery address and add items to your cart before placing an order")]
    EmptyOrder,
    #[error("Product not found for item: {0}")]
    ProductNotFound(i64),
    #[error("Insufficient stock: {}", shortfall_summary(.0))]
    InsufficientStock(Vec<StockShortfall>),
    #[error("Order {0} could not be found")]
    OrderNotFound(i64),
    #[error("The order belongs to another customer")]
    OwnershipViolation,
    #[error("Order cannot be cancelled. Current status: {0}. Only placed or processing orders can be cancelled.")]
    NotCancellable(OrderStatus),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

fn shortfall_summary(items: &[StockShortfall]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<CatalogError> for OrderFlowError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ProductNotFound(id) => Self::ProductNotFound(id),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

impl From<AccountError> for OrderFlowError {
    fn from(e: AccountError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// A partial update of an order's payment bookkeeping, applied as one statement. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct PaymentStateUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_ref: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl PaymentStateUpdate {
    pub fn is_empty(&self) -> bool {
        self.payment_status.is_none()
            && self.payment_method.is_none()
            && self.payment_ref.is_none()
            && self.order_status.is_none()
    }
}

/// The top-level storage contract for the order flow. Backends supply the catalog (for stock) and accounts (for cart
/// clearing) contracts as well; the flow logic in [`crate::api::OrderFlowApi`] composes the three.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: CatalogManagement + AccountManagement {
    /// Persist a priced order and its line items in a single transaction, returning the stored record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderFlowError>;

    /// Fetch orders matching the filter, newest first.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Write the given status verbatim. Transition validation (such as it is) happens in the API layer.
    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderFlowError>;

    /// Apply a payment-state update to an order, returning the updated record.
    async fn update_payment_state(&self, id: i64, update: PaymentStateUpdate) -> Result<Order, OrderFlowError>;
}
