//! Request/response shapes used by the public APIs, one level above the raw records in [`crate::db_types`].

use serde::{Deserialize, Serialize};
use storefront_common::Money;

use crate::db_types::{LineItem, Order, OrderItem, OrderStatus, PaymentMethod, Receipt, ReceiptItem};

/// The storefront's pricing rules, applied once at checkout. Totals on an order are never recomputed afterwards.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Flat shipping fee added to every order.
    pub shipping_fee: Money,
    /// Tax rate in basis points of the subtotal (800 = 8%).
    pub tax_basis_points: i64,
    /// ISO currency code passed through to the payment gateway.
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { shipping_fee: Money::from_whole(10), tax_basis_points: 800, currency: "USD".to_string() }
    }
}

/// A checkout request, as it arrives from the storefront. The order-flow API turns this into a priced
/// [`crate::db_types::NewOrder`] once admission passes.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub address_id: i64,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    /// The gateway transaction reference for card checkouts that were confirmed client-side before checkout.
    pub payment_ref: Option<String>,
}

/// Search criteria for order queries. Empty criteria match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQueryFilter {
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderQueryFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), status: None }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.status.is_none()
    }
}

/// An order together with its line items, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A receipt together with its snapshot line items, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptDetails {
    #[serde(flatten)]
    pub receipt: Receipt,
    pub items: Vec<ReceiptItem>,
}

/// Search criteria for the public product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductQueryFilter {
    /// Case-insensitive substring match against name, description and brand.
    pub search: Option<String>,
    pub brand: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl ProductQueryFilter {
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.limit
    }
}

/// One page of the public product listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<crate::db_types::Product>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}
