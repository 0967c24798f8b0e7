//! Record types shared between the storage layer and the public APIs.
//!
//! Everything in here maps 1:1 onto a table (or a column) in the database. Richer request/response shapes live in
//! [`crate::order_objects`].

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
pub use sqlx::types::Json;
use storefront_common::Money;
use thiserror::Error;

//--------------------------------------    OrderStatus      ---------------------------------------------------------
/// The fulfilment state of an order. The progression placed → processing → shipped → delivered is advisory; the only
/// transition with side effects is the one into `Cancelled`, which restores stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order has been created and is awaiting payment collection (cash on delivery).
    Placed,
    /// Payment has been confirmed and the order is being prepared.
    Processing,
    /// The order has left the warehouse.
    Shipped,
    /// The order has reached the customer.
    Delivered,
    /// The order was cancelled by the customer or the seller. Stock has been restored.
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Placed => write!(f, "placed"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(Self::Placed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl OrderStatus {
    /// Orders in a terminal state no longer hold stock and no longer block product deletion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Only freshly placed or processing orders may be cancelled by the customer.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::Processing)
    }
}

//--------------------------------------   PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery. Payment stays pending until the courier collects it, which is outside this system.
    Cod,
    /// Card via the external payment gateway.
    Card,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cod => write!(f, "cod"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "card" => Ok(Self::Card),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------      Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// The seller account that listed this product.
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: Money,
    pub offer_price: Option<Money>,
    /// The authoritative count of sellable units. Mutated only by seller edits, order creation (decrement) and
    /// cancellation (increment). Not constrained at the schema level; see the concurrency notes in the crate docs.
    pub stock: i64,
    pub images: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a buyer actually pays: the offer price when one is set, the list price otherwise.
    pub fn effective_price(&self) -> Money {
        self.offer_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: Money,
    pub offer_price: Option<Money>,
    pub stock: i64,
    pub images: Vec<String>,
}

/// A partial product edit. `None` fields are left untouched; `offer_price: Some(None)` clears the offer price.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Money>,
    pub offer_price: Option<Option<Money>>,
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.brand.is_none()
            && self.price.is_none()
            && self.offer_price.is_none()
            && self.stock.is_none()
            && self.images.is_none()
    }
}

//--------------------------------------       User          ---------------------------------------------------------
/// A customer record mirrored from the identity provider. The id is the provider's opaque subject string.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

//--------------------------------------      Address        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub user_id: String,
    pub full_name: String,
    pub phone_number: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddress {
    pub full_name: String,
    pub phone_number: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

//--------------------------------------     Cart items      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: i64,
}

//--------------------------------------       Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub address_id: i64,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// The gateway's transaction reference, once one exists.
    pub payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// A fully-priced order ready to be written to storage. Produced by the order-flow API once admission has passed and
/// totals have been computed; the storage layer persists it verbatim.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub address_id: i64,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_ref: Option<String>,
}

//--------------------------------------   StockShortfall    ---------------------------------------------------------
/// One line of an insufficient-stock rejection. Every offending item in the request is reported, so the storefront
/// can guide the customer through correcting the whole cart at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

impl Display for StockShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: requested {}, available {}", self.product_name, self.requested, self.available)
    }
}

//--------------------------------------      Receipt        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub order_id: i64,
    pub user_id: String,
    /// Human-readable number, `RCP-YYYYMMDD-NNNN`, sequential within the generation day.
    pub receipt_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub bill_to_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone_number: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_ref: Option<String>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: i64,
    pub receipt_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub order_id: i64,
    pub user_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub bill_to_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone_number: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_ref: Option<String>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub items: Vec<NewReceiptItem>,
}

#[derive(Debug, Clone)]
pub struct NewReceiptItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}
