use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};
use storefront_engine::db_types::{LineItem, NewProduct, OrderStatus, PaymentMethod, ProductUpdate};
use storefront_common::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------------   Checkout  ---------------------------------------------------------

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cod
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutParams {
    pub address_id: i64,
    pub items: Vec<LineItem>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    /// Present for card checkouts that were confirmed client-side before the order is created.
    pub payment_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateParams {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmationParams {
    pub payment_ref: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

//----------------------------------------------   Payments  ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewIntentParams {
    pub order_id: i64,
    /// The total the client believes it is paying, in cents. Must match the order exactly.
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentResult {
    pub success: bool,
    pub client_secret: String,
    pub payment_ref: String,
}

//----------------------------------------------     Cart    ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CartUpdateParams {
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartResult {
    pub items: Vec<LineItem>,
}

//----------------------------------------------   Catalog   ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub brand: String,
    /// Prices are submitted in cents.
    pub price: i64,
    pub offer_price: Option<i64>,
    pub stock: i64,
    /// Image URLs, as returned by the media host the storefront uploads to.
    pub images: Vec<String>,
}

impl ProductForm {
    pub fn into_new_product(self, user_id: &str) -> NewProduct {
        NewProduct {
            user_id: user_id.to_string(),
            name: self.name,
            description: self.description,
            brand: self.brand,
            price: Money::from_cents(self.price),
            offer_price: self.offer_price.map(Money::from_cents),
            stock: self.stock,
            images: self.images,
        }
    }
}

/// Distinguishes an absent field (leave unchanged) from an explicit `null` (clear the value).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdateForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price: Option<i64>,
    /// `null` clears the offer price; omitting the field leaves it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    pub offer_price: Option<Option<i64>>,
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
}

impl From<ProductUpdateForm> for ProductUpdate {
    fn from(form: ProductUpdateForm) -> Self {
        ProductUpdate {
            name: form.name,
            description: form.description,
            brand: form.brand,
            price: form.price.map(Money::from_cents),
            offer_price: form.offer_price.map(|o| o.map(Money::from_cents)),
            stock: form.stock,
            images: form.images,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub brand: Option<String>,
}

//----------------------------------------------   Receipts  ---------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiptQuery {
    pub receipt_id: Option<i64>,
    pub order_id: Option<i64>,
}
