//! A thin REST client for the external payment gateway.
//!
//! The storefront never moves money itself. It asks the gateway for a payment intent (an amount, a currency and
//! metadata tying the intent back to an order), hands the intent's client secret to the browser, and afterwards
//! mirrors the gateway's verdict onto the order record. The verdict arrives either synchronously to the client or
//! asynchronously via a signed webhook.

mod api;
mod config;
pub mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{IntentMetadata, NewPaymentIntent, PaymentIntent};
pub use error::GatewayApiError;
