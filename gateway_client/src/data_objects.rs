use serde::{Deserialize, Serialize};
use storefront_common::Money;

/// The metadata attached to every payment intent. The gateway echoes it back verbatim in webhook events, and it is
/// the only link from a gateway transaction to a storefront order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub order_id: i64,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPaymentIntent {
    /// Amount in the smallest currency unit (cents).
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub metadata: IntentMetadata,
}

impl NewPaymentIntent {
    pub fn new(amount: Money, currency: &str, description: String, metadata: IntentMetadata) -> Self {
        Self { amount: amount.value(), currency: currency.to_lowercase(), description, metadata }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// The gateway's transaction reference, e.g. `pi_3PQx…`.
    pub id: String,
    /// Handed to the browser so it can complete the payment against the gateway directly.
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub metadata: Option<IntentMetadata>,
}
