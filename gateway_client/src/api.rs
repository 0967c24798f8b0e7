use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{NewPaymentIntent, PaymentIntent},
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = format!("{}{path}", self.config.base_url);
        trace!("Sending gateway query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Gateway query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RequestError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    /// Create a payment intent for an order. The returned intent carries the client secret the browser needs to
    /// complete the payment, and the gateway will echo the metadata back in its webhook events.
    pub async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayApiError> {
        debug!("💳️ Creating payment intent for order {} ({})", intent.metadata.order_id, intent.amount);
        let result: PaymentIntent = self.rest_query(Method::POST, "/payment_intents", Some(intent)).await?;
        info!("💳️ Payment intent {} created", result.id);
        Ok(result)
    }

    /// Fetch the current state of a payment intent by its reference.
    pub async fn fetch_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayApiError> {
        let path = format!("/payment_intents/{id}");
        self.rest_query(Method::GET, &path, Option::<()>::None).await
    }
}
