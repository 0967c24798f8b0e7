use std::env;

use log::*;
use storefront_common::Secret;

const DEFAULT_GATEWAY_URL: &str = "https://api.payment-gateway.example.com/v1";

#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway's REST API.
    pub base_url: String,
    /// The server-side API key used to authorize intent creation.
    pub secret_key: Secret<String>,
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("SFS_GATEWAY_URL").ok().unwrap_or_else(|| DEFAULT_GATEWAY_URL.into());
        let secret_key = env::var("SFS_GATEWAY_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ SFS_GATEWAY_SECRET_KEY is not set. Payment intent creation will be rejected by the gateway.");
            String::default()
        });
        Self { base_url, secret_key: Secret::new(secret_key) }
    }
}
