use std::env;

use gateway_client::GatewayConfig;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use storefront_common::{Money, Secret};
use storefront_engine::order_objects::PricingConfig;

use crate::errors::ServerError;

const DEFAULT_SFS_HOST: &str = "127.0.0.1";
const DEFAULT_SFS_PORT: u16 = 8370;
const DEFAULT_SHIPPING_FEE_CENTS: i64 = 1_000;
const DEFAULT_TAX_BASIS_POINTS: i64 = 800;
const DEFAULT_CURRENCY: &str = "USD";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Flat shipping fee and tax rate applied at checkout.
    pub pricing: PricingConfig,
    /// Connection details for the external payment gateway.
    pub gateway: GatewayConfig,
    /// Shared secret used to verify signatures on gateway webhook deliveries.
    pub gateway_webhook_secret: Secret<String>,
    /// Shared secret used to verify signatures on identity-provider webhook deliveries.
    pub identity_webhook_secret: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFS_HOST.to_string(),
            port: DEFAULT_SFS_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            pricing: PricingConfig::default(),
            gateway: GatewayConfig::default(),
            gateway_webhook_secret: Secret::default(),
            identity_webhook_secret: Secret::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFS_HOST").ok().unwrap_or_else(|| DEFAULT_SFS_HOST.into());
        let port = env::var("SFS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SFS_PORT. {e} Using the default, {DEFAULT_SFS_PORT}, instead."
                    );
                    DEFAULT_SFS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SFS_PORT);
        let database_url = env::var("SFS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SFS_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let pricing = configure_pricing();
        let gateway = GatewayConfig::new_from_env_or_default();
        let gateway_webhook_secret = required_secret("SFS_GATEWAY_WEBHOOK_SECRET");
        let identity_webhook_secret = required_secret("SFS_IDENTITY_WEBHOOK_SECRET");
        Self { host, port, database_url, auth, pricing, gateway, gateway_webhook_secret, identity_webhook_secret }
    }
}

fn required_secret(var: &str) -> Secret<String> {
    let value = env::var(var).ok().unwrap_or_else(|| {
        error!("🪛️ {var} is not set. Signed webhook deliveries depending on it will be rejected.");
        String::default()
    });
    Secret::new(value)
}

fn configure_pricing() -> PricingConfig {
    let shipping_fee = env::var("SFS_SHIPPING_FEE_CENTS")
        .map_err(|_| {
            info!("🪛️ SFS_SHIPPING_FEE_CENTS is not set. Using the default of {DEFAULT_SHIPPING_FEE_CENTS} cents.")
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for SFS_SHIPPING_FEE_CENTS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_SHIPPING_FEE_CENTS);
    let tax_basis_points = env::var("SFS_TAX_BASIS_POINTS")
        .map_err(|_| {
            info!("🪛️ SFS_TAX_BASIS_POINTS is not set. Using the default of {DEFAULT_TAX_BASIS_POINTS} (8%).")
        })
        .and_then(|s| {
            s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for SFS_TAX_BASIS_POINTS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_TAX_BASIS_POINTS);
    let currency = env::var("SFS_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    PricingConfig { shipping_fee: Money::from_cents(shipping_fee), tax_basis_points, currency }
}

//-------------------------------------------------  WebhookConfig  ---------------------------------------------------
/// The subset of the server configuration the webhook handlers need. Kept small so secrets are not passed around the
/// system more widely than necessary.
#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    pub gateway_secret: Secret<String>,
    pub identity_secret: Secret<String>,
}

impl WebhookConfig {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            gateway_secret: config.gateway_webhook_secret.clone(),
            identity_secret: config.identity_webhook_secret.clone(),
        }
    }
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
/// The shared secret used to verify tokens minted by the identity provider. The provider signs an HS256 JWT for every
/// signed-in user; this server only ever verifies.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT verification secret has not been set. I'm using a random value for this session. No \
             identity-provider token will verify against it, so every authenticated route will reject. Set \
             SFS_AUTH_JWT_SECRET to the secret shared with your identity provider. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("SFS_AUTH_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [SFS_AUTH_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "SFS_AUTH_JWT_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}
