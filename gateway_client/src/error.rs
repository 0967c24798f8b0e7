use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize the gateway client. {0}")]
    Initialization(String),
    #[error("Gateway request failed. {0}")]
    RequestError(String),
    #[error("Could not deserialize gateway response. {0}")]
    JsonError(String),
    #[error("The gateway rejected the request with status {status}: {message}")]
    QueryError { status: u16, message: String },
}
