use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use gateway_client::GatewayApiError;
use storefront_engine::traits::{AccountError, CatalogError, OrderFlowError, ReceiptError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Access denied.")]
    AccessDenied,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Payment service temporarily unavailable. Please try again. {0}")]
    PaymentGatewayUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentGatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    TokenExpired,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::EmptyOrder => Self::ValidationError(e.to_string()),
            OrderFlowError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InsufficientStock(_) => Self::Conflict(e.to_string()),
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::OwnershipViolation => Self::AccessDenied,
            OrderFlowError::NotCancellable(_) => Self::Conflict(e.to_string()),
            OrderFlowError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogError::ProductInOpenOrder(_) => Self::Conflict(e.to_string()),
            CatalogError::InvalidProduct(msg) => Self::ValidationError(msg),
            CatalogError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<AccountError> for ServerError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            AccountError::AddressNotFound(_) => Self::NoRecordFound(e.to_string()),
            AccountError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<ReceiptError> for ServerError {
    fn from(e: ReceiptError) -> Self {
        match e {
            ReceiptError::ReceiptNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReceiptError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReceiptError::OwnershipViolation => Self::AccessDenied,
            ReceiptError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReceiptError::AddressNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReceiptError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<GatewayApiError> for ServerError {
    fn from(e: GatewayApiError) -> Self {
        Self::PaymentGatewayUnavailable(e.to_string())
    }
}
