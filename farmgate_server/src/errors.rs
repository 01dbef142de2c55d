use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use farmgate_engine::{
    providers::ProviderError,
    CatalogApiError,
    DeliveryApiError,
    OrderFlowError,
    PaymentFlowError,
};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
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
    #[error(transparent)]
    OrderFlow(#[from] OrderFlowError),
    #[error(transparent)]
    PaymentFlow(#[from] PaymentFlowError),
    #[error(transparent)]
    Catalog(#[from] CatalogApiError),
    #[error(transparent)]
    Delivery(#[from] DeliveryApiError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::OrderFlow(e) => match e {
                OrderFlowError::Validation(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
                OrderFlowError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                OrderFlowError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::Forbidden(_) => StatusCode::FORBIDDEN,
                OrderFlowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::PaymentFlow(e) => match e {
                PaymentFlowError::Validation(_) => StatusCode::BAD_REQUEST,
                PaymentFlowError::AlreadyInitiated(_) => StatusCode::BAD_REQUEST,
                PaymentFlowError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                PaymentFlowError::NotFound(_) => StatusCode::NOT_FOUND,
                PaymentFlowError::Forbidden(_) => StatusCode::FORBIDDEN,
                PaymentFlowError::Provider(p) => match p {
                    ProviderError::NotConfigured(_) => StatusCode::BAD_REQUEST,
                    ProviderError::InvalidPayload(..) => StatusCode::BAD_REQUEST,
                    ProviderError::MissingSignature => StatusCode::BAD_REQUEST,
                    ProviderError::InvalidSignature => StatusCode::BAD_REQUEST,
                    ProviderError::Timeout(..) => StatusCode::GATEWAY_TIMEOUT,
                    ProviderError::Rejected(..) => StatusCode::BAD_GATEWAY,
                },
                PaymentFlowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(e) => match e {
                CatalogApiError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogApiError::ProductInUse(_) => StatusCode::BAD_REQUEST,
                CatalogApiError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogApiError::Forbidden(_) => StatusCode::FORBIDDEN,
                CatalogApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Delivery(e) => match e {
                DeliveryApiError::Validation(_) => StatusCode::BAD_REQUEST,
                DeliveryApiError::NotFound(_) => StatusCode::NOT_FOUND,
                DeliveryApiError::Forbidden(_) => StatusCode::FORBIDDEN,
                DeliveryApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Internal details go to the log, never over the wire.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("💻️ {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No authentication token was provided.")]
    MissingToken,
    #[error("The access token is invalid. {0}")]
    ValidationError(String),
    #[error("The access token has expired.")]
    ExpiredToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}
