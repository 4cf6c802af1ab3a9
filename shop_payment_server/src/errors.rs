use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use shop_payment_engine::PaymentFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error. {0}")]
    CouldNotDeserializePayload(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("The notification signature is missing or invalid.")]
    InvalidSignature,
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the payment state. {0}")]
    PaymentConflict(String),
    #[error("The payment processor is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentConflict(_) => StatusCode::CONFLICT,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::InvalidSignature => Self::InvalidSignature,
            PaymentFlowError::InvalidNotification(s) => Self::InvalidRequestBody(s),
            PaymentFlowError::InvalidOrder(s) => Self::InvalidRequestBody(s),
            PaymentFlowError::PaymentNotFound(_) | PaymentFlowError::OrderNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentFlowError::PaymentInProgress(_) | PaymentFlowError::OrderNotPayable(_) => {
                Self::PaymentConflict(e.to_string())
            },
            PaymentFlowError::GatewayError(g) => Self::GatewayUnavailable(g.to_string()),
            PaymentFlowError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}
