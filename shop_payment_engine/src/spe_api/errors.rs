use nowpayments_tools::NowPaymentsApiError;
use thiserror::Error;

use crate::{db_types::OrderNumber, traits::PaymentGatewayError};

#[derive(Debug, Error)]
pub enum PaymentFlowError {
    #[error("The notification signature is missing or does not match the body.")]
    InvalidSignature,
    #[error("Could not interpret the notification payload. {0}")]
    InvalidNotification(String),
    #[error("No payment exists with payment id {0}")]
    PaymentNotFound(String),
    #[error("No order exists with order number {0}")]
    OrderNotFound(OrderNumber),
    #[error("Order {0} already has a payment in flight")]
    PaymentInProgress(OrderNumber),
    #[error("Order {0} is no longer payable")]
    OrderNotPayable(OrderNumber),
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
    #[error("The payment processor request failed. {0}")]
    GatewayError(#[from] NowPaymentsApiError),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentGatewayError> for PaymentFlowError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::OrderNotFound(n) => Self::OrderNotFound(n),
            PaymentGatewayError::PaymentNotFound(id) => Self::PaymentNotFound(id),
            PaymentGatewayError::PaymentInProgress(n) => Self::PaymentInProgress(n),
            PaymentGatewayError::InvalidOrder(s) => Self::InvalidOrder(s),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
