use thiserror::Error;

#[derive(Debug, Error)]
pub enum NowPaymentsApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the payment processor: {0}")]
    RequestError(String),
    #[error("Could not deserialize processor response: {0}")]
    JsonError(String),
    #[error("Processor query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
