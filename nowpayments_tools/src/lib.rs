//! A typed client for the NOWPayments cryptocurrency payment processor.
//!
//! Everything that knows the processor's wire format lives in this crate: the REST API calls (payment creation,
//! status polling, currency listing, amount estimation) and the IPN signature scheme (HMAC-SHA512 over the raw
//! notification body). The reconciliation engine consumes the typed objects exported here and never touches the
//! external schema directly.
mod api;
mod config;
mod error;
mod ipn;

mod data_objects;

pub mod helpers;
pub mod signature;

pub use api::NowPaymentsApi;
pub use config::NowPaymentsConfig;
pub use data_objects::{PaymentQuote, PaymentRequest, PriceEstimate};
pub use error::NowPaymentsApiError;
pub use ipn::{IpnOutcome, IpnPayload};
