//! The engine public API.
pub mod errors;
pub mod payment_flow_api;
