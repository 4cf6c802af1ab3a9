//! #  Database management and control.
//!
//! This module provides the interface contracts of the payment engine database *backends*.
//!
//! ## Orders and payments
//! An order is the merchant-side record of what the customer bought. A payment is one processor-side attempt to
//! settle that order. The [`PaymentGatewayDatabase`] trait provides the mechanisms for recording both as they
//! enter the system, for applying processor status reports to payments, and for carrying out the fulfillment
//! side effects (loyalty award, digital delivery) when a payment completes.
//!
//! All status-changing writes happen inside a single database transaction per notification, so partially applied
//! updates are never visible.
mod data_objects;
mod payment_gateway_database;

pub use data_objects::ReconciliationOutcome;
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
