//! Shop Payment Engine
//!
//! The engine owns the order ledger and the payment reconciliation state machine for the crypto shop. It accepts
//! new orders, opens payments against the external processor, consumes signed status notifications, and drives
//! the fulfillment side effects (loyalty award, digital delivery) exactly once per completed payment.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never need to
//!    access the database directly; use the public API instead. The exception is the data types used in the
//!    database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`PaymentFlowApi`]). This is the sole writer of payment status and the sole trigger
//!    of order-status advancement on payment completion. Backends implement the traits in [`mod@traits`].
//!
//! The engine also emits events when orders are paid. A simple actor framework lets you hook into these events
//! and perform custom actions (customer notification, shipping kickoff, ...).
pub mod db_types;
pub mod events;
pub mod helpers;
mod spe_api;
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use spe_api::{errors::PaymentFlowError, payment_flow_api::PaymentFlowApi};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{PaymentGatewayDatabase, PaymentGatewayError, ReconciliationOutcome};
