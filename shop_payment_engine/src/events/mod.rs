//! Events that the payment engine emits, and the plumbing for subscribing to them.
//!
//! The only event today is [`OrderPaidEvent`], fired after a payment completes and fulfillment has run. Hooks
//! are registered up front via [`EventHooks`]; the server wires them into the API at startup.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::OrderPaidEvent;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
