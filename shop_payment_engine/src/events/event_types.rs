use serde::Serialize;

use crate::db_types::{Order, Payment};

/// Fired once per completed payment, after the order has been marked paid and fulfillment has run.
///
/// Handlers are stateless and receive a snapshot of the order and the payment that settled it. Typical uses are
/// customer notification and shipping kickoff.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderPaidEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}
