use serde::Serialize;

use crate::db_types::{Order, Payment};

/// The result of applying a processor status report to a payment record.
///
/// Exactly one variant carries fulfillment responsibility: `Completed` is returned at most once per payment, on
/// the transition into `Finished`, and callers trigger the loyalty and delivery side effects only then.
#[derive(Debug, Clone, Serialize)]
pub enum ReconciliationOutcome {
    /// The report matched the stored status. Incidental fields may have been refreshed, but no transition
    /// happened.
    Unchanged { payment: Payment },
    /// The payment moved to a new non-`Finished` status.
    Updated { payment: Payment },
    /// The stored status is terminal and the report arrived late or out of order. Nothing was written.
    Stale { payment: Payment },
    /// The payment transitioned into `Finished` and the order was marked `Paid` in the same transaction.
    Completed { payment: Payment, order: Order },
}

impl ReconciliationOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            Self::Unchanged { payment } |
            Self::Updated { payment } |
            Self::Stale { payment } |
            Self::Completed { payment, .. } => payment,
        }
    }

    /// The order that was just paid, if this outcome completed one.
    pub fn completed_order(&self) -> Option<&Order> {
        match self {
            Self::Completed { order, .. } => Some(order),
            _ => None,
        }
    }
}
