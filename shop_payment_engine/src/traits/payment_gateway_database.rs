use thiserror::Error;

use crate::{
    db_types::{
        DeliveryToken,
        LoyaltyTransaction,
        NewOrder,
        NewPayment,
        Order,
        OrderItem,
        OrderNumber,
        Payment,
        PaymentUpdate,
        User,
    },
    traits::ReconciliationOutcome,
};

/// This trait defines the highest level of behaviour for backends supporting the payment engine.
///
/// This behaviour includes:
/// * Creating users and orders as customers check out.
/// * Recording payment attempts opened against the external processor.
/// * Applying processor status reports to payments (the reconciliation state machine).
/// * Carrying out fulfillment side effects when a payment completes.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches the user with the given telegram id, creating a fresh record (zero points, zero totals) if none
    /// exists. The username is refreshed on every call since it can change on the messenger side.
    async fn fetch_or_create_user(
        &self,
        telegram_id: &str,
        username: Option<&str>,
    ) -> Result<User, PaymentGatewayError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, PaymentGatewayError>;

    /// Takes a new order and, in a single atomic transaction, stores the order and its item snapshots.
    ///
    /// The order is created `Pending`/`Pending` and the stored totals are computed here so that the total
    /// invariant holds. Fails if the order number is already taken.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, PaymentGatewayError>;

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError>;

    /// Records a payment attempt that has just been opened with the processor.
    ///
    /// Fails if the external payment id already exists, or if the order already has a non-terminal payment (at
    /// most one attempt may be in flight per order).
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentGatewayError>;

    /// Fetches the payment with the given external (processor-assigned) payment id.
    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentGatewayError>;

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, PaymentGatewayError>;

    /// Applies a validated status report to the stored payment. This is the reconciliation state machine and the
    /// only write path for payment status.
    ///
    /// In a single transaction:
    /// * If the reported status equals the stored one, incidental fields (`actually_paid`, `txid`, ...) are
    ///   refreshed and [`ReconciliationOutcome::Unchanged`] is returned.
    /// * If the stored status is terminal, nothing is written and [`ReconciliationOutcome::Stale`] is returned.
    /// * Otherwise the status is advanced with a compare-and-set on the old status, so two concurrent reports for
    ///   the same payment cannot both claim the same transition.
    /// * On the transition into `Finished`, the order is marked `Paid` in the same transaction and
    ///   [`ReconciliationOutcome::Completed`] is returned. This happens at most once per payment.
    ///
    /// Fulfillment side effects are NOT run here; the caller triggers them on `Completed`, outside this
    /// transaction, so a fulfillment failure can never roll back a recorded payment.
    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<ReconciliationOutcome, PaymentGatewayError>;

    /// Awards loyalty points for a paid order: one point per whole unit of fiat total.
    ///
    /// In a single transaction, inserts an `earned` ledger entry and increments the user's point balance and
    /// lifetime totals. Idempotent: if an `earned` entry for this order already exists, nothing is written and
    /// `None` is returned. Orders that round to zero points also return `None`.
    async fn award_loyalty_points(&self, order: &Order) -> Result<Option<LoyaltyTransaction>, PaymentGatewayError>;

    /// Issues download tokens for the digital items of a paid order.
    ///
    /// Only items that do not already carry a token are touched, so replays never regenerate or extend existing
    /// grants. Physical items are ignored. Returns the freshly issued tokens.
    async fn issue_delivery_tokens(&self, order: &Order) -> Result<Vec<DeliveryToken>, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with order number {0}")]
    OrderAlreadyExists(OrderNumber),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("The requested payment does not exist for payment id {0}")]
    PaymentNotFound(String),
    #[error("Cannot insert payment, since it already exists with payment id {0}")]
    PaymentAlreadyExists(String),
    #[error("Order {0} already has a payment in flight")]
    PaymentInProgress(OrderNumber),
    #[error("The requested user id {0} does not exist")]
    UserNotFound(i64),
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}

impl From<crate::db_types::OrderValidationError> for PaymentGatewayError {
    fn from(e: crate::db_types::OrderValidationError) -> Self {
        PaymentGatewayError::InvalidOrder(e.0)
    }
}
