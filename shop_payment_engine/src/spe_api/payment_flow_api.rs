//! The payment flow API is the single entry point for everything that moves money through the shop: checkout,
//! opening payments with the processor, and consuming the processor's signed status notifications.
use log::*;
use nowpayments_tools::{signature::verify_ipn_signature, IpnPayload, NowPaymentsApi, PaymentQuote, PaymentRequest};

use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderDraft, OrderNumber, OrderStatus, Payment, PaymentStatus,
        PaymentUpdate},
    events::{EventProducers, OrderPaidEvent},
    helpers::new_order_number,
    spe_api::errors::PaymentFlowError,
    traits::{PaymentGatewayDatabase, ReconciliationOutcome},
};

/// `PaymentFlowApi` orchestrates the payment lifecycle against a backend `B` and the NOWPayments REST API.
///
/// It is the sole writer of payment status and the sole trigger of order-status advancement on payment
/// completion. Fulfillment side effects run after the state change has committed and are best-effort: a failed
/// loyalty award or token issue is logged and retried by the next replayed notification, never by rolling back
/// the payment.
pub struct PaymentFlowApi<B> {
    db: B,
    gateway: NowPaymentsApi,
    producers: EventProducers,
}

impl<B> PaymentFlowApi<B>
where B: PaymentGatewayDatabase
{
    pub fn new(db: B, gateway: NowPaymentsApi, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    /// Opens a new order for the customer. The user record is created on first contact; the order lands as
    /// `Pending`/`Pending` with its item snapshots and a freshly generated order number.
    pub async fn checkout(
        &self,
        telegram_id: &str,
        username: Option<&str>,
        draft: OrderDraft,
    ) -> Result<Order, PaymentFlowError> {
        let user = self.db.fetch_or_create_user(telegram_id, username).await?;
        let mut order = NewOrder::new(new_order_number(), user.id, draft.currency).with_adjustments(
            draft.discount_amount,
            draft.tax_amount,
            draft.shipping_amount,
        );
        order.items = draft.items;
        let order = self.db.insert_order(order).await?;
        info!("🛒️ Order {} opened for user {} ({} {})", order.order_number, user.id, order.total_amount, order.currency);
        Ok(order)
    }

    /// Opens a payment with the processor for the given order and records it locally.
    ///
    /// The order must still be `Pending` and must not have another payment in flight. The processor call happens
    /// before anything is written, so a gateway failure leaves no local state behind.
    pub async fn create_payment(
        &self,
        order_number: &OrderNumber,
        pay_currency: &str,
    ) -> Result<(Payment, PaymentQuote), PaymentFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| PaymentFlowError::OrderNotFound(order_number.clone()))?;
        if order.status != OrderStatus::Pending {
            warn!("🛒️ Order {order_number} is {}; refusing to open a payment for it", order.status);
            return Err(PaymentFlowError::OrderNotPayable(order_number.clone()));
        }
        if self.db.fetch_payments_for_order(order.id).await?.iter().any(|p| !p.status.is_terminal()) {
            return Err(PaymentFlowError::PaymentInProgress(order_number.clone()));
        }
        let purchase_id = nowpayments_tools::helpers::new_purchase_id(order_number.as_str());
        let config = self.gateway.config();
        let request = PaymentRequest {
            price_amount: order.total_amount.to_f64(),
            price_currency: order.currency.to_lowercase(),
            pay_currency: pay_currency.to_lowercase(),
            purchase_id: purchase_id.clone(),
            order_id: order_number.as_str().to_string(),
            order_description: format!("Order {order_number}"),
            success_url: config.success_url(),
            cancel_url: config.cancel_url(),
            ipn_callback_url: config.ipn_callback_url(),
        };
        let quote = self.gateway.create_payment(&request).await?;
        let status = quote.payment_status.as_deref().map(PaymentStatus::from_gateway).unwrap_or(PaymentStatus::Waiting);
        let payment = NewPayment {
            order_id: order.id,
            payment_id: quote.payment_id.clone(),
            status,
            pay_address: quote.pay_address.clone(),
            price_amount: order.total_amount,
            price_currency: order.currency.clone(),
            pay_amount: quote.pay_amount,
            pay_currency: quote.pay_currency.clone(),
            purchase_id,
            expires_at: quote.expiration_estimate_date,
        };
        let payment = self.db.insert_payment(payment).await?;
        info!("🛒️ Payment {} opened for order {order_number}", payment.payment_id);
        Ok((payment, quote))
    }

    /// Consumes a signed processor notification.
    ///
    /// The signature is verified over the raw body before the body is parsed; an unverifiable notification is
    /// rejected without touching the database. A verified report is applied through the reconciliation state
    /// machine; the fulfillment side effects run when this report completed the payment, and again (idempotently)
    /// when a finished payment is replayed, so a fulfillment failure is repaired by the next replay.
    pub async fn apply_notification(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<ReconciliationOutcome, PaymentFlowError> {
        if !verify_ipn_signature(&self.gateway.config().ipn_secret, body, signature) {
            warn!("🛒️ Discarding a payment notification with a bad signature");
            return Err(PaymentFlowError::InvalidSignature);
        }
        let payload: IpnPayload =
            serde_json::from_slice(body).map_err(|e| PaymentFlowError::InvalidNotification(e.to_string()))?;
        self.apply_update(PaymentUpdate::from(payload)).await
    }

    /// Asks the processor for the current status of a payment and runs the answer through the same
    /// reconciliation path as a notification. Useful when a webhook was missed.
    pub async fn poll_payment_status(&self, payment_id: &str) -> Result<ReconciliationOutcome, PaymentFlowError> {
        let payload = self.gateway.payment_status(payment_id).await?;
        self.apply_update(PaymentUpdate::from(payload)).await
    }

    async fn apply_update(&self, update: PaymentUpdate) -> Result<ReconciliationOutcome, PaymentFlowError> {
        let outcome = self.db.apply_payment_update(update).await?;
        match &outcome {
            ReconciliationOutcome::Completed { payment, order } => {
                self.fulfill(order).await;
                for producer in &self.producers.order_paid_producer {
                    producer.publish_event(OrderPaidEvent::new(order.clone(), payment.clone())).await;
                }
            },
            ReconciliationOutcome::Unchanged { payment } | ReconciliationOutcome::Stale { payment }
                if payment.status == PaymentStatus::Finished =>
            {
                // A replayed completion re-runs the fulfillment handlers. They are idempotent, so this only
                // writes whatever a previous run failed to. The order-paid event stays with the one report
                // that claimed the transition.
                if let Some(order) = self.db.fetch_order_by_id(payment.order_id).await? {
                    if order.status == OrderStatus::Paid {
                        self.fulfill(&order).await;
                    }
                }
            },
            _ => {},
        }
        Ok(outcome)
    }

    /// Runs the fulfillment side effects for a freshly paid order. Each effect commits independently and a
    /// failure is logged rather than propagated: the payment has been received and recorded, and both effects
    /// are idempotent, so a replayed notification completes whatever is missing.
    async fn fulfill(&self, order: &Order) {
        match self.db.award_loyalty_points(order).await {
            Ok(Some(entry)) => {
                debug!("🛒️ Order {}: {} loyalty points awarded", order.order_number, entry.points);
            },
            Ok(None) => {},
            Err(e) => {
                error!("🛒️ Loyalty award failed for order {}. The next status replay will retry. {e}", order.order_number);
            },
        }
        match self.db.issue_delivery_tokens(order).await {
            Ok(tokens) if !tokens.is_empty() => {
                debug!("🛒️ Order {}: {} download token(s) issued", order.order_number, tokens.len());
            },
            Ok(_) => {},
            Err(e) => {
                error!(
                    "🛒️ Digital delivery failed for order {}. The next status replay will retry. {e}",
                    order.order_number
                );
            },
        }
    }

    /// The cryptocurrencies customers may choose from. A processor outage degrades to an empty list rather than
    /// an error, since the storefront can still render.
    pub async fn supported_currencies(&self) -> Vec<String> {
        match self.gateway.available_currencies().await {
            Ok(currencies) => currencies,
            Err(e) => {
                warn!("🛒️ Could not fetch the currency list from the processor. {e}");
                Vec::new()
            },
        }
    }

    pub fn gateway(&self) -> &NowPaymentsApi {
        &self.gateway
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
