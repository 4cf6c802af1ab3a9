use chrono::{DateTime, Utc};
use csp_common::Money;
use serde::{Deserialize, Serialize};
use shop_payment_engine::db_types::{Order, OrderDraft, OrderItem, Payment};

/// The body of `POST /api/checkout`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub telegram_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(flatten)]
    pub order: OrderDraft,
}

/// The body of `POST /api/orders/{order_number}/payments`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentParams {
    pub pay_currency: String,
}

/// Everything the storefront needs to render the "pay now" screen, including the URI it encodes into a QR code.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentQuoteResponse {
    pub payment_id: String,
    pub status: String,
    pub pay_address: String,
    pub pay_amount: f64,
    pub pay_currency: String,
    pub price_amount: Money,
    pub price_currency: String,
    pub payment_uri: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentQuoteResponse {
    fn from(p: &Payment) -> Self {
        let payment_uri = nowpayments_tools::helpers::payment_uri(&p.pay_currency, &p.pay_address, p.pay_amount);
        Self {
            payment_id: p.payment_id.clone(),
            status: p.status.to_string(),
            pay_address: p.pay_address.clone(),
            pay_amount: p.pay_amount,
            pay_currency: p.pay_currency.clone(),
            price_amount: p.price_amount,
            price_currency: p.price_currency.clone(),
            payment_uri,
            expires_at: p.expires_at,
        }
    }
}

/// The response of `GET /api/orders/{order_number}`: the order with its items and payment attempts.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}
