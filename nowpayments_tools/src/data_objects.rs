use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The body of a `POST /v1/payment` request.
///
/// `purchase_id` is the caller-chosen purchase reference; `order_id` is the human-readable order number. Both are
/// echoed back by the processor and in notifications.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub price_amount: f64,
    pub price_currency: String,
    pub pay_currency: String,
    pub purchase_id: String,
    pub order_id: String,
    pub order_description: String,
    pub success_url: String,
    pub cancel_url: String,
    pub ipn_callback_url: String,
}

/// The processor's answer to a payment-creation request: where and how much to pay.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentQuote {
    #[serde(deserialize_with = "string_or_number")]
    pub payment_id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    pub pay_address: String,
    pub pay_amount: f64,
    pub pay_currency: String,
    #[serde(default)]
    pub expiration_estimate_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceEstimate {
    pub estimated_amount: f64,
    pub currency_from: String,
    pub currency_to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CurrenciesResponse {
    pub currencies: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MinAmountResponse {
    pub min_amount: f64,
}

/// NOWPayments is inconsistent about whether `payment_id` is a JSON string or number, so accept both.
pub(crate) fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }
    Ok(match StringOrNumber::deserialize(de)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}
