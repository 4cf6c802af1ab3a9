use serde::Deserialize;

use crate::data_objects::string_or_number;

/// The body of an asynchronous payment notification (IPN), and equally of a `GET /v1/payment/{id}` status poll.
///
/// `payment_id` and `payment_status` are mandatory; a body missing either fails deserialization and is treated as
/// a validation error by the caller. Everything else is incidental detail that is persisted when present.
#[derive(Debug, Clone, Deserialize)]
pub struct IpnPayload {
    #[serde(deserialize_with = "string_or_number")]
    pub payment_id: String,
    pub payment_status: String,
    #[serde(default)]
    pub actually_paid: Option<f64>,
    #[serde(default)]
    pub actually_paid_currency: Option<String>,
    #[serde(default)]
    pub outcome: Option<IpnOutcome>,
}

/// Blockchain settlement details reported once the processor sees the transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct IpnOutcome {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

impl IpnPayload {
    pub fn txid(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(|o| o.txid.as_deref())
    }

    pub fn network(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(|o| o.network.as_deref())
    }
}
