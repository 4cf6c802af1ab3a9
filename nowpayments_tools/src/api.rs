use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::NowPaymentsConfig,
    data_objects::{CurrenciesResponse, MinAmountResponse, PaymentQuote, PaymentRequest, PriceEstimate},
    IpnPayload,
    NowPaymentsApiError,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A thin, typed wrapper over the NOWPayments REST API.
///
/// Every call either returns a fully deserialized response object or an error; a failed call never leaves partial
/// state behind, so callers are free to retry. Callers must treat a failed `create_payment` as "no payment was
/// created" and issue a fresh request (with a fresh purchase reference) if the customer retries.
#[derive(Clone)]
pub struct NowPaymentsApi {
    config: NowPaymentsConfig,
    client: Arc<Client>,
}

impl NowPaymentsApi {
    pub fn new(config: NowPaymentsConfig) -> Result<Self, NowPaymentsApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        headers.insert("x-api-key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &NowPaymentsConfig {
        &self.config
    }

    /// Submit a payment-creation request. On success the processor returns the pay-to address, the crypto amount
    /// and its payment id.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentQuote, NowPaymentsApiError> {
        let quote: PaymentQuote =
            self.rest_query(Method::POST, "/v1/payment", &[], Some(request)).await?;
        info!(
            "💱️ Created payment {} for order {}: {} {} to {}",
            quote.payment_id, request.order_id, quote.pay_amount, quote.pay_currency, quote.pay_address
        );
        Ok(quote)
    }

    /// Poll the current status of a payment. Used for manual refresh; the authoritative path is the signed IPN.
    pub async fn payment_status(&self, payment_id: &str) -> Result<IpnPayload, NowPaymentsApiError> {
        let path = format!("/v1/payment/{payment_id}");
        self.rest_query::<IpnPayload, ()>(Method::GET, &path, &[], None).await
    }

    /// The set of cryptocurrencies the processor currently accepts.
    pub async fn available_currencies(&self) -> Result<Vec<String>, NowPaymentsApiError> {
        let response: CurrenciesResponse =
            self.rest_query::<_, ()>(Method::GET, "/v1/currencies", &[], None).await?;
        Ok(response.currencies)
    }

    /// The smallest amount the processor will accept for a target currency, quoted from USD.
    pub async fn minimum_payment_amount(&self, pay_currency: &str) -> Result<f64, NowPaymentsApiError> {
        let currency = pay_currency.to_lowercase();
        let params = [("currency_from", "usd"), ("currency_to", currency.as_str())];
        let response: MinAmountResponse =
            self.rest_query::<_, ()>(Method::GET, "/v1/min-amount", &params, None).await?;
        Ok(response.min_amount)
    }

    /// Estimate how much crypto a fiat amount converts to.
    pub async fn estimate_price(
        &self,
        amount: f64,
        currency_from: &str,
        currency_to: &str,
    ) -> Result<PriceEstimate, NowPaymentsApiError> {
        let amount = amount.to_string();
        let (from, to) = (currency_from.to_lowercase(), currency_to.to_lowercase());
        let params = [("amount", amount.as_str()), ("currency_from", from.as_str()), ("currency_to", to.as_str())];
        self.rest_query::<_, ()>(Method::GET, "/v1/estimate", &params, None).await
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, NowPaymentsApiError> {
        let url = format!("{}{path}", self.config.base_url);
        trace!("💱️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await.map_err(|e| NowPaymentsApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💱️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| NowPaymentsApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| NowPaymentsApiError::RequestError(e.to_string()))?;
            warn!("💱️ Processor query failed with status {status}: {message}");
            Err(NowPaymentsApiError::QueryError { status, message })
        }
    }
}
