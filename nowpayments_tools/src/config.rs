use std::env;

use csp_common::Secret;
use log::*;

pub const DEFAULT_NOWPAYMENTS_BASE_URL: &str = "https://api.nowpayments.io";

/// Connection and trust configuration for the NOWPayments API.
///
/// The `ipn_secret` is the shared secret the processor uses to sign asynchronous payment notifications. An empty
/// secret means every notification will be rejected, which fails safe but renders the webhook useless, so the
/// loader shouts about it.
#[derive(Clone, Debug, Default)]
pub struct NowPaymentsConfig {
    /// Base URL of the NOWPayments REST API, without a trailing slash.
    pub base_url: String,
    pub api_key: Secret<String>,
    pub ipn_secret: Secret<String>,
    /// Public base URL of this deployment. Success/cancel/IPN callback URLs are derived from it.
    pub callback_base_url: String,
}

impl NowPaymentsConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("CSP_NOWPAYMENTS_BASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ CSP_NOWPAYMENTS_BASE_URL is not set. Using the default, {DEFAULT_NOWPAYMENTS_BASE_URL}.");
            DEFAULT_NOWPAYMENTS_BASE_URL.into()
        });
        let api_key = env::var("CSP_NOWPAYMENTS_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ CSP_NOWPAYMENTS_API_KEY is not set. Please set it to your NOWPayments API key.");
            String::default()
        });
        let ipn_secret = env::var("CSP_NOWPAYMENTS_IPN_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ CSP_NOWPAYMENTS_IPN_SECRET is not set. Payment notifications cannot be authenticated and will \
                 all be rejected."
            );
            String::default()
        });
        let callback_base_url = env::var("CSP_CALLBACK_BASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CSP_CALLBACK_BASE_URL is not set. Please set it to the public URL of this server.");
            String::default()
        });
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: Secret::new(api_key),
            ipn_secret: Secret::new(ipn_secret),
            callback_base_url: callback_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}/payment-success", self.callback_base_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/payment-cancel", self.callback_base_url)
    }

    pub fn ipn_callback_url(&self) -> String {
        format!("{}/webhook/payment-ipn", self.callback_base_url)
    }
}
