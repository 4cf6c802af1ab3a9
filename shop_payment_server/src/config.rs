use std::env;

use csp_common::helpers::{env_or_default, parse_boolean_flag};
use log::*;
use nowpayments_tools::NowPaymentsConfig;

const DEFAULT_CSP_HOST: &str = "127.0.0.1";
const DEFAULT_CSP_PORT: u16 = 8480;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Proxy header handling for remote-IP logging.
    pub proxy: ProxyConfig,
    /// NOWPayments REST and notification-signing configuration.
    pub nowpayments: NowPaymentsConfig,
}

/// Which proxy headers to trust when working out the remote peer's IP address. Only enable these when the
/// server actually sits behind a proxy that sets them, since clients can forge the headers otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CSP_HOST.to_string(),
            port: DEFAULT_CSP_PORT,
            database_url: String::default(),
            proxy: ProxyConfig::default(),
            nowpayments: NowPaymentsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env_or_default("CSP_HOST", DEFAULT_CSP_HOST);
        let port = env::var("CSP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CSP_PORT. {e} Using the default, {DEFAULT_CSP_PORT}, instead."
                    );
                    DEFAULT_CSP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CSP_PORT);
        let database_url = env::var("CSP_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CSP_DATABASE_URL is not set. Please set it to the URL for the shop database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("CSP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("CSP_USE_FORWARDED").ok(), false);
        let nowpayments = NowPaymentsConfig::from_env_or_default();
        Self { host, port, database_url, proxy: ProxyConfig { use_x_forwarded_for, use_forwarded }, nowpayments }
    }
}
