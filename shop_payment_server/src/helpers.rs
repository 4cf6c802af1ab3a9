use actix_web::HttpRequest;

use crate::config::ProxyConfig;

/// The remote peer's address for log lines. Proxy headers are only consulted when the configuration says the
/// deployment sits behind a proxy, since clients can forge them otherwise.
pub fn get_remote_ip(req: &HttpRequest, proxy: &ProxyConfig) -> String {
    let info = req.connection_info();
    let from_headers = (proxy.use_x_forwarded_for || proxy.use_forwarded).then(|| info.realip_remote_addr()).flatten();
    from_headers.or_else(|| info.peer_addr()).unwrap_or("unknown").to_string()
}
