//! HTTP utility functions for extracting request information.

use crate::config::ProxyConfig;
use actix_web::{HttpRequest, web};
use std::net::IpAddr;

const INTERNAL_KEY_HEADER: &str = "X-Internal-API-Key";
const DEFAULT_INTERNAL_KEY: &str = "dev-internal-key";
const FORWARDED_HEADERS: [&str; 4] = [
    "X-Forwarded-For",
    "X-Real-IP",
    "CF-Connecting-IP",
    "X-Cluster-Client-IP",
];

fn trusts_forwarded_headers(req: &HttpRequest) -> bool {
    req.app_data::<web::Data<ProxyConfig>>()
        .is_some_and(|config| config.trust_forwarded_headers)
}

fn forwarded_ip(req: &HttpRequest, header_name: &str) -> Option<IpAddr> {
    let value = req.headers().get(header_name)?.to_str().ok()?;
    // X-Forwarded-For can contain multiple IPs, take the first one
    value.split(',').next()?.trim().parse().ok()
}

/// Client address of the request.
///
/// Proxy headers are only consulted when [`ProxyConfig`] is registered with
/// `trust_forwarded_headers`; otherwise this is the socket peer.
pub fn client_ip(req: &HttpRequest) -> Option<IpAddr> {
    if trusts_forwarded_headers(req)
        && let Some(ip) = FORWARDED_HEADERS
            .iter()
            .find_map(|name| forwarded_ip(req, name))
    {
        return Some(ip);
    }

    req.peer_addr().map(|addr| addr.ip())
}

/// Client address as text, `"unknown"` when there is no peer
pub fn extract_client_ip(req: &HttpRequest) -> String {
    client_ip(req)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Route template used as a metrics label.
///
/// Unmatched paths share one label so that scanners cannot blow up the
/// label cardinality.
pub fn route_label(req: &HttpRequest) -> String {
    req.match_pattern()
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Loopback or RFC 1918 address (IPv4-mapped IPv6 included)
pub fn is_private_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| v4.is_loopback() || v4.is_private())
        }
    }
}

/// Whether the caller may use internal-only endpoints.
///
/// Accepts a matching `X-Internal-API-Key` header (`INTERNAL_API_KEY`,
/// default `dev-internal-key`) or a loopback/private client address.
pub fn is_internal_request(req: &HttpRequest) -> bool {
    if let Some(api_key) = req.headers().get(INTERNAL_KEY_HEADER)
        && let Ok(key_str) = api_key.to_str()
    {
        let expected_key = std::env::var("INTERNAL_API_KEY")
            .unwrap_or_else(|_| DEFAULT_INTERNAL_KEY.to_string());
        return key_str == expected_key;
    }

    client_ip(req).is_some_and(is_private_address)
}
