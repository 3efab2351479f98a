//! Client identity resolution for rate limiting.
//!
//! The rate limiter keys its counters on a stable per-client identity derived
//! from the request. Identity is the physical connection address unless
//! `TRUST_PROXY_HEADERS` is enabled, in which case the edge proxy's
//! `X-Forwarded-For` (left-most entry) or `X-Real-IP` header takes priority.
//!
//! # Spoofing resistance
//!
//! Proxy headers are only consulted when trust is explicitly configured, and
//! a header entry must parse as an IP address to be used. An unparseable
//! header falls back to the connection address instead of failing the
//! request: a malformed header cannot be used to bypass the limiter, and
//! legitimate traffic behind a sloppy proxy is not denied outright.
//!
//! When no address is available at all (neither trusted headers nor
//! connection info), all such requests share the `"unknown"` key and are
//! collectively limited - resolution failure never bypasses admission
//! control.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use tracing::{debug, warn};

/// Shared fallback key when no client address can be determined.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Opaque per-client rate-limit key (a normalized IP address, or `unknown`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }

    fn unknown() -> Self {
        Self(UNKNOWN_IDENTITY.to_string())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the rate-limit identity for a request. Pure; no side effects
/// beyond debug logging.
pub fn resolve_client_identity<B>(req: &Request<B>, trust_proxy_headers: bool) -> ClientIdentity {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(req) {
            return ClientIdentity::from_ip(ip);
        }
        debug!("No usable proxy header, falling back to connection address");
    }

    match connection_ip(req) {
        Some(ip) => ClientIdentity::from_ip(ip),
        None => {
            warn!("No client address available, using shared '{UNKNOWN_IDENTITY}' identity");
            ClientIdentity::unknown()
        }
    }
}

/// First parseable IP from the proxy headers, `X-Forwarded-For` before
/// `X-Real-IP`. The left-most forwarded-for entry is the original client;
/// later entries are intermediate proxies.
fn forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
        && let Ok(ip) = first.trim().parse::<IpAddr>()
    {
        return Some(ip);
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
        && let Ok(ip) = value.trim().parse::<IpAddr>()
    {
        return Some(ip);
    }

    None
}

/// Physical connection address, when the server was started with
/// `into_make_service_with_connect_info`.
fn connection_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_peer(peer: &str) -> Request<Body> {
        Request::builder()
            .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()))
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_connection_address_when_trust_disabled() {
        let req = request_with_peer("203.0.113.7:51234");
        let identity = resolve_client_identity(&req, false);
        assert_eq!(identity.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_header_ignored_when_trust_disabled() {
        let mut req = request_with_peer("203.0.113.7:51234");
        req.headers_mut()
            .insert("x-forwarded-for", "10.0.0.1".parse().unwrap());

        let identity = resolve_client_identity(&req, false);
        assert_eq!(identity.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_header_used_when_trusted() {
        let mut req = request_with_peer("10.0.0.5:443");
        req.headers_mut()
            .insert("x-forwarded-for", "198.51.100.20, 10.0.0.5".parse().unwrap());

        let identity = resolve_client_identity(&req, true);
        assert_eq!(identity.as_str(), "198.51.100.20");
    }

    #[test]
    fn test_real_ip_used_when_no_forwarded_for() {
        let mut req = request_with_peer("10.0.0.5:443");
        req.headers_mut()
            .insert("x-real-ip", "198.51.100.21".parse().unwrap());

        let identity = resolve_client_identity(&req, true);
        assert_eq!(identity.as_str(), "198.51.100.21");
    }

    #[test]
    fn test_malformed_forwarded_falls_back_to_connection() {
        let mut req = request_with_peer("203.0.113.7:51234");
        req.headers_mut()
            .insert("x-forwarded-for", "not-an-ip, garbage".parse().unwrap());

        let identity = resolve_client_identity(&req, true);
        assert_eq!(identity.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_ipv6_forwarded_entry() {
        let mut req = request_with_peer("10.0.0.5:443");
        req.headers_mut()
            .insert("x-forwarded-for", "2001:db8::1".parse().unwrap());

        let identity = resolve_client_identity(&req, true);
        assert_eq!(identity.as_str(), "2001:db8::1");
    }

    #[test]
    fn test_forwarded_entry_with_port_is_rejected() {
        // "ip:port" does not parse as an IpAddr; fall back to the peer.
        let mut req = request_with_peer("203.0.113.7:51234");
        req.headers_mut()
            .insert("x-forwarded-for", "192.168.1.1:8080".parse().unwrap());

        let identity = resolve_client_identity(&req, true);
        assert_eq!(identity.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_no_address_at_all_is_unknown() {
        let req = Request::builder().body(Body::empty()).unwrap();
        let identity = resolve_client_identity(&req, true);
        assert_eq!(identity.as_str(), UNKNOWN_IDENTITY);
    }

    #[test]
    fn test_same_peer_resolves_to_same_key() {
        let a = resolve_client_identity(&request_with_peer("203.0.113.7:1000"), false);
        let b = resolve_client_identity(&request_with_peer("203.0.113.7:2000"), false);
        // The ephemeral port never participates in the key.
        assert_eq!(a, b);
    }
}
