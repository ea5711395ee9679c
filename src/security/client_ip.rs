//! Client identity derivation for rate limiting.
//!
//! Order of preference:
//! 1. left-most `X-Forwarded-For` entry, only when the gateway is told to
//!    trust it
//! 2. the peer address of the TCP connection
//! 3. the shared [`UNKNOWN_CLIENT`] sentinel
//!
//! Every request that reaches step 3 shares one counter.

use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, http::Request};

/// Identity used when no address can be found.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Derive the rate-limit key for a request.
pub fn client_identity<B>(req: &Request<B>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(req) {
            return ip.to_string();
        }
    }

    peer_addr(req)
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Peer address recorded by the server's connect-info layer.
pub fn peer_addr<B>(req: &Request<B>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

fn forwarded_for<B>(req: &Request<B>) -> Option<IpAddr> {
    req.headers()
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
