//! Header rewriting for requests forwarded upstream.
//!
//! - Appends the peer address to `X-Forwarded-For`
//! - Strips hop-by-hop headers, which belong to a single connection

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::security::client_ip::X_FORWARDED_FOR;

/// Remove headers that must not be forwarded.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let hop_by_hop = [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
    ];
    for name in hop_by_hop {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove(header::UPGRADE);
}

/// Add the peer IP to the end of the `X-Forwarded-For` chain.
pub fn append_forwarded_for(headers: &mut HeaderMap, peer: Option<SocketAddr>) {
    let Some(peer) = peer else {
        return;
    };

    let ip = peer.ip().to_string();
    let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {ip}"),
        _ => ip,
    };

    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
