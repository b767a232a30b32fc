//! Client IP resolution from proxy headers.
//!
//! Priority: rightmost `X-Forwarded-For` entry, then `X-Real-IP`, then the
//! socket peer address.

use axum::extract::ConnectInfo;
use http::{Extensions, HeaderMap};
use std::net::{IpAddr, SocketAddr};

pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Resolve the client IP, or `None` when neither headers nor connection info carry one.
pub fn resolve(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    if let Some(xff) = header_str(headers, "x-forwarded-for")
        && let Some(ip) = xff
            .rsplit(',')
            .next()
            .map(str::trim)
            .and_then(|s| s.parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = header_str(headers, "x-real-ip").and_then(|s| s.trim().parse().ok()) {
        return Some(ip);
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
