//! Client address resolution.

use axum::extract::ConnectInfo;
use axum::http::{request::Parts, HeaderMap, Extensions};
use std::net::{IpAddr, SocketAddr};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Address of the client that sent the request.
///
/// The first `X-Forwarded-For` hop is used only when `trust_forwarded_for`
/// is set (the service runs behind a proxy that overwrites the header).
/// Otherwise the peer address of the connection is used.
pub fn client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

pub fn client_ip_of(parts: &Parts, trust_forwarded_for: bool) -> Option<IpAddr> {
    client_ip(&parts.headers, &parts.extensions, trust_forwarded_for)
}
