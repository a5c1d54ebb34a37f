//! IP allowlist middleware.
//!
//! When the allowlist is non-empty, only the listed client addresses are
//! served. Requests whose client address cannot be determined are refused.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use crate::http::response::block;
use crate::security::client::client_ip;

#[derive(Debug)]
pub struct AllowList {
    allowed: HashSet<IpAddr>,
    trust_forwarded_for: bool,
}

impl AllowList {
    pub fn new(allowed: impl IntoIterator<Item = IpAddr>, trust_forwarded_for: bool) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            trust_forwarded_for,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn permits(&self, ip: &IpAddr) -> bool {
        self.allowed.contains(ip) || self.allowed.contains(&ip.to_canonical())
    }
}

pub async fn enforce_allowlist(
    State(list): State<Arc<AllowList>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_ip(request.headers(), request.extensions(), list.trust_forwarded_for);

    match client {
        Some(ip) if list.permits(&ip) => next.run(request).await,
        _ => {
            tracing::warn!(
                client = ?client,
                path = %request.uri().path(),
                "Client not in allowlist"
            );
            block(StatusCode::FORBIDDEN, "Forbidden")
        }
    }
}
