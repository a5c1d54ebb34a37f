//! Threat guard middleware.
//!
//! Wraps one [`Detector`]. The request body is buffered, scanned together
//! with the rest of the request, and handed on unchanged when the verdict is
//! `Allowed`. A `Blocked` verdict ends the request with a 400.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::detect::{Detector, InterceptedRequest, Verdict};
use crate::http::body;
use crate::http::response::block;
use crate::observability::metrics;
use crate::security::client::client_ip_of;

#[derive(Clone)]
pub struct ThreatGuard {
    pub detector: Arc<dyn Detector>,
    pub max_body_bytes: usize,
    pub trust_forwarded_for: bool,
}

pub async fn guard_threats(
    State(guard): State<ThreatGuard>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, bytes) = match body::snapshot(request, guard.max_body_bytes).await {
        Ok(snapshot) => snapshot,
        Err(err) => return err.into_response(),
    };

    let snapshot = InterceptedRequest::from_parts(&parts, bytes.clone());
    match guard.detector.scan(&snapshot) {
        Verdict::Allowed => next.run(body::restore(parts, bytes)).await,
        Verdict::Blocked(threat) => {
            let client = client_ip_of(&parts, guard.trust_forwarded_for)
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(
                client = %client,
                method = %parts.method,
                path = %parts.uri.path(),
                category = %threat.category,
                field = %threat.field,
                pattern = threat.pattern,
                "Request blocked"
            );
            metrics::record_threat(threat.category.as_str());
            block(StatusCode::BAD_REQUEST, threat.category.description())
        }
    }
}
