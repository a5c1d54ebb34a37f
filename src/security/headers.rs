//! Security response headers.

use axum::http::{header, header::InvalidHeaderValue, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

/// `Content-Security-Policy` on every response that does not set its own.
///
/// Returns `Ok(None)` for an empty policy.
pub fn content_security_policy(
    policy: &str,
) -> Result<Option<SetResponseHeaderLayer<HeaderValue>>, InvalidHeaderValue> {
    let policy = policy.trim();
    if policy.is_empty() {
        return Ok(None);
    }

    let value = HeaderValue::from_str(policy)?;
    Ok(Some(SetResponseHeaderLayer::if_not_present(
        header::CONTENT_SECURITY_POLICY,
        value,
    )))
}
