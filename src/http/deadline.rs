//! Request deadline.
//!
//! Runs inside the exception translator so an expired deadline is rendered
//! as a `Timeout` envelope like any other fault. The inner future is dropped
//! when the deadline fires.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::time::Duration;

use crate::fault::Fault;

pub async fn enforce_deadline(
    State(limit): State<Duration>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Fault> {
    let path = request.uri().path().to_string();

    tokio::time::timeout(limit, next.run(request))
        .await
        .map_err(|elapsed| {
            tracing::warn!(
                path = %path,
                limit_ms = limit.as_millis() as u64,
                "Request deadline exceeded"
            );
            Fault::from(elapsed).with_inner(format!("no response within {:?}", limit))
        })
}
