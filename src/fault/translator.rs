//! Exception translator middleware.
//!
//! Outermost stage of the pipeline. Turns every `Fault` carried by a response
//! and every panic raised below it into the JSON error envelope, after logging
//! the full fault against the request path.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::config::Environment;
use crate::fault::{ErrorEnvelope, Fault};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;

pub async fn translate_faults(
    State(environment): State<Environment>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let trace_id = request
        .request_id()
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => Fault::internal(panic_message(panic.as_ref()))
            .with_type("panic")
            .into_response(),
    };

    let Some(fault) = response.extensions_mut().remove::<Fault>() else {
        return response;
    };

    tracing::error!(
        path = %path,
        trace_id = %trace_id,
        kind = fault.kind().as_str(),
        error_type = %fault.error_type(),
        inner = fault.inner().unwrap_or("-"),
        stack_trace = fault.stack_trace().as_deref().unwrap_or("-"),
        "{}: {} in {}",
        fault.kind().title(),
        fault.message(),
        path
    );
    metrics::record_fault(fault.kind().as_str());

    let envelope = ErrorEnvelope::from_fault(&fault, environment, &trace_id);
    let mut rendered = (fault.status(), Json(envelope)).into_response();

    // Keep headers set by inner layers (request id, CSP) on the rendered response.
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    rendered
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    use crate::http::X_REQUEST_ID;

    fn app(environment: Environment) -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/missing",
                get(|| async { Err::<String, Fault>(Fault::not_found("item 9 does not exist")) }),
            )
            .route(
                "/panic",
                get(|| async {
                    if true {
                        panic!("exploded");
                    }
                    "unreachable"
                }),
            )
            .layer(middleware::from_fn_with_state(environment, translate_faults))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::get(uri)
            .header(X_REQUEST_ID, "req-1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let response = app(Environment::Production)
            .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_found_fault() {
        let (status, json) = call(app(Environment::Development), "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["title"], "Not Found");
        assert_eq!(json["strMessage"], "item 9 does not exist");
        assert_eq!(json["result"]["traceId"], "req-1");
    }

    #[tokio::test]
    async fn test_panic_in_production() {
        let (status, json) = call(app(Environment::Production), "/panic").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["isError"], true);
        assert_eq!(json["title"], "Error");
        assert_eq!(json["strMessage"], "An unexpected error occurred. Please try again later.");
        assert!(json["result"].is_null());
    }

    #[tokio::test]
    async fn test_panic_in_development() {
        let (_, json) = call(app(Environment::Development), "/panic").await;
        assert_eq!(json["strMessage"], "exploded");
        assert_eq!(json["result"]["exception"], "panic");
    }
}
