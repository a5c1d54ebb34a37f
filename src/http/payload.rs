//! Payload transform middleware.
//!
//! When a request carries `X-Encrypt-Payload: true`, its body is a token
//! produced by [`PayloadCodec::encrypt`]. The body is decrypted before the
//! handler runs, and the handler's response is encrypted on the way out and
//! sent as a single JSON string literal. Requests without the flag pass
//! through untouched in both directions.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::crypto::{CodecError, PayloadCodec};
use crate::fault::Fault;
use crate::http::body;
use crate::http::response::block;

pub const X_ENCRYPT_PAYLOAD: &str = "x-encrypt-payload";

/// Middleware state.
#[derive(Clone, Debug)]
pub struct PayloadTransform {
    pub codec: PayloadCodec,
    pub max_body_bytes: usize,
}

/// The transform runs only when the header is exactly `true`.
pub fn is_requested(headers: &HeaderMap) -> bool {
    headers
        .get(X_ENCRYPT_PAYLOAD)
        .is_some_and(|v| v.as_bytes() == b"true")
}

pub async fn transform_payload(
    State(transform): State<PayloadTransform>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_requested(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, bytes) = match body::snapshot(request, transform.max_body_bytes).await {
        Ok(snapshot) => snapshot,
        Err(err) => return err.into_response(),
    };

    let plaintext = match decode_body(&transform.codec, &bytes) {
        Ok(plaintext) => plaintext,
        Err(err) if err.is_malformed_token() => {
            tracing::warn!(path = %parts.uri.path(), error = %err, "Rejected undecodable payload");
            return block(StatusCode::BAD_REQUEST, "Invalid Encrypted Payload");
        }
        Err(err) => return Fault::from(err).into_response(),
    };

    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(plaintext.len()));

    let response = next.run(Request::from_parts(parts, Body::from(plaintext))).await;

    // Faults are rendered in clear by the translator.
    if response.extensions().get::<Fault>().is_some() {
        return response;
    }

    match encode_response(&transform.codec, response).await {
        Ok(response) => response,
        Err(fault) => fault.into_response(),
    }
}

/// Accepts the bare token or the token as a JSON string literal.
fn decode_body(codec: &PayloadCodec, bytes: &[u8]) -> Result<String, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CodecError::Utf8)?.trim();
    if text.starts_with('"') {
        let token: String = serde_json::from_str(text).map_err(|_| CodecError::Truncated)?;
        codec.decrypt(&token)
    } else {
        codec.decrypt(text)
    }
}

async fn encode_response(codec: &PayloadCodec, response: Response) -> Result<Response, Fault> {
    let (mut parts, body) = response.into_parts();
    let bytes = body::buffer(body, usize::MAX)
        .await
        .map_err(|err| Fault::internal(err.to_string()))?;

    if bytes.is_empty() {
        return Ok(Response::from_parts(parts, Body::empty()));
    }

    let text = String::from_utf8_lossy(&bytes);
    let token = codec.encrypt(&text)?;
    let quoted = serde_json::to_string(&token)?;

    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(quoted.len()));

    Ok(Response::from_parts(parts, Body::from(quoted)))
}
