//! Body buffering.
//!
//! Stages that inspect a body read it into memory once, bounded by the
//! configured limit, and hand the next stage a fresh body built from the
//! same bytes. Nothing downstream ever sees a consumed stream.

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, Request, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use thiserror::Error;

use crate::http::response::block;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read body: {0}")]
    Read(String),
}

impl IntoResponse for BodyError {
    fn into_response(self) -> Response {
        match self {
            BodyError::TooLarge { .. } => block(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"),
            BodyError::Read(_) => block(StatusCode::BAD_REQUEST, "Unreadable Request Body"),
        }
    }
}

/// Read `body` completely, failing once more than `limit` bytes arrive.
pub async fn buffer(body: Body, limit: usize) -> Result<Bytes, BodyError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.is::<LengthLimitError>() => Err(BodyError::TooLarge { limit }),
        Err(err) => Err(BodyError::Read(err.to_string())),
    }
}

/// Buffer a request body, returning the parts, the bytes, and nothing consumed.
///
/// A declared `Content-Length` above the limit is rejected before reading.
pub async fn snapshot(request: Request<Body>, limit: usize) -> Result<(Parts, Bytes), BodyError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(BodyError::TooLarge { limit });
    }

    let (parts, body) = request.into_parts();
    let bytes = buffer(body, limit).await?;
    Ok((parts, bytes))
}

/// Rebuild a request around an already-buffered body.
pub fn restore(parts: Parts, bytes: Bytes) -> Request<Body> {
    Request::from_parts(parts, Body::from(bytes))
}
