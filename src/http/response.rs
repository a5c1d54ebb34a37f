//! Short-circuit responses written by the guards.
//!
//! Guards that reject a request answer directly with a small JSON body
//! instead of raising a fault, so rejections never reach the translator.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{"errorCode": <status>, "description": <text>}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockBody {
    pub error_code: u16,
    pub description: String,
}

pub fn block(status: StatusCode, description: impl Into<String>) -> Response {
    let body = BlockBody {
        error_code: status.as_u16(),
        description: description.into(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_block_body_shape() {
        let response = block(StatusCode::FORBIDDEN, "Forbidden");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"errorCode":403,"description":"Forbidden"}"#);
    }
}
