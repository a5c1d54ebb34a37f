//! Demo application served behind the pipeline by the `request-shield` binary.

use axum::{
    body::Bytes,
    extract::Path,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::fault::Fault;

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: u32,
    pub name: &'static str,
}

const ITEMS: &[Item] = &[
    Item { id: 1, name: "Widget" },
    Item { id: 2, name: "Gadget" },
];

pub fn demo_router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/echo", post(echo))
        .route("/api/items/{id}", get(item))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Parses the body as JSON and returns it.
async fn echo(body: Bytes) -> Result<Json<Value>, Fault> {
    let value: Value = serde_json::from_slice(&body)?;
    Ok(Json(value))
}

async fn item(Path(id): Path<u32>) -> Result<Json<Item>, Fault> {
    ITEMS
        .iter()
        .find(|item| item.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            Fault::not_found(format!("item {} does not exist", id)).with_type("KeyNotFound")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_known_item() {
        let response = demo_router()
            .oneshot(Request::get("/api/items/2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"id":2,"name":"Gadget"}"#);
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found_fault() {
        let response = demo_router()
            .oneshot(Request::get("/api/items/99").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<Fault>().is_some());
    }

    #[tokio::test]
    async fn test_echo_rejects_invalid_json() {
        let response = demo_router()
            .oneshot(Request::post("/api/echo").body(Body::from("{")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
