//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    routing::{self, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use request_shield::config::{Environment, ShieldConfig, TokenFormat};
use request_shield::crypto::{
    AeadKey, KeyProvider, Keyring, LegacyCbc, PayloadCodec, StaticKeyProvider,
};
use request_shield::http::handlers::demo_router;
use request_shield::{Fault, Pipeline, ShieldServer, Shutdown};

pub const LEGACY_SECRET: &[u8; 16] = b"4090909090909020";

pub fn keys() -> Arc<dyn KeyProvider> {
    Arc::new(StaticKeyProvider::new(
        Keyring::builder()
            .aead(AeadKey::new("k1", [7u8; 32]), true)
            .legacy(LegacyCbc::new(*LEGACY_SECRET, *LEGACY_SECRET))
            .build(),
    ))
}

/// A client-side codec sharing the server's keys.
pub fn client_codec(format: TokenFormat) -> PayloadCodec {
    PayloadCodec::new(keys(), format)
}

pub fn config(environment: Environment) -> ShieldConfig {
    let mut config = ShieldConfig::default();
    config.environment = environment;
    config
}

/// Demo routes plus routes that fail on purpose.
pub fn test_app() -> Router {
    demo_router()
        .route(
            "/api/invalid",
            post(|| async {
                Err::<String, Fault>(Fault::invalid_operation("order already shipped"))
            }),
        )
        .route(
            "/api/slow",
            routing::get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        )
        .route(
            "/api/panic",
            routing::get(|| async {
                if true {
                    panic!("handler exploded");
                }
                "unreachable"
            }),
        )
}

pub fn shielded(config: ShieldConfig) -> Router {
    Pipeline::new(config, keys()).unwrap().wrap(test_app())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Attach a peer address the way `into_make_service_with_connect_info` would.
pub fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

pub fn json(body: &Bytes) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

/// Run a real server on an ephemeral port.
pub async fn start_server(config: ShieldConfig) -> (SocketAddr, Shutdown, JoinHandle<()>) {
    let pipeline = Pipeline::new(config, keys()).unwrap();
    let server = ShieldServer::new(&pipeline, test_app());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    (addr, shutdown, handle)
}
