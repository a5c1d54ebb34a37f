//! The pipeline served over real TCP connections.

use std::time::Duration;

use request_shield::config::{Environment, TokenFormat};
use request_shield::http::X_ENCRYPT_PAYLOAD;

mod common;
use common::{client_codec, config, start_server};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_encrypted_exchange_over_tcp() {
    let (addr, shutdown, handle) = start_server(config(Environment::Production)).await;
    let codec = client_codec(TokenFormat::AeadV1);

    let res = client()
        .post(format!("http://{}/api/echo", addr))
        .header(X_ENCRYPT_PAYLOAD, "true")
        .body(codec.encrypt(r#"{"order":17}"#).unwrap())
        .send()
        .await
        .expect("server unreachable");

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let token: String = res.json().await.unwrap();
    assert_eq!(codec.decrypt(&token).unwrap(), r#"{"order":17}"#);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_keyed_by_peer_address() {
    let mut config = config(Environment::Production);
    config.rate_limiting.max_requests = 2;
    config.rate_limiting.window_duration_secs = 60;
    let (addr, shutdown, handle) = start_server(config).await;
    let client = client();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
        statuses.push(res.status().as_u16());
        if res.status() == 429 {
            assert!(res.headers().contains_key("retry-after"));
        }
    }
    assert_eq!(statuses, vec![200, 200, 429]);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_fault_envelope_over_tcp() {
    let (addr, shutdown, handle) = start_server(config(Environment::Development)).await;

    let res = client()
        .get(format!("http://{}/api/items/404", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let envelope: serde_json::Value = res.json().await.unwrap();
    assert_eq!(envelope["title"], "Not Found");
    assert_eq!(envelope["result"]["traceId"], request_id.as_str());

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}
