//! Error classification of the HTTP gateway.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::Value;
use shopease_integration_tests::TestStore;
use shopease_storefront::gateway::{Gateway, GatewayError, HttpGateway, Method};
use url::Url;

fn gateway_for(store: &TestStore) -> HttpGateway {
    HttpGateway::new(&store.config().api).unwrap()
}

#[tokio::test]
async fn test_status_errors_carry_the_store_message() {
    let store = TestStore::start().await;
    let gateway = gateway_for(&store);

    let err = gateway
        .request(Method::Get, "/test/status/404", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::Status {
            status: 404,
            message: "Status 404".to_string(),
        }
    );
    assert!(err.is_not_found());
    assert!(!err.is_retryable());

    let err = gateway
        .request(Method::Get, "/test/status/403", None)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let err = gateway
        .request(Method::Get, "/test/status/503", None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let store = TestStore::start().await;
    let gateway = gateway_for(&store);

    let body = gateway
        .request(Method::Post, "/api/auth/logout", None)
        .await
        .unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_undecodable_body_is_a_decode_error() {
    let store = TestStore::start().await;
    let gateway = gateway_for(&store);

    let err = gateway
        .request(Method::Get, "/test/garbage", None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let store = TestStore::start().await;
    let mut config = store.config();
    config.api.request_timeout = Duration::from_millis(200);
    let gateway = HttpGateway::new(&config.api).unwrap();

    let err = gateway
        .request(Method::Get, "/test/slow", None)
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Timeout);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_store_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = shopease_storefront::StorefrontConfig::for_base_url(
        Url::parse(&format!("http://{addr}")).unwrap(),
    );
    let gateway = HttpGateway::new(&config.api).unwrap();

    let err = gateway
        .request(Method::Get, "/api/cart", None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_every_request_carries_a_request_id() {
    let store = TestStore::start().await;
    let gateway = gateway_for(&store);

    gateway
        .request(Method::Get, "/api/auth/session", None)
        .await
        .unwrap();
    gateway
        .request(Method::Get, "/api/auth/session", None)
        .await
        .unwrap();

    let ids: Vec<String> = store
        .requests()
        .into_iter()
        .map(|r| r.request_id.unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids.first(), ids.last());
}
