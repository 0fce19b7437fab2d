//! Operator API over the HTTP middleware stack.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

use db_redundancy::admin::AdminState;
use db_redundancy::config::ListenerConfig;
use db_redundancy::store::{EntityKind, StoreRole};
use db_redundancy::HttpServer;

mod common;
use common::{manual_config, setting, start_pair, start_single, Manager};

fn router(manager: Manager, api_key: Option<&str>) -> Router {
    let state = AdminState::new(manager, api_key.map(str::to_string));
    HttpServer::build_router(&ListenerConfig::default(), state)
}

fn post(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

const OPERATOR: &str = r#"{"operatorId":"ops@example.com"}"#;

#[tokio::test]
async fn test_health_snapshot() {
    let pair = start_pair(manual_config()).await;
    let app = router(pair.manager.clone(), None);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let (_, body) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["activeStore"], "primary");
    assert_eq!(body["redundancyEnabled"], true);
    assert_eq!(body["primary"]["connected"], true);
    assert_eq!(body["primary"]["consecutiveFailures"], 0);
    assert_eq!(body["secondary"]["connected"], true);
    assert_eq!(body["syncStatus"]["status"], "unknown");
}

#[tokio::test]
async fn test_failover_and_failback_routes() {
    let pair = start_pair(manual_config()).await;
    let app = router(pair.manager.clone(), None);

    let (status, body) = send(&app, post("/db-failover", OPERATOR)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["timestamp"].as_str().is_some());
    assert_eq!(pair.manager.active_store(), StoreRole::Secondary);

    let (status, body) = send(&app, post("/db-failover", OPERATOR)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Secondary database is already active");

    let (status, body) = send(&app, post("/db-failback", OPERATOR)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(pair.manager.active_store(), StoreRole::Primary);
}

#[tokio::test]
async fn test_sync_route() {
    let pair = start_pair(manual_config()).await;
    pair.primary.insert(setting(1, "a"));
    let app = router(pair.manager.clone(), None);

    let (status, body) = send(&app, post("/db-sync", OPERATOR)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(pair.secondary.row_count(EntityKind::AppConfig), 1);
}

#[tokio::test]
async fn test_missing_operator_is_unauthorized() {
    let pair = start_pair(manual_config()).await;
    let app = router(pair.manager.clone(), None);

    for path in ["/db-sync", "/db-failover", "/db-failback"] {
        let (status, body) = send(&app, post(path, "{}")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, post(path, "")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
    }
    assert_eq!(pair.manager.active_store(), StoreRole::Primary);
}

#[tokio::test]
async fn test_single_store_actions_are_bad_requests() {
    let (manager, _) = start_single(manual_config()).await;
    let app = router(manager, None);

    for path in ["/db-sync", "/db-failover", "/db-failback"] {
        let (status, body) = send(&app, post(path, OPERATOR)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["message"], "no secondary database configured");
    }

    let (_, body) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(body["redundancyEnabled"], false);
    assert!(body["secondary"].is_null());
}

#[tokio::test]
async fn test_concurrent_sync_is_conflict() {
    let pair = start_pair(manual_config()).await;
    pair.primary.insert(setting(1, "a"));
    pair.secondary.set_upsert_delay(Duration::from_millis(300));
    let app = router(pair.manager.clone(), None);

    let first = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, post("/db-sync", OPERATOR)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, body) = send(&app, post("/db-sync", OPERATOR)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "sync already in progress");

    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sync_with_store_down_is_unavailable() {
    let pair = start_pair(manual_config()).await;
    pair.secondary.set_reachable(false);
    pair.manager.tick_health().await;
    let app = router(pair.manager.clone(), None);

    let (status, body) = send(&app, post("/db-sync", OPERATOR)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_api_key_guards_actions_only() {
    let pair = start_pair(manual_config()).await;
    let app = router(pair.manager.clone(), Some("s3cret"));

    let (status, _) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, post("/db-failover", OPERATOR)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = post("/db-failover", OPERATOR);
    request
        .headers_mut()
        .insert("authorization", "Bearer wrong".parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(pair.manager.active_store(), StoreRole::Primary);

    let mut request = post("/db-failover", OPERATOR);
    request
        .headers_mut()
        .insert("authorization", "Bearer s3cret".parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pair.manager.active_store(), StoreRole::Secondary);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let pair = start_pair(manual_config()).await;
    let app = router(pair.manager.clone(), None);

    let big = format!(r#"{{"operatorId":"{}"}}"#, "x".repeat(64 * 1024));
    let (status, _) = send(&app, post("/db-failover", &big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(pair.manager.active_store(), StoreRole::Primary);
}
