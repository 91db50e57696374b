//! Scenario 6: API key auth at the HTTP/router layer, since that behavior
//! lives in the auth middleware rather than any service method.

use crate::helpers::test_service;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use vikingfs_context::server::{self, ServerOptions};

fn options(api_key: Option<&str>) -> ServerOptions {
    ServerOptions { host: "127.0.0.1".to_string(), port: 0, api_key: api_key.map(str::to_string), enable_cors: false }
}

#[tokio::test]
async fn correct_api_key_is_accepted() {
    let (service, _dir) = test_service().await;
    let app = server::router(service, &options(Some("correct-key")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/system/status")
                .header("X-API-Key", "correct-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_api_key_is_rejected_with_unauthenticated() {
    let (service, _dir) = test_service().await;
    let app = server::router(service, &options(Some("correct-key")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/system/status")
                .header("X-API-Key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn health_endpoint_is_unauthenticated() {
    let (service, _dir) = test_service().await;
    let app = server::router(service, &options(Some("correct-key")));

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
