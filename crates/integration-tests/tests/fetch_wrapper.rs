//! Status-checking request wrapper against a stub backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{Json, Router, http::StatusCode, routing::get};
use reqwest::header::HeaderValue;
use serde_json::json;

use online_store_core::ProductId;
use online_store_integration_tests::{StubBackend, TEST_COOKIE, test_config};
use online_store_storefront::api::{ApiClient, ApiError, ApiRequest, FetchOptions, Notices};

fn session(backend: &StubBackend) -> (online_store_storefront::api::ApiSession, Arc<Notices>) {
    let client = ApiClient::new(&test_config(backend).backend).unwrap();
    let notices = Arc::new(Notices::default());
    let session = client.session(
        Some(HeaderValue::from_static(TEST_COOKIE)),
        notices.clone(),
    );
    (session, notices)
}

#[tokio::test]
async fn test_failed_status_is_displayed_once_and_skips_continuation() {
    let backend = StubBackend::start(Router::new().route(
        "/api/v1/products/1",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "code": 500, "message": "Database unavailable" })),
            )
        }),
    ))
    .await;
    let (session, notices) = session(&backend);

    let mut invoked = false;
    let result: Result<(), ApiError> = session
        .fetch_with_status_check(
            ApiRequest::get("products/1"),
            FetchOptions::default(),
            |_| {
                invoked = true;
                Ok(())
            },
        )
        .await;

    assert!(result.is_err());
    assert!(!invoked);
    assert_eq!(notices.messages(), vec!["Database unavailable".to_string()]);
}

#[tokio::test]
async fn test_continuation_failure_is_displayed_once() {
    let backend = StubBackend::start(
        Router::new().route("/api/v1/products/1", get(|| async { "not json" })),
    )
    .await;
    let (session, notices) = session(&backend);

    let result = session.product(ProductId::new(1)).await;

    assert!(matches!(result, Err(ApiError::Decode(_))));
    assert_eq!(notices.messages().len(), 1);
}

#[tokio::test]
async fn test_suppressed_image_fetch_falls_back_to_placeholder() {
    let backend = StubBackend::start(Router::new().route(
        "/api/v1/products/1/images",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    ))
    .await;
    let (session, notices) = session(&backend);

    let src = session
        .first_image(ProductId::new(1), "/static/img/no-image.svg")
        .await;

    assert_eq!(src, "/static/img/no-image.svg");
    assert!(notices.is_empty());
}

#[tokio::test]
async fn test_first_image_uses_data_url() {
    let backend = StubBackend::start(Router::new().route(
        "/api/v1/products/1/images",
        get(|| async { Json(json!([{ "id": 3, "data": "YWJj", "format": "jpeg" }])) }),
    ))
    .await;
    let (session, notices) = session(&backend);

    let src = session.first_image(ProductId::new(1), "placeholder").await;

    assert_eq!(src, "data:image/jpeg;base64,YWJj");
    assert!(notices.is_empty());
    let requests = backend.log.matching("GET", "/api/v1/products/1/images");
    assert_eq!(requests.first().and_then(|r| r.query.as_deref()), Some("limit=1"));
}

#[tokio::test]
async fn test_cookie_is_forwarded() {
    let backend = StubBackend::start(Router::new().route(
        "/api/v1/users/me",
        get(|| async { Json(online_store_integration_tests::user(1, "Ana")) }),
    ))
    .await;
    let (session, _notices) = session(&backend);

    let user = session.current_user().await.unwrap();

    assert_eq!(user.first_name, "Ana");
    assert_eq!(user.last_name, "Tester");
    let requests = backend.log.matching("GET", "/api/v1/users/me");
    assert_eq!(requests.first().and_then(|r| r.cookie.as_deref()), Some(TEST_COOKIE));
}
