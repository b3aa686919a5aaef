//! Storefront pages and htmx actions against a stub backend.

#![allow(clippy::unwrap_used)]

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, patch, post, put},
};
use serde_json::json;

use online_store_integration_tests::{
    StubBackend, TEST_COOKIE, TestStorefront, item, order, order_with_items, product, user,
};

/// Backend where user 1 is signed in and product 5 belongs to `owner`.
fn product_backend(owner: i64) -> Router {
    Router::new()
        .route("/api/v1/users/me", get(|| async { Json(user(1, "Ana")) }))
        .route(
            "/api/v1/users/{id}",
            get(|| async { Json(user(2, "Boris")) }),
        )
        .route(
            "/api/v1/products/5",
            get(move || async move { Json(product(5, owner, "Desk lamp", 1050)) }),
        )
        .route(
            "/api/v1/products/5/images",
            get(|| async { Json(json!([{ "id": 8, "data": "YWJj", "format": "png" }])) }),
        )
        .route(
            "/api/v1/products/5/comments",
            get(|| async {
                Json(json!([{
                    "id": 4,
                    "comment": "Bright enough",
                    "user": user(2, "Boris"),
                    "createdAt": "2024-03-02T08:00:00Z",
                }]))
            }),
        )
}

#[tokio::test]
async fn test_health() {
    let backend = StubBackend::start(Router::new()).await;
    let store = TestStorefront::start(&backend).await;

    let response = store.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_readiness_follows_backend_liveness() {
    let backend = StubBackend::start(
        Router::new().route("/api/v1/liveness", get(|| async { StatusCode::OK })),
    )
    .await;
    let store = TestStorefront::start(&backend).await;
    assert_eq!(store.get("/health/ready").await.status(), StatusCode::OK);

    let down = StubBackend::start(Router::new()).await;
    let store = TestStorefront::start(&down).await;
    assert_eq!(
        store.get("/health/ready").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_catalog_renders_tiles_with_prices() {
    let backend = StubBackend::start(
        Router::new()
            .route("/api/v1/users/me", get(|| async { Json(user(1, "Ana")) }))
            .route(
                "/api/v1/products",
                get(|| async {
                    Json(json!({
                        "products": [product(5, 2, "Desk lamp", 1050)],
                        "count": 1,
                    }))
                }),
            )
            .route(
                "/api/v1/products/5/images",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            ),
    )
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store.get("/store/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();

    assert!(body.contains("Desk lamp"));
    assert!(body.contains("10,50 BGN"));
    assert!(body.contains("/static/img/no-image.svg"));
    // The failed image fetch is suppressed, so the modal stays hidden
    assert!(body.contains(r#"class="modal" hidden"#));
    assert!(body.contains("Ana"));

    let listing = backend.log.matching("GET", "/api/v1/products");
    let query = listing.first().and_then(|r| r.query.clone()).unwrap();
    assert!(query.contains("page=1"));
    assert!(query.contains("pageSize=40"));
    assert!(query.contains("category=511"));
}

#[tokio::test]
async fn test_catalog_search_sends_category_mask() {
    let backend = StubBackend::start(
        Router::new().route(
            "/api/v1/products",
            get(|| async { Json(json!({ "products": [], "count": 0 })) }),
        ),
    )
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store
        .client
        .get(store.url("/store/products?name=lamp&category=Clothing&category=Sport"))
        .header("hx-request", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listing = backend.log.matching("GET", "/api/v1/products");
    let query = listing.first().and_then(|r| r.query.clone()).unwrap();
    assert!(query.contains("name=lamp"));
    assert!(query.contains("category=10"));
}

#[tokio::test]
async fn test_non_owner_sees_no_edit_controls() {
    let backend = StubBackend::start(product_backend(2)).await;
    let store = TestStorefront::start(&backend).await;

    let body = store.get("/store/products/5").await.text().await.unwrap();

    assert!(body.contains("Desk lamp"));
    assert!(body.contains("data:image/png;base64,YWJj"));
    assert!(body.contains("Bright enough"));
    assert!(body.contains("Add to cart"));
    assert!(!body.contains("Edit product"));
    assert!(!body.contains("/store/products/5/images/8/delete"));
    // Boris wrote the comment, so Ana cannot delete it
    assert!(!body.contains("/store/products/5/comments/4/delete"));
}

#[tokio::test]
async fn test_owner_sees_edit_controls() {
    let backend = StubBackend::start(product_backend(1)).await;
    let store = TestStorefront::start(&backend).await;

    let body = store.get("/store/products/5").await.text().await.unwrap();

    assert!(body.contains("Edit product"));
    assert!(body.contains("/store/products/5/images/8/delete"));
    assert!(body.contains(r#"value="10,50""#));
}

#[tokio::test]
async fn test_add_to_cart_uses_existing_cart() {
    let backend = StubBackend::start(
        Router::new()
            .route(
                "/api/v1/orders",
                get(|| async { Json(json!([order(42, 1, 1)])) })
                    .post(|| async { Json(order(99, 1, 1)) }),
            )
            .route(
                "/api/v1/orders/42/items",
                post(|| async { Json(json!({ "id": 7, "productId": 5, "quantity": 2 })) }),
            ),
    )
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store.htmx_post("/store/products/5/cart", "quantity=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("hx-trigger")
            .and_then(|v| v.to_str().ok()),
        Some("cart-updated")
    );
    assert!(response.text().await.unwrap().contains("Success"));

    assert!(backend.log.matching("POST", "/api/v1/orders").is_empty());
    let added = backend.log.matching("POST", "/api/v1/orders/42/items");
    assert_eq!(added.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&added.first().unwrap().body).unwrap();
    assert_eq!(body, json!({ "productId": 5, "quantity": 2 }));
    assert_eq!(added.first().unwrap().cookie.as_deref(), Some(TEST_COOKIE));
}

#[tokio::test]
async fn test_add_to_cart_creates_missing_cart() {
    let backend = StubBackend::start(
        Router::new()
            .route(
                "/api/v1/orders",
                get(|| async { Json(json!([])) }).post(|| async { Json(order(99, 1, 1)) }),
            )
            .route(
                "/api/v1/orders/99/items",
                post(|| async { StatusCode::CREATED }),
            ),
    )
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store.htmx_post("/store/products/5/cart", "").await;
    assert_eq!(response.status(), StatusCode::OK);

    let created = backend.log.matching("POST", "/api/v1/orders");
    assert_eq!(created.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&created.first().unwrap().body).unwrap();
    assert_eq!(body, json!({ "status": 1 }));
    assert_eq!(backend.log.matching("POST", "/api/v1/orders/99/items").len(), 1);
}

#[tokio::test]
async fn test_failed_action_retargets_error_modal() {
    let backend = StubBackend::start(Router::new().route(
        "/api/v1/products/5",
        patch(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "code": 400, "message": "You already rated this product" })),
            )
        }),
    ))
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store.htmx_post("/store/products/5/rating", "rating=3").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("hx-retarget")
            .and_then(|v| v.to_str().ok()),
        Some("#error-modal")
    );
    let body = response.text().await.unwrap();
    assert_eq!(body.matches("You already rated this product").count(), 1);
    assert!(!body.contains(r#"class="modal" hidden"#));
}

#[tokio::test]
async fn test_invalid_rating_never_reaches_backend() {
    let backend = StubBackend::start(Router::new()).await;
    let store = TestStorefront::start(&backend).await;

    let response = store.htmx_post("/store/products/5/rating", "rating=9").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("Rating must be between 0 and 5")
    );
    assert!(backend.log.all().is_empty());
}

#[tokio::test]
async fn test_rating_returns_updated_fragment() {
    let backend = StubBackend::start(Router::new().route(
        "/api/v1/products/5",
        patch(|| async {
            let mut rated = product(5, 2, "Desk lamp", 1050);
            rated["rating"] = json!(3.25);
            rated["ratingsCount"] = json!(4);
            Json(rated)
        }),
    ))
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store.htmx_post("/store/products/5/rating", "rating=2").await;
    let body = response.text().await.unwrap();
    assert!(body.contains("3.2") || body.contains("3.3"));
    assert!(body.contains("(4 ratings)"));

    let sent = backend.log.matching("PATCH", "/api/v1/products/5");
    let sent: serde_json::Value = serde_json::from_str(&sent.first().unwrap().body).unwrap();
    assert_eq!(sent, json!({ "rating": 2 }));
}

#[tokio::test]
async fn test_checkout_places_order() {
    let backend = StubBackend::start(
        Router::new()
            .route(
                "/api/v1/orders/42/items",
                get(|| async { Json(order(42, 1, 1)) }),
            )
            .route(
                "/api/v1/orders/42",
                put(|Json(body): Json<serde_json::Value>| async move { Json(body) }),
            ),
    )
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store
        .htmx_post(
            "/store/orders/42/checkout",
            "city=Sofia&country=Bulgaria&address=1+Main+St&postal_code=1000",
        )
        .await;
    assert_eq!(
        response
            .headers()
            .get("hx-redirect")
            .and_then(|v| v.to_str().ok()),
        Some("/store/orders/42")
    );

    let put = backend.log.matching("PUT", "/api/v1/orders/42");
    let sent: serde_json::Value = serde_json::from_str(&put.first().unwrap().body).unwrap();
    assert_eq!(sent["status"], json!(2));
    assert_eq!(sent["address"]["city"], json!("Sofia"));
    assert_eq!(sent["address"]["postalCode"], json!("1000"));
}

#[tokio::test]
async fn test_cart_link_redirects_to_cart_order() {
    let backend = StubBackend::start(Router::new().route(
        "/api/v1/orders",
        get(|| async { Json(json!([order(42, 1, 1)])) }),
    ))
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store.get("/cart").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("/store/orders/42")
    );
}

/// Backend where user 1 is signed in and owns order 42 with one line of
/// product 5.
fn order_backend(status: i32) -> Router {
    Router::new()
        .route("/api/v1/users/me", get(|| async { Json(user(1, "Ana")) }))
        .route(
            "/api/v1/orders/42/items",
            get(move || async move {
                Json(order_with_items(42, 1, status, &[item(8, 5, 2, 300)]))
            }),
        )
        .route(
            "/api/v1/products/5",
            get(|| async { Json(product(5, 2, "Desk lamp", 300)) }),
        )
        .route(
            "/api/v1/orders/42/invoice",
            get(|| async {
                Json(json!({
                    "id": 3,
                    "userId": 1,
                    "order": order(42, 1, 2),
                    "totalPrice": { "units": 600, "currency": 1 },
                    "createdAt": null,
                }))
            }),
        )
}

#[tokio::test]
async fn test_cart_page_lists_items_with_subtotal() {
    let backend = StubBackend::start(order_backend(1)).await;
    let store = TestStorefront::start(&backend).await;

    let response = store.get("/store/orders/42").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();

    assert!(body.contains("Desk lamp"));
    assert!(body.contains("Quantity: 2"));
    assert!(body.contains("Subtotal: 6,00 BGN"));
    assert!(body.contains("/store/orders/42/items/8/delete"));
    assert!(body.contains("/store/orders/42/checkout"));
    assert!(!body.contains("Invoice ID"));
    assert!(backend.log.matching("GET", "/api/v1/orders/42/invoice").is_empty());
}

#[tokio::test]
async fn test_placed_order_shows_invoice() {
    let backend = StubBackend::start(order_backend(2)).await;
    let store = TestStorefront::start(&backend).await;

    let body = store.get("/store/orders/42").await.text().await.unwrap();

    assert!(body.contains("In Progress"));
    assert!(body.contains("Invoice ID"));
    assert!(body.contains("6,00 BGN"));
    assert!(body.contains("Desk lamp"));
    assert!(!body.contains("/store/orders/42/items/8/delete"));
    assert!(!body.contains("/store/orders/42/checkout"));
}

#[tokio::test]
async fn test_order_of_another_user_is_not_found() {
    let backend = StubBackend::start(
        Router::new()
            .route("/api/v1/users/me", get(|| async { Json(user(1, "Ana")) }))
            .route(
                "/api/v1/orders/42/items",
                get(|| async { Json(order_with_items(42, 2, 2, &[item(8, 5, 2, 300)])) }),
            ),
    )
    .await;
    let store = TestStorefront::start(&backend).await;

    assert_eq!(
        store.get("/store/orders/42").await.status(),
        StatusCode::NOT_FOUND
    );
}

fn profile_backend() -> Router {
    Router::new()
        .route("/api/v1/users/me", get(|| async { Json(user(1, "Ana")) }))
        .route("/api/v1/users/2", get(|| async { Json(user(2, "Boris")) }))
        .route(
            "/api/v1/products",
            get(|| async {
                Json(json!({ "products": [product(6, 2, "Road bike", 50_000)], "count": 1 }))
            }),
        )
}

#[tokio::test]
async fn test_profile_of_another_user() {
    let backend = StubBackend::start(profile_backend()).await;
    let store = TestStorefront::start(&backend).await;

    let response = store.get("/store/users/2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();

    assert!(body.contains("Boris Tester"));
    assert!(body.contains("Road bike"));
    assert!(body.contains("500,00 BGN"));
    assert!(!body.contains("Sell a product"));
    assert!(!body.contains("boris@example.com"));

    let listing = backend.log.matching("GET", "/api/v1/products");
    let query = listing.first().and_then(|r| r.query.clone()).unwrap();
    assert!(query.contains("userId=2"));
    assert!(!query.contains("category="));
}

#[tokio::test]
async fn test_own_profile_shows_owner_actions() {
    let backend = StubBackend::start(profile_backend()).await;
    let store = TestStorefront::start(&backend).await;

    let body = store.get("/store/users/1").await.text().await.unwrap();

    assert!(body.contains("Sell a product"));
    assert!(body.contains("ana@example.com"));
    assert!(body.contains("/store/users/1/orders"));
    assert!(backend.log.matching("GET", "/api/v1/users/1").is_empty());
}

#[tokio::test]
async fn test_orders_list_skips_cart() {
    let backend = StubBackend::start(
        Router::new()
            .route("/api/v1/users/me", get(|| async { Json(user(1, "Ana")) }))
            .route(
                "/api/v1/orders",
                get(|| async { Json(json!([order(42, 1, 1), order(43, 1, 3)])) }),
            ),
    )
    .await;
    let store = TestStorefront::start(&backend).await;

    let response = store
        .client
        .get(store.url("/store/users/1/orders"))
        .header("cookie", TEST_COOKIE)
        .header("hx-request", "true")
        .send()
        .await
        .unwrap();
    let body = response.text().await.unwrap();

    assert!(body.contains("Order ID: 43"));
    assert!(body.contains("Completed"));
    assert!(!body.contains("Order ID: 42"));
}

fn edit_backend() -> Router {
    Router::new().route(
        "/api/v1/products/5",
        get(|| async {
            let mut current = product(5, 1, "Desk lamp", 1050);
            current["category"] = json!(5);
            Json(current)
        })
        .put(|| async { StatusCode::OK }),
    )
}

#[tokio::test]
async fn test_edit_keeps_categories_when_none_checked() {
    let backend = StubBackend::start(edit_backend()).await;
    let store = TestStorefront::start(&backend).await;

    let response = store
        .htmx_post(
            "/store/products/5",
            "description=Warm+light&price=12%2C30&quantity=4&available=on",
        )
        .await;
    assert_eq!(
        response
            .headers()
            .get("hx-redirect")
            .and_then(|v| v.to_str().ok()),
        Some("/store/products/5")
    );

    let put = backend.log.matching("PUT", "/api/v1/products/5");
    let sent: serde_json::Value = serde_json::from_str(&put.first().unwrap().body).unwrap();
    assert_eq!(
        sent,
        json!({
            "description": "Warm light",
            "price": { "units": 1230, "currency": 1 },
            "quantity": 4,
            "available": true,
            "category": 5,
        })
    );
}

#[tokio::test]
async fn test_edit_replaces_checked_categories() {
    let backend = StubBackend::start(edit_backend()).await;
    let store = TestStorefront::start(&backend).await;

    store
        .htmx_post(
            "/store/products/5",
            "description=&price=10&quantity=0&category=Shoes&category=Sport",
        )
        .await;

    let put = backend.log.matching("PUT", "/api/v1/products/5");
    let sent: serde_json::Value = serde_json::from_str(&put.first().unwrap().body).unwrap();
    assert_eq!(sent["category"], json!(12));
    assert_eq!(sent["available"], json!(false));
    assert_eq!(sent["price"]["units"], json!(1000));
}
