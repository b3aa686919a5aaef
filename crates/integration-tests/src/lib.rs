//! Integration tests for the Online Store storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p online-store-integration-tests
//! ```
//!
//! Every test starts a stub store backend and the real storefront router on
//! ephemeral local ports, so nothing external is required.
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = StubBackend::start(
//!     Router::new().route("/api/v1/users/me", get(|| async { Json(user(1, "Ana")) })),
//! )
//! .await;
//! let store = TestStorefront::start(&backend).await;
//! let response = store.get("/store/").await;
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::header::COOKIE,
    middleware::Next,
    response::Response,
};
use reqwest::{Client, redirect::Policy};
use serde_json::{Value, json};
use url::Url;

use online_store_storefront::{
    app,
    config::{BackendConfig, CatalogConfig, StorefrontConfig},
    state::AppState,
};

/// Cookie the test browser sends; the storefront must forward it untouched.
pub const TEST_COOKIE: &str = "session=test-session";

// =============================================================================
// Stub backend
// =============================================================================

/// A request the stub backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
    pub cookie: Option<String>,
}

/// Requests received by the stub backend, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<RecordedRequest>>>);

impl RequestLog {
    fn push(&self, request: RecordedRequest) {
        if let Ok(mut requests) = self.0.lock() {
            requests.push(request);
        }
    }

    /// Every recorded request.
    #[must_use]
    pub fn all(&self) -> Vec<RecordedRequest> {
        self.0.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Recorded requests with `method` to `path`.
    #[must_use]
    pub fn matching(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.all()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

async fn record(State(log): State<RequestLog>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    log.push(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        body: String::from_utf8_lossy(&bytes).into_owned(),
        cookie: parts
            .headers
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// A fake store backend serving `router` on a local port.
pub struct StubBackend {
    pub url: Url,
    pub log: RequestLog,
}

impl StubBackend {
    /// Serve `router`, recording every request.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(router: Router) -> Self {
        let log = RequestLog::default();
        let router = router.layer(axum::middleware::from_fn_with_state(log.clone(), record));
        let addr = serve(router).await;

        Self {
            url: Url::parse(&format!("http://{addr}")).expect("Failed to build backend URL"),
            log,
        }
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    addr
}

// =============================================================================
// Storefront under test
// =============================================================================

/// Settings pointing the storefront at `backend`.
#[must_use]
pub fn test_config(backend: &StubBackend) -> StorefrontConfig {
    StorefrontConfig {
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        backend: BackendConfig::new(backend.url.clone()),
        catalog: CatalogConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The storefront router served on a local port.
pub struct TestStorefront {
    pub base_url: String,
    pub client: Client,
}

impl TestStorefront {
    /// Start the storefront against `backend`.
    ///
    /// # Panics
    ///
    /// Panics if the storefront fails to start.
    pub async fn start(backend: &StubBackend) -> Self {
        let state = AppState::new(test_config(backend)).expect("Failed to build storefront state");
        let addr = serve(app(state)).await;

        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Full-page GET as a signed-in browser.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("cookie", TEST_COOKIE)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Form POST issued by htmx.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn htmx_post(&self, path: &str, form: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("cookie", TEST_COOKIE)
            .header("hx-request", "true")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(form.to_string())
            .send()
            .await
            .expect("Failed to send request")
    }
}

// =============================================================================
// Backend fixtures
// =============================================================================
//
// Shaped like the backend's own output: unset columns and empty lists are
// written as `null`, not omitted.

/// An address with no columns set.
#[must_use]
pub fn empty_address() -> Value {
    json!({ "id": null, "city": null, "country": null, "address": null, "postalCode": null })
}

/// A user as the backend returns it.
#[must_use]
pub fn user(id: i64, first_name: &str) -> Value {
    json!({
        "id": id,
        "name": format!("{first_name} Tester"),
        "firstName": first_name,
        "LastName": "Tester",
        "email": format!("{}@example.com", first_name.to_lowercase()),
        "pictureUrl": null,
        "address": empty_address(),
        "createdAt": "2024-01-02T03:04:05Z",
    })
}

/// A product as the backend returns it.
#[must_use]
pub fn product(id: i64, owner: i64, name: &str, units: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "price": { "units": units, "currency": 1 },
        "quantity": 3,
        "category": 1,
        "available": true,
        "comments": null,
        "rating": null,
        "ratingsCount": null,
        "createdAt": "2024-03-01T10:05:00Z",
        "userId": owner,
    })
}

/// An order line as the backend returns it.
#[must_use]
pub fn item(id: i64, product_id: i64, quantity: i64, units: i64) -> Value {
    json!({
        "id": id,
        "productId": product_id,
        "orderId": null,
        "quantity": quantity,
        "price": { "units": units, "currency": 1 },
    })
}

/// An order as `GET /orders` returns it: the item list is never filled in.
#[must_use]
pub fn order(id: i64, owner: i64, status: i32) -> Value {
    json!({
        "id": id,
        "userId": owner,
        "products": null,
        "status": status,
        "address": empty_address(),
        "createdAt": "2024-03-05T09:30:00Z",
        "latestUpdate": null,
    })
}

/// An order with its items, as `GET /orders/{id}/items` returns it.
#[must_use]
pub fn order_with_items(id: i64, owner: i64, status: i32, items: &[Value]) -> Value {
    let mut order = order(id, owner, status);
    order["products"] = Value::Array(items.to_vec());
    order
}
