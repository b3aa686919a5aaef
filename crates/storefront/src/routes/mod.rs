//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Redirect to the catalog
//! GET  /health                             - Liveness check
//! GET  /health/ready                       - Readiness check (backend liveness)
//! GET  /cart                               - Redirect to the cart order
//! GET  /logout                             - Redirect to the backend logout
//!
//! # Catalog
//! GET  /store/                             - Search form and first page
//! GET  /store/products                     - Tiles fragment (HTMX, search or next page)
//!
//! # Products
//! GET  /store/products/{id}                - Product detail
//! POST /store/products/{id}                - Edit product (owner)
//! POST /store/products/{id}/rating         - Rate (returns rating fragment)
//! POST /store/products/{id}/cart           - Add to cart (returns notice fragment)
//! POST /store/products/{id}/images         - Upload images (owner, multipart)
//! POST /store/products/{id}/images/{image}/delete      - Delete image (owner)
//! POST /store/products/{id}/comments       - Post comment (returns comment fragment)
//! POST /store/products/{id}/comments/{comment}/delete  - Delete own comment
//!
//! # Orders
//! GET  /store/orders/{id}                  - Order detail or cart
//! POST /store/orders/{id}/items/{item}/delete  - Remove cart item
//! POST /store/orders/{id}/checkout         - Set address and place order
//!
//! # Users
//! GET  /store/users/{id}                   - Profile and listed products
//! GET  /store/users/{id}/products          - Products fragment (HTMX, next page)
//! POST /store/users/{id}/products          - Create product (owner, multipart)
//! GET  /store/users/{id}/orders            - Placed orders fragment (owner)
//! ```
//!
//! Actions are issued by htmx. Failures answer with the error modal fragment
//! retargeted over the page's modal, so each failure is shown once.

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod products;
pub mod users;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{Method, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::error::{AppError, clear_sentry_user};
use crate::middleware::StoreSession;
use crate::state::AppState;

// =============================================================================
// Routers
// =============================================================================

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::products))
        .route("/{id}", get(products::show).post(products::update))
        .route("/{id}/rating", post(products::rate))
        .route("/{id}/cart", post(cart::add))
        .route("/{id}/images", post(products::upload_images))
        .route("/{id}/images/{image}/delete", post(products::delete_image))
        .route("/{id}/comments", post(products::post_comment))
        .route(
            "/{id}/comments/{comment}/delete",
            post(products::delete_comment),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(orders::show))
        .route("/{id}/items/{item}/delete", post(orders::remove_item))
        .route("/{id}/checkout", post(orders::checkout))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(users::show))
        .route(
            "/{id}/products",
            get(users::products).post(users::create_product),
        )
        .route("/{id}/orders", get(users::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/store/") }))
        // Catalog
        .route("/store", get(catalog::index))
        .route("/store/", get(catalog::index))
        // Store pages
        .nest("/store/products", product_routes())
        .nest("/store/orders", order_routes())
        .nest("/store/users", user_routes())
        // Navigation targets
        .route("/cart", get(cart::show))
        .route("/logout", get(logout))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

// =============================================================================
// Health and session
// =============================================================================

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store backend is not live.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.api().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Store backend not ready: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Hand logout to the backend, which owns the session.
pub async fn logout(State(state): State<AppState>) -> Result<Redirect, AppError> {
    clear_sentry_user();
    let url = state
        .config()
        .backend
        .logout_url()
        .map_err(|e| AppError::Internal(format!("Invalid logout URL: {e}")))?;
    Ok(Redirect::to(url.as_str()))
}

// =============================================================================
// Form fields
// =============================================================================

/// URL-encoded form or query fields, keeping repeated keys.
///
/// Category checkboxes submit one `category` pair per checked label, which
/// the serde-based extractors cannot represent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    #[must_use]
    pub fn parse(input: &[u8]) -> Self {
        Self(url::form_urlencoded::parse(input).into_owned().collect())
    }

    /// First value of `key`, trimmed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
    }

    /// Every non-empty value of `key`, in submission order.
    #[must_use]
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Whether a checkbox named `key` was submitted checked.
    #[must_use]
    pub fn checked(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v != "false" && v != "off")
    }

    /// Parse the first value of `key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the field is missing or invalid.
    pub fn parse_field<T: std::str::FromStr>(&self, key: &str, label: &str) -> Result<T, AppError> {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {label}")))
    }
}

impl FromIterator<(String, String)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        Self(pairs.into_iter().collect())
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if request.method() == Method::GET {
            let query = request.uri().query().unwrap_or_default();
            return Ok(Self::parse(query.as_bytes()));
        }

        let body = Bytes::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self::parse(&body))
    }
}

// =============================================================================
// Action responses
// =============================================================================

/// Error modal fragment (for HTMX), also embedded in every page.
#[derive(Template, WebTemplate)]
#[template(path = "partials/error_modal.html")]
pub struct ErrorModalTemplate {
    pub errors: Vec<String>,
}

/// Respond to a failed action.
///
/// HTMX requests get the error modal swapped over the page's modal with a
/// 200 status, since htmx ignores error responses. The messages already
/// collected on the session are shown; if the failure never reached the
/// surface its own message is shown instead.
pub fn action_failed(store: &StoreSession, error: AppError) -> Response {
    if !store.htmx {
        return error.into_response();
    }

    let mut errors = store.notices.take();
    if errors.is_empty() {
        if error.status().is_server_error() {
            tracing::error!(error = %error, "Action failed");
        }
        errors.push(error.user_message());
    }

    (
        AppendHeaders([("HX-Retarget", "#error-modal"), ("HX-Reswap", "outerHTML")]),
        ErrorModalTemplate { errors },
    )
        .into_response()
}

/// Send the browser to `location` after a successful action.
pub fn redirect_after(store: &StoreSession, location: &str) -> Response {
    if store.htmx {
        (AppendHeaders([("HX-Redirect", location.to_string())]), StatusCode::OK).into_response()
    } else {
        Redirect::to(location).into_response()
    }
}

/// Empty 200 response; htmx removes the target element on swap.
pub fn removed() -> Response {
    StatusCode::OK.into_response()
}
