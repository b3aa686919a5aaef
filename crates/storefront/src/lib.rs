//! Online Store storefront library.
//!
//! Server-rendered pages and htmx actions over the store backend's
//! `/api/v1` JSON API. The crate is a library so the router can be driven
//! from tests; `main.rs` only configures and serves it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod navigation;
pub mod routes;
pub mod state;
pub mod views;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Directory the `/static` assets are served from, relative to the
/// workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the storefront router with its middleware stack.
///
/// Sentry layers are added by the binary, outermost.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::csp_nonce_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
