//! Per-request binding to the store backend.
//!
//! The backend owns authentication: the storefront forwards the browser's
//! `Cookie` header on every backend call and never inspects it. The request
//! ID travels along for log correlation.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts},
};

use super::request_id::RequestId;
use crate::api::{ApiSession, Notices};
use crate::state::AppState;

/// Header set by htmx on the requests it issues.
pub const HX_REQUEST_HEADER: &str = "hx-request";

/// Extractor yielding a backend session for the current request.
///
/// Failures of backend calls made through `api` are collected in `notices`
/// so the handler can render them into the error modal.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(store: StoreSession) -> impl IntoResponse {
///     let user = store.api.current_user().await.ok();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StoreSession {
    pub api: ApiSession,
    pub notices: Arc<Notices>,
    /// Whether the request was issued by htmx.
    pub htmx: bool,
}

impl FromRequestParts<AppState> for StoreSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie = parts.headers.get(COOKIE).cloned();
        let htmx = parts.headers.contains_key(HX_REQUEST_HEADER);
        let notices = Arc::new(Notices::default());
        let mut api = state.api().session(cookie, notices.clone());
        if let Some(RequestId(id)) = parts.extensions.get::<RequestId>() {
            api = api.with_request_id(id.clone());
        }

        Ok(Self { api, notices, htmx })
    }
}
