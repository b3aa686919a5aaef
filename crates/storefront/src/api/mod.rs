//! Client for the store backend's JSON REST API (`/api/v1`).
//!
//! # Architecture
//!
//! - The backend owns persistence, authentication, images and checkout.
//!   The storefront never stores entities; it calls the API and renders.
//! - Every call goes through [`ApiSession::fetch_with_status_check`], which
//!   checks the status, hands the response to a continuation and reports any
//!   failure exactly once to the request's [`ErrorSurface`].
//! - Public user profiles are cached in-memory via `moka`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use online_store_storefront::api::{ApiClient, Notices};
//!
//! let client = ApiClient::new(&config.backend)?;
//! let notices = Arc::new(Notices::default());
//! let session = client.session(cookie_header, notices.clone());
//!
//! let product = session.product(ProductId::new(5)).await?;
//! ```

mod client;
mod surface;
pub mod types;

pub use client::{ApiClient, ApiRequest, ApiResponse, ApiSession, FetchOptions, IMAGE_LIMIT};
pub use surface::{ErrorSurface, Notices};
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the store backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The response body is not the expected JSON.
    #[error("Invalid response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be serialized.
    #[error("Invalid request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A continuation rejected an otherwise successful response.
    #[error("{0}")]
    Continuation(String),

    /// An endpoint path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Text shown to the user in the error modal.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Network(e) if e.is_timeout() => "The store is not responding".to_string(),
            Self::Network(_) => "Could not reach the store".to_string(),
            Self::Status { message, .. } | Self::Continuation(message) => message.clone(),
            Self::Decode(_) => "The store sent an unexpected response".to_string(),
            Self::Encode(_) | Self::InvalidUrl(_) => "Invalid request".to_string(),
        }
    }

    /// Backend status code, when the failure is a non-2xx response.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend reported the resource missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
