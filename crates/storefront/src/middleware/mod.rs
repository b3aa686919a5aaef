//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce (generate per-request nonce for inline scripts)
//! 5. Security headers (CSP, frame and isolation policies)
//!
//! Handlers bind to the store backend through the [`StoreSession`] extractor.

pub mod backend;
pub mod csp;
pub mod request_id;
pub mod security_headers;

pub use backend::StoreSession;
pub use csp::{CspNonce, csp_nonce_middleware};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
