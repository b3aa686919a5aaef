//! Backend HTTP client and the status-checking request wrapper.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use online_store_core::{CommentId, ImageId, ItemId, OrderId, OrderStatus, ProductId, UserId};

use super::types::{
    Comment, ErrorBody, Image, Invoice, NewComment, NewImage, NewItem, NewOrder, NewProduct,
    Order, OrderItem, Product, ProductListing, ProductPage, ProductQuery, ProductUpdate,
    RatingInput, User,
};
use super::{ApiError, ErrorSurface};
use crate::config::BackendConfig;
use crate::middleware::request_id::REQUEST_ID_HEADER;

/// Images requested for the product detail gallery.
pub const IMAGE_LIMIT: u32 = 10;

/// Longest backend body excerpt written to logs.
const LOG_BODY_CHARS: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the store backend.
///
/// Cheap to clone. Public user profiles are cached for the configured TTL.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base: Url,
    users: Cache<UserId, User>,
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL cannot be a base URL or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let users = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.user_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base: config.api_base()?,
                users,
            }),
        })
    }

    /// Bind the client to one inbound request.
    ///
    /// `cookie` is the browser's `Cookie` header, forwarded so the backend
    /// can authenticate the user. Failures are reported to `surface`.
    #[must_use]
    pub fn session(
        &self,
        cookie: Option<HeaderValue>,
        surface: Arc<dyn ErrorSurface>,
    ) -> ApiSession {
        ApiSession {
            client: self.clone(),
            cookie,
            request_id: None,
            surface,
        }
    }

    /// Absolute URL of an API path such as `products/5/images`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not form a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base.join(path.trim_start_matches('/'))?)
    }

    /// Check that the backend answers its liveness probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.endpoint("liveness")?;
        let status = self.inner.http.get(url).send().await?.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status,
                message: "Store backend is not live".to_string(),
            })
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.inner.base.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Requests and responses
// =============================================================================

/// One backend request: method, API path, query and optional JSON body.
#[derive(Debug)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Result<Vec<u8>>>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append query string pairs.
    #[must_use]
    pub fn query<I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        self.query.extend(pairs);
        self
    }

    /// Attach a JSON body. Serialization failures surface when the request
    /// is sent.
    #[must_use]
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(serde_json::to_vec(body));
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A successful (2xx) backend response with its body read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if the body is not the expected JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&self.body),
                "Failed to decode store backend response"
            );
            ApiError::Decode(e)
        })
    }
}

/// Per-call options of [`ApiSession::fetch_with_status_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Show failures on the error surface.
    pub display_error: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            display_error: true,
        }
    }
}

impl FetchOptions {
    /// Options for calls whose failures are handled silently.
    #[must_use]
    pub const fn suppressed() -> Self {
        Self {
            display_error: false,
        }
    }
}

// =============================================================================
// ApiSession
// =============================================================================

/// The client bound to one inbound request.
#[derive(Clone)]
pub struct ApiSession {
    client: ApiClient,
    cookie: Option<HeaderValue>,
    request_id: Option<HeaderValue>,
    surface: Arc<dyn ErrorSurface>,
}

impl std::fmt::Debug for ApiSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSession")
            .field("client", &self.client)
            .field("authenticated", &self.cookie.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiSession {
    /// Forward `id` as `x-request-id` on every call of this session.
    #[must_use]
    pub fn with_request_id(mut self, id: HeaderValue) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Perform a request, check its status and hand the response to
    /// `continuation`.
    ///
    /// A network failure or non-2xx status fails the call without invoking
    /// the continuation. Any failure, including one returned by the
    /// continuation, is shown once on the error surface unless
    /// `options.display_error` is false.
    ///
    /// # Errors
    ///
    /// Returns the failure that was (or would have been) displayed.
    #[instrument(
        skip(self, request, continuation),
        fields(method = %request.method, path = %request.path)
    )]
    pub async fn fetch_with_status_check<T, F>(
        &self,
        request: ApiRequest,
        options: FetchOptions,
        continuation: F,
    ) -> Result<T, ApiError>
    where
        F: FnOnce(ApiResponse) -> Result<T, ApiError>,
    {
        let result = match self.send(request).await {
            Ok(response) => continuation(response),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if options.display_error {
                self.surface.show_error(&e.message());
            } else {
                debug!(error = %e, "Suppressed store backend failure");
            }
        }

        result
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut url = self.client.endpoint(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let mut builder = self
            .client
            .inner
            .http
            .request(request.method.clone(), url);

        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie.clone());
        }
        if let Some(id) = &self.request_id {
            builder = builder.header(REQUEST_ID_HEADER, id.clone());
        }

        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.map_err(ApiError::Encode)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %excerpt(&body),
                "Store backend returned non-success status"
            );
            return Err(ApiError::Status {
                status,
                message: error_message(status, &body),
            });
        }

        Ok(ApiResponse { status, body })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.fetch_with_status_check(request, FetchOptions::default(), |response| {
            response.json()
        })
        .await
    }

    async fn fetch_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.fetch_with_status_check(request, FetchOptions::default(), |_| Ok(()))
            .await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the user is not signed in.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.fetch_json(ApiRequest::get("users/me")).await
    }

    /// A user's public profile.
    ///
    /// The cache is shared by every visitor, so only the public fields are
    /// kept; the signed-in user's own details come from `current_user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the request fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn user(&self, id: UserId) -> Result<User, ApiError> {
        if let Some(user) = self.client.inner.users.get(&id).await {
            debug!("Cache hit for user");
            return Ok(user);
        }

        let user = self
            .fetch_json::<User>(ApiRequest::get(format!("users/{id}")))
            .await?
            .public();
        self.client.inner.users.insert(id, user.clone()).await;
        Ok(user)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// One page of products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let request = ApiRequest::get("products").query(query.to_pairs());
        let listing: ProductListing = self.fetch_json(request).await?;
        Ok(listing.into())
    }

    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.fetch_json(ApiRequest::get(format!("products/{id}")))
            .await
    }

    /// List a new product for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        self.fetch_json(ApiRequest::post("products").json(product))
            .await
    }

    /// Replace the editable fields of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<(), ApiError> {
        self.fetch_empty(ApiRequest::put(format!("products/{id}")).json(update))
            .await
    }

    /// Rate a product; returns the product with its new average.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the rating.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn rate_product(&self, id: ProductId, rating: u8) -> Result<Product, ApiError> {
        let request = ApiRequest::patch(format!("products/{id}")).json(&RatingInput { rating });
        self.fetch_json(request).await
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Up to `limit` images of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn product_images(
        &self,
        id: ProductId,
        limit: u32,
    ) -> Result<Vec<Image>, ApiError> {
        let request =
            ApiRequest::get(format!("products/{id}/images")).query([("limit", limit.to_string())]);
        self.fetch_json(request).await
    }

    /// `src` of a product's first image, or `placeholder` if it has none.
    ///
    /// Failures are never shown to the user.
    pub async fn first_image(&self, id: ProductId, placeholder: &str) -> String {
        let request =
            ApiRequest::get(format!("products/{id}/images")).query([("limit", "1".to_string())]);

        self.fetch_with_status_check(request, FetchOptions::suppressed(), |response| {
            let images: Vec<Image> = response.json()?;
            images
                .first()
                .map(Image::src)
                .ok_or_else(|| ApiError::Continuation("Product has no images".to_string()))
        })
        .await
        .unwrap_or_else(|_| placeholder.to_string())
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the image.
    #[instrument(skip(self, image), fields(product_id = %id, format = %image.format))]
    pub async fn upload_image(&self, id: ProductId, image: &NewImage) -> Result<Image, ApiError> {
        self.fetch_json(ApiRequest::post(format!("products/{id}/images")).json(image))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_image(&self, id: ProductId, image: ImageId) -> Result<(), ApiError> {
        self.fetch_empty(ApiRequest::delete(format!("products/{id}/images/{image}")))
            .await
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn comments(&self, id: ProductId) -> Result<Vec<Comment>, ApiError> {
        self.fetch_json(ApiRequest::get(format!("products/{id}/comments")))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the comment.
    pub async fn post_comment(&self, id: ProductId, comment: &str) -> Result<Comment, ApiError> {
        let body = NewComment {
            comment: comment.to_string(),
        };
        self.fetch_json(ApiRequest::post(format!("products/{id}/comments")).json(&body))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_comment(&self, id: ProductId, comment: CommentId) -> Result<(), ApiError> {
        self.fetch_empty(ApiRequest::delete(format!(
            "products/{id}/comments/{comment}"
        )))
        .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// The signed-in user's orders, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, ApiError> {
        let request = ApiRequest::get("orders").query(
            status
                .into_iter()
                .map(|status| ("status", status.code().to_string())),
        );
        self.fetch_json(request).await
    }

    /// # Errors
    ///
    /// Returns an error if the order does not exist or the request fails.
    pub async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.fetch_json(ApiRequest::get(format!("orders/{id}")))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the order.
    pub async fn create_order(&self, status: OrderStatus) -> Result<Order, ApiError> {
        self.fetch_json(ApiRequest::post("orders").json(&NewOrder { status }))
            .await
    }

    /// Replace an order, e.g. to set its address and move it out of the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status))]
    pub async fn update_order(&self, order: &Order) -> Result<Order, ApiError> {
        self.fetch_json(ApiRequest::put(format!("orders/{}", order.id)).json(order))
            .await
    }

    /// An order together with its items.
    ///
    /// # Errors
    ///
    /// Returns an error if the order does not exist or the request fails.
    pub async fn order_items(&self, id: OrderId) -> Result<Order, ApiError> {
        self.fetch_json(ApiRequest::get(format!("orders/{id}/items")))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the item.
    #[instrument(skip(self), fields(order_id = %id, product_id = %item.product_id))]
    pub async fn add_item(&self, id: OrderId, item: NewItem) -> Result<OrderItem, ApiError> {
        let request = ApiRequest::post(format!("orders/{id}/items")).json(&item);
        self.fetch_with_status_check(request, FetchOptions::default(), |response| {
            // Some backends answer with an empty body.
            if response.body.trim().is_empty() {
                return Ok(OrderItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    ..OrderItem::default()
                });
            }
            response.json()
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn remove_item(&self, id: OrderId, item: ItemId) -> Result<(), ApiError> {
        self.fetch_empty(ApiRequest::delete(format!("orders/{id}/items/{item}")))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the order has no invoice or the request fails.
    pub async fn invoice(&self, id: OrderId) -> Result<Invoice, ApiError> {
        self.fetch_json(ApiRequest::get(format!("orders/{id}/invoice")))
            .await
    }

    /// The signed-in user's cart, created if the user has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the orders cannot be listed or the cart cannot be
    /// created.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Order, ApiError> {
        let orders = self.orders(Some(OrderStatus::InCart)).await?;
        if let Some(cart) = orders.into_iter().find(|order| order.status.is_cart()) {
            return Ok(cart);
        }

        debug!("No cart order found, creating one");
        self.create_order(OrderStatus::InCart).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// User-facing message of a non-2xx response.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|error| error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), ToString::to_string)
        })
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&BackendConfig::new(
            Url::parse("http://localhost:8080").unwrap(),
        ))
        .unwrap()
    }

    #[test]
    fn test_error_message_prefers_body() {
        let message = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"code":400,"message":"Rating must be between 0 and 5"}"#,
        );
        assert_eq!(message, "Rating must be between 0 and 5");
    }

    #[test]
    fn test_error_message_falls_back_to_status_text() {
        assert_eq!(error_message(StatusCode::NOT_FOUND, "<html>"), "Not Found");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, r#"{"message":""}"#),
            "Bad Gateway"
        );
    }

    #[test]
    fn test_endpoint_joins_api_base() {
        let client = client();
        assert_eq!(
            client.endpoint("/products/5/images").unwrap().as_str(),
            "http://localhost:8080/api/v1/products/5/images"
        );
        assert_eq!(
            client.endpoint("users/me").unwrap().as_str(),
            "http://localhost:8080/api/v1/users/me"
        );
    }

    #[test]
    fn test_fetch_options_default_displays() {
        assert!(FetchOptions::default().display_error);
        assert!(!FetchOptions::suppressed().display_error);
    }

    #[test]
    fn test_response_json_decode_error() {
        let response = ApiResponse {
            status: StatusCode::OK,
            body: "not json".to_string(),
        };
        let result: Result<Product, ApiError> = response.json();
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
