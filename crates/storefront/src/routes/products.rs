//! Product detail route handlers.
//!
//! The product page shows the listing, its owner, up to ten images and the
//! comments. The owner additionally gets edit, upload and image delete
//! controls; commenters can delete their own comments.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::instrument;

use online_store_core::{
    CategoryCatalog, CommentId, Currency, ImageId, Price, ProductId,
};

use super::{FormFields, action_failed, redirect_after, removed};
use crate::api::{Comment, IMAGE_LIMIT, Image, NewImage, Product, ProductUpdate};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, StoreSession};
use crate::navigation::NavigationView;
use crate::state::AppState;
use crate::views::{
    CategoryOption, PageChrome, UserView, category_options, format_rating, format_timestamp,
};

/// Highest rating a user can give.
pub const MAX_RATING: u8 = 5;

// =============================================================================
// Views
// =============================================================================

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: String,
    /// Amount as typed into the edit form, e.g. `10,50`.
    pub price_input: String,
    pub currency: &'static str,
    pub quantity: i64,
    pub available: bool,
    pub rating: String,
    pub ratings_count: i64,
    pub created_at: String,
    /// Category labels joined for display.
    pub categories: String,
    pub category_options: Vec<CategoryOption>,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, catalog: &CategoryCatalog) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            price_input: product.price.amount_string(),
            currency: product.price.currency.symbol(),
            quantity: product.quantity,
            available: product.available,
            rating: format_rating(product.rating),
            ratings_count: product.ratings_count,
            created_at: format_timestamp(product.created_at.as_deref()),
            categories: catalog.display(product.category),
            category_options: category_options(catalog, product.category),
        }
    }
}

/// Image display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    pub id: Option<ImageId>,
    pub src: String,
}

impl From<&Image> for ImageView {
    fn from(image: &Image) -> Self {
        Self {
            id: image.id,
            src: image.src(),
        }
    }
}

/// Comment display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub id: Option<CommentId>,
    pub product_id: ProductId,
    pub text: String,
    pub author: String,
    pub author_picture: String,
    pub created_at: String,
    /// Whether the viewer wrote it and may delete it.
    pub own: bool,
}

impl CommentView {
    #[must_use]
    pub fn new(comment: &Comment, product_id: ProductId, own: bool) -> Self {
        Self {
            id: comment.id,
            product_id,
            text: comment.comment.clone(),
            author: comment.user.name.clone(),
            author_picture: comment.user.picture_url.clone(),
            created_at: format_timestamp(comment.created_at.as_deref()),
            own,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageChrome,
    pub product: ProductView,
    pub owner: Option<UserView>,
    pub images: Vec<ImageView>,
    pub comments: Vec<CommentView>,
    pub is_owner: bool,
}

/// Rating fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/rating.html")]
pub struct RatingTemplate {
    pub rating: String,
    pub ratings_count: i64,
}

/// Single comment fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/comment.html")]
pub struct CommentTemplate {
    pub comment: CommentView,
}

// =============================================================================
// Form parsing
// =============================================================================

/// Parse a rating field, which must be a whole number from 0 to 5.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for anything else.
pub fn parse_rating(fields: &FormFields) -> Result<u8, AppError> {
    fields
        .get("rating")
        .and_then(|r| r.parse::<u8>().ok())
        .filter(|r| *r <= MAX_RATING)
        .ok_or_else(|| {
            AppError::BadRequest(format!("Rating must be between 0 and {MAX_RATING}"))
        })
}

/// Parse the price field into minor units.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the amount is not a decimal number.
pub fn parse_price(fields: &FormFields) -> Result<Price, AppError> {
    Price::parse_amount(fields.get("price").unwrap_or_default(), Currency::Bgn)
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Parse the quantity field, which must not be negative.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the quantity is missing or negative.
pub fn parse_quantity(fields: &FormFields) -> Result<i64, AppError> {
    fields
        .parse_field::<i64>("quantity", "quantity")
        .and_then(|quantity| {
            if quantity < 0 {
                Err(AppError::BadRequest(
                    "Quantity must not be negative".to_string(),
                ))
            } else {
                Ok(quantity)
            }
        })
}

/// Build the edit request from the form and the product's current state.
///
/// Submitting no category keeps the current categories.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if a field is invalid.
pub fn product_update(
    fields: &FormFields,
    current: &Product,
    catalog: &CategoryCatalog,
) -> Result<ProductUpdate, AppError> {
    Ok(ProductUpdate {
        description: fields.get("description").unwrap_or_default().to_string(),
        price: parse_price(fields)?,
        quantity: parse_quantity(fields)?,
        available: fields.checked("available"),
        category: catalog.encode_for_update(fields.all("category"), current.category),
    })
}

/// Text fields and image files of a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: FormFields,
    pub images: Vec<NewImage>,
}

impl UploadForm {
    /// Read every part; files become base64 `data:` URLs.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is malformed or a file is
    /// not an image.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut pairs = Vec::new();
        let mut images = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_none() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                pairs.push((name, text));
                continue;
            }

            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

            // Browsers send an empty part for an empty file input
            if bytes.is_empty() {
                continue;
            }

            images.push(encode_image(&content_type, &bytes)?);
        }

        Ok(Self {
            fields: pairs.into_iter().collect(),
            images,
        })
    }
}

/// Encode an uploaded file the way the backend stores images.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the content type is not an image type.
pub fn encode_image(content_type: &str, bytes: &[u8]) -> Result<NewImage, AppError> {
    let format = content_type
        .strip_prefix("image/")
        .filter(|format| !format.is_empty())
        .ok_or_else(|| AppError::BadRequest("Only image files can be uploaded".to_string()))?;

    Ok(NewImage {
        data: format!("data:{content_type};base64,{}", STANDARD.encode(bytes)),
        format: format.to_string(),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the product page.
#[instrument(skip(state, store, nonce))]
pub async fn show(
    State(state): State<AppState>,
    store: StoreSession,
    CspNonce(nonce): CspNonce,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let nav = NavigationView::resolve(&store.api).await;
    let product = store.api.product(id).await?;

    let product_id = id.to_string();
    add_breadcrumb("navigation", "Viewed product page", Some(&[("product_id", product_id.as_str())]));

    let (owner, images, comments) = tokio::join!(
        store.api.user(product.user_id),
        store.api.product_images(id, IMAGE_LIMIT),
        store.api.comments(id),
    );

    let catalog = &state.config().catalog.categories;
    let is_owner = nav.is(product.user_id);
    let comments = comments
        .unwrap_or_default()
        .iter()
        .map(|comment| CommentView::new(comment, id, nav.is(comment.user.id)))
        .collect();

    Ok(ProductShowTemplate {
        product: ProductView::new(&product, catalog),
        owner: owner.ok().as_ref().map(UserView::from),
        images: images
            .unwrap_or_default()
            .iter()
            .map(ImageView::from)
            .collect(),
        comments,
        is_owner,
        page: PageChrome::new(nav, store.notices.take(), nonce),
    })
}

/// Edit the product (owner).
#[instrument(skip(state, store, fields))]
pub async fn update(
    State(state): State<AppState>,
    store: StoreSession,
    Path(id): Path<ProductId>,
    fields: FormFields,
) -> Response {
    let result = async {
        let current = store.api.product(id).await?;
        let update = product_update(&fields, &current, &state.config().catalog.categories)?;
        store.api.update_product(id, &update).await?;
        Ok::<_, AppError>(())
    }
    .await;

    match result {
        Ok(()) => redirect_after(&store, &format!("/store/products/{id}")),
        Err(e) => action_failed(&store, e),
    }
}

/// Rate the product (HTMX).
#[instrument(skip(store, fields))]
pub async fn rate(store: StoreSession, Path(id): Path<ProductId>, fields: FormFields) -> Response {
    let result = async {
        let rating = parse_rating(&fields)?;
        Ok::<_, AppError>(store.api.rate_product(id, rating).await?)
    }
    .await;

    match result {
        Ok(product) => RatingTemplate {
            rating: format_rating(product.rating),
            ratings_count: product.ratings_count,
        }
        .into_response(),
        Err(e) => action_failed(&store, e),
    }
}

/// Upload images to the product (owner, multipart).
#[instrument(skip(store, multipart))]
pub async fn upload_images(
    store: StoreSession,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Response {
    let result = async {
        let form = UploadForm::read(multipart).await?;
        if form.images.is_empty() {
            return Err(AppError::BadRequest("Choose at least one image".to_string()));
        }
        for image in &form.images {
            store.api.upload_image(id, image).await?;
        }
        Ok::<_, AppError>(())
    }
    .await;

    match result {
        Ok(()) => redirect_after(&store, &format!("/store/products/{id}")),
        Err(e) => action_failed(&store, e),
    }
}

/// Delete an image (owner, HTMX).
#[instrument(skip(store))]
pub async fn delete_image(
    store: StoreSession,
    Path((id, image)): Path<(ProductId, ImageId)>,
) -> Response {
    match store.api.delete_image(id, image).await {
        Ok(()) => removed(),
        Err(e) => action_failed(&store, e.into()),
    }
}

/// Post a comment (HTMX).
#[instrument(skip(store, fields))]
pub async fn post_comment(
    store: StoreSession,
    Path(id): Path<ProductId>,
    fields: FormFields,
) -> Response {
    let result = async {
        let text = fields
            .get("comment")
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AppError::BadRequest("Comment must not be empty".to_string()))?;
        Ok::<_, AppError>(store.api.post_comment(id, text).await?)
    }
    .await;

    match result {
        Ok(comment) => CommentTemplate {
            comment: CommentView::new(&comment, id, true),
        }
        .into_response(),
        Err(e) => action_failed(&store, e),
    }
}

/// Delete an own comment (HTMX).
#[instrument(skip(store))]
pub async fn delete_comment(
    store: StoreSession,
    Path((id, comment)): Path<(ProductId, CommentId)>,
) -> Response {
    match store.api.delete_comment(id, comment).await {
        Ok(()) => removed(),
        Err(e) => action_failed(&store, e.into()),
    }
}

#[cfg(test)]
mod tests {
    use online_store_core::CategoryMask;

    use super::*;

    fn product(category: u32) -> Product {
        Product {
            id: ProductId::new(5),
            category: CategoryMask::from_bits(category),
            price: Price::bgn(1050),
            ..Product::default()
        }
    }

    #[test]
    fn test_parse_rating_bounds() {
        assert_eq!(parse_rating(&FormFields::parse(b"rating=0")).ok(), Some(0));
        assert_eq!(parse_rating(&FormFields::parse(b"rating=5")).ok(), Some(5));
        assert!(parse_rating(&FormFields::parse(b"rating=6")).is_err());
        assert!(parse_rating(&FormFields::parse(b"rating=-1")).is_err());
        assert!(parse_rating(&FormFields::parse(b"")).is_err());
    }

    #[test]
    fn test_update_keeps_categories_when_none_checked() {
        let catalog = CategoryCatalog::default();
        let fields = FormFields::parse(b"description=Warm&price=12%2C30&quantity=4&available=on");
        let update = product_update(&fields, &product(0b101), &catalog);
        let update = update.ok();
        assert_eq!(update.as_ref().map(|u| u.category.bits()), Some(0b101));
        assert_eq!(update.as_ref().map(|u| u.price.units), Some(1230));
        assert_eq!(update.as_ref().map(|u| u.available), Some(true));
    }

    #[test]
    fn test_update_replaces_checked_categories() {
        let catalog = CategoryCatalog::default();
        let fields = FormFields::parse(b"price=3&quantity=1&category=Books");
        let update = product_update(&fields, &product(0b101), &catalog).ok();
        assert_eq!(update.as_ref().map(|u| u.category.bits()), Some(128));
        assert_eq!(update.as_ref().map(|u| u.price.units), Some(300));
        assert_eq!(update.as_ref().map(|u| u.available), Some(false));
    }

    #[test]
    fn test_update_rejects_bad_fields() {
        let catalog = CategoryCatalog::default();
        let bad_price = FormFields::parse(b"price=abc&quantity=1");
        assert!(product_update(&bad_price, &product(1), &catalog).is_err());

        let negative = FormFields::parse(b"price=1&quantity=-2");
        assert!(product_update(&negative, &product(1), &catalog).is_err());
    }

    #[test]
    fn test_encode_image() {
        let image = encode_image("image/png", b"abc").ok();
        assert_eq!(
            image,
            Some(NewImage {
                data: "data:image/png;base64,YWJj".to_string(),
                format: "png".to_string(),
            })
        );
        assert!(encode_image("text/plain", b"abc").is_err());
    }

    #[test]
    fn test_product_view() {
        let catalog = CategoryCatalog::default();
        let view = ProductView::new(&product(0b1_0000_0001), &catalog);
        assert_eq!(view.price, "10,50 BGN");
        assert_eq!(view.price_input, "10,50");
        assert_eq!(view.categories, "Home Cars");
        assert_eq!(
            view.category_options
                .iter()
                .filter(|option| option.checked)
                .count(),
            2
        );
    }
}
