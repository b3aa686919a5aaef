//! Display data shared by page templates.

use chrono::DateTime;
use tokio::task::JoinSet;

use online_store_core::{CategoryCatalog, CategoryMask, ProductId};

use crate::api::{ApiSession, Product, User};
use crate::navigation::NavigationView;

/// Format a backend timestamp for display.
///
/// RFC 3339 values render as `dd.mm.yyyy HH:MM`; anything else is shown as
/// received.
#[must_use]
pub fn format_timestamp(value: Option<&str>) -> String {
    match value {
        Some(raw) => DateTime::parse_from_rfc3339(raw).map_or_else(
            |_| raw.to_string(),
            |parsed| parsed.format("%d.%m.%Y %H:%M").to_string(),
        ),
        None => String::new(),
    }
}

/// Format an average rating with one decimal.
#[must_use]
pub fn format_rating(rating: f64) -> String {
    format!("{rating:.1}")
}

/// Shared layout data: header, error modal and script nonce.
#[derive(Debug, Clone)]
pub struct PageChrome {
    pub nav: NavigationView,
    /// Messages shown in the error modal on load.
    pub errors: Vec<String>,
    pub nonce: String,
}

impl PageChrome {
    #[must_use]
    pub const fn new(nav: NavigationView, errors: Vec<String>, nonce: String) -> Self {
        Self { nav, errors, nonce }
    }
}

/// A category checkbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOption {
    pub label: String,
    pub checked: bool,
}

/// Checkboxes for every catalog label, checked where `mask` has the bit.
#[must_use]
pub fn category_options(catalog: &CategoryCatalog, mask: CategoryMask) -> Vec<CategoryOption> {
    catalog
        .labels()
        .iter()
        .map(|label| CategoryOption {
            label: label.clone(),
            checked: catalog
                .code(label)
                .is_some_and(|code| mask.contains(code)),
        })
        .collect()
}

/// A product tile in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTileView {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub rating: String,
    /// `src` of the tile image; the placeholder when the product has none.
    pub image: String,
}

impl ProductTileView {
    fn new(product: &Product, image: String) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price.to_string(),
            rating: format_rating(product.rating),
            image,
        }
    }
}

/// Build tiles for `products`, fetching each first image concurrently.
///
/// Image failures are never displayed; the tile falls back to `placeholder`.
pub async fn product_tiles(
    api: &ApiSession,
    products: &[Product],
    placeholder: &str,
) -> Vec<ProductTileView> {
    let mut images = vec![placeholder.to_string(); products.len()];
    let mut tasks = JoinSet::new();

    for (index, product) in products.iter().enumerate() {
        let api = api.clone();
        let id = product.id;
        let placeholder = placeholder.to_string();
        tasks.spawn(async move { (index, api.first_image(id, &placeholder).await) });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, src)) => {
                if let Some(slot) = images.get_mut(index) {
                    *slot = src;
                }
            }
            Err(e) => tracing::warn!("Tile image task failed: {e}"),
        }
    }

    products
        .iter()
        .zip(images)
        .map(|(product, image)| ProductTileView::new(product, image))
        .collect()
}

/// A user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub picture_url: String,
    pub created_at: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            picture_url: user.picture_url.clone(),
            created_at: format_timestamp(user.created_at.as_deref()),
        }
    }
}
