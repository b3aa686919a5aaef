//! Catalog route handlers.
//!
//! The catalog page searches products by name and category. Results load
//! one page at a time; the "load more" button swaps itself for the next
//! page of tiles, and a new search replaces the whole grid.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use super::{FormFields, action_failed};
use crate::api::{ApiError, ProductPage, ProductQuery};
use crate::config::CatalogConfig;
use crate::filters;
use crate::middleware::{CspNonce, StoreSession};
use crate::navigation::NavigationView;
use crate::state::AppState;
use crate::views::{CategoryOption, PageChrome, ProductTileView, category_options, product_tiles};

/// Search criteria of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSearch {
    pub name: String,
    /// Checked category labels.
    pub categories: Vec<String>,
    /// 1-based page number.
    pub page: u32,
}

impl CatalogSearch {
    #[must_use]
    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            name: fields.get("name").unwrap_or_default().to_string(),
            categories: fields
                .all("category")
                .into_iter()
                .map(String::from)
                .collect(),
            page: fields
                .get("page")
                .and_then(|p| p.parse().ok())
                .filter(|p| *p > 0)
                .unwrap_or(1),
        }
    }

    /// Backend query for this search. No checked category means all.
    #[must_use]
    pub fn query(&self, catalog: &CatalogConfig) -> ProductQuery {
        ProductQuery {
            name: Some(self.name.clone()).filter(|n| !n.is_empty()),
            page: self.page,
            page_size: catalog.page_size,
            category: Some(catalog.categories.filter_mask(&self.categories)),
            user_id: None,
        }
    }

    /// Fragment URL of page `page` of this search.
    #[must_use]
    pub fn href(&self, page: u32) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if !self.name.is_empty() {
            query.append_pair("name", &self.name);
        }
        for category in &self.categories {
            query.append_pair("category", category);
        }
        query.append_pair("page", &page.to_string());
        format!("/store/products?{}", query.finish())
    }
}

/// Product tiles fragment template (for HTMX), followed by the "load more"
/// button when another page exists.
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_tiles.html")]
pub struct ProductTilesTemplate {
    pub tiles: Vec<ProductTileView>,
    pub more_href: Option<String>,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub page: PageChrome,
    pub name: String,
    pub categories: Vec<CategoryOption>,
    pub tiles: Vec<ProductTileView>,
    pub more_href: Option<String>,
}

/// Whether another page follows page `number` of a listing.
pub(crate) fn has_more(listing: &ProductPage, number: u32, size: u32) -> bool {
    match listing.count {
        Some(total) => i64::from(number) * i64::from(size) < total,
        None => usize::try_from(size).is_ok_and(|size| size > 0 && listing.products.len() >= size),
    }
}

/// Fetch one page of products and build its tiles.
///
/// `href` gives the fragment URL of a page number.
pub(crate) async fn load_tiles(
    store: &StoreSession,
    catalog: &CatalogConfig,
    query: &ProductQuery,
    href: impl FnOnce(u32) -> String,
) -> Result<ProductTilesTemplate, ApiError> {
    let listing = store.api.products(query).await?;
    let tiles = product_tiles(&store.api, &listing.products, &catalog.placeholder_image).await;
    let more_href = has_more(&listing, query.page, query.page_size).then(|| href(query.page + 1));

    Ok(ProductTilesTemplate { tiles, more_href })
}

/// Display the catalog page.
#[instrument(skip(state, store, nonce, fields))]
pub async fn index(
    State(state): State<AppState>,
    store: StoreSession,
    CspNonce(nonce): CspNonce,
    fields: FormFields,
) -> impl IntoResponse {
    let nav = NavigationView::resolve(&store.api).await;
    let catalog = &state.config().catalog;
    let search = CatalogSearch::from_fields(&fields);

    let grid = load_tiles(&store, catalog, &search.query(catalog), |page| {
        search.href(page)
    })
    .await
    .unwrap_or(ProductTilesTemplate {
        tiles: Vec::new(),
        more_href: None,
    });

    let checked = catalog.categories.encode(&search.categories);

    CatalogTemplate {
        page: PageChrome::new(nav, store.notices.take(), nonce),
        name: search.name,
        categories: category_options(&catalog.categories, checked),
        tiles: grid.tiles,
        more_href: grid.more_href,
    }
}

/// Product tiles for a search or its next page (HTMX).
#[instrument(skip(state, store, fields))]
pub async fn products(
    State(state): State<AppState>,
    store: StoreSession,
    fields: FormFields,
) -> Response {
    let catalog = &state.config().catalog;
    let search = CatalogSearch::from_fields(&fields);

    match load_tiles(&store, catalog, &search.query(catalog), |page| {
        search.href(page)
    })
    .await
    {
        Ok(grid) => grid.into_response(),
        Err(e) => action_failed(&store, e.into()),
    }
}
