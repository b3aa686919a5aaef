//! User profile route handlers.
//!
//! The profile shows the user's details and the products they list. Viewing
//! your own profile adds the create-product form and your placed orders.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use online_store_core::{CategoryCatalog, CategoryMask, UserId};

use super::catalog::{ProductTilesTemplate, load_tiles};
use super::orders::OrderSummaryView;
use super::products::{UploadForm, parse_price, parse_quantity};
use super::{FormFields, action_failed, redirect_after};
use crate::api::{NewProduct, ProductQuery};
use crate::config::CatalogConfig;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, StoreSession};
use crate::navigation::NavigationView;
use crate::state::AppState;
use crate::views::{CategoryOption, PageChrome, ProductTileView, UserView, category_options};

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/show.html")]
pub struct UserShowTemplate {
    pub page: PageChrome,
    pub user: UserView,
    pub is_owner: bool,
    pub tiles: Vec<ProductTileView>,
    pub more_href: Option<String>,
    /// Checkboxes of the create-product form.
    pub categories: Vec<CategoryOption>,
}

/// Placed orders fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/orders_list.html")]
pub struct OrdersListTemplate {
    pub orders: Vec<OrderSummaryView>,
}

/// Backend query for page `page` of a user's products.
#[must_use]
pub fn user_products_query(id: UserId, page: u32, catalog: &CatalogConfig) -> ProductQuery {
    ProductQuery {
        name: None,
        page,
        page_size: catalog.page_size,
        category: None,
        user_id: Some(id),
    }
}

/// Fragment URL of page `page` of a user's products.
#[must_use]
pub fn user_products_href(id: UserId, page: u32) -> String {
    format!("/store/users/{id}/products?page={page}")
}

/// Build a new listing from the create-product form.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the name is blank or a number is
/// invalid.
pub fn new_product(fields: &FormFields, catalog: &CategoryCatalog) -> Result<NewProduct, AppError> {
    let name = fields
        .get("name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("Product name must not be empty".to_string()))?;

    Ok(NewProduct {
        name: name.to_string(),
        description: fields.get("description").unwrap_or_default().to_string(),
        price: parse_price(fields)?,
        quantity: parse_quantity(fields)?,
        available: fields.checked("available"),
        category: catalog.encode(fields.all("category")),
    })
}

fn page_number(fields: &FormFields) -> u32 {
    fields
        .get("page")
        .and_then(|p| p.parse().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1)
}

/// Display a user's profile.
#[instrument(skip(state, store, nonce))]
pub async fn show(
    State(state): State<AppState>,
    store: StoreSession,
    CspNonce(nonce): CspNonce,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, AppError> {
    let nav = NavigationView::resolve(&store.api).await;
    // Your own profile shows the full record; others get the public one
    let user = match nav.user.as_ref().filter(|user| user.id == id) {
        Some(own) => own.clone(),
        None => store.api.user(id).await?,
    };
    let catalog = &state.config().catalog;

    let grid = load_tiles(&store, catalog, &user_products_query(id, 1, catalog), |page| {
        user_products_href(id, page)
    })
    .await
    .unwrap_or(ProductTilesTemplate {
        tiles: Vec::new(),
        more_href: None,
    });

    Ok(UserShowTemplate {
        user: UserView::from(&user),
        is_owner: nav.is(id),
        tiles: grid.tiles,
        more_href: grid.more_href,
        categories: category_options(&catalog.categories, CategoryMask::EMPTY),
        page: PageChrome::new(nav, store.notices.take(), nonce),
    })
}

/// Next page of a user's products (HTMX).
#[instrument(skip(state, store, fields))]
pub async fn products(
    State(state): State<AppState>,
    store: StoreSession,
    Path(id): Path<UserId>,
    fields: FormFields,
) -> Response {
    let catalog = &state.config().catalog;
    let query = user_products_query(id, page_number(&fields), catalog);

    match load_tiles(&store, catalog, &query, |page| user_products_href(id, page)).await {
        Ok(grid) => grid.into_response(),
        Err(e) => action_failed(&store, e.into()),
    }
}

/// List a new product with optional images (owner, multipart).
#[instrument(skip(state, store, multipart))]
pub async fn create_product(
    State(state): State<AppState>,
    store: StoreSession,
    Path(id): Path<UserId>,
    multipart: Multipart,
) -> Response {
    let result = async {
        let form = UploadForm::read(multipart).await?;
        let product = new_product(&form.fields, &state.config().catalog.categories)?;

        let nav = NavigationView::resolve(&store.api).await;
        if !nav.is(id) {
            return Err(AppError::BadRequest(
                "Products can only be listed from your own profile".to_string(),
            ));
        }

        let created = store.api.create_product(&product).await?;
        add_breadcrumb(
            "product",
            "Listed product",
            Some(&[("product_id", created.id.to_string().as_str())]),
        );

        for image in &form.images {
            store.api.upload_image(created.id, image).await?;
        }
        Ok::<_, AppError>(created.id)
    }
    .await;

    match result {
        Ok(product_id) => redirect_after(&store, &format!("/store/products/{product_id}")),
        Err(e) => action_failed(&store, e),
    }
}

/// The signed-in user's placed orders (owner, HTMX).
#[instrument(skip(store))]
pub async fn orders(store: StoreSession, Path(id): Path<UserId>) -> Response {
    let result = async {
        let nav = NavigationView::resolve(&store.api).await;
        if !nav.is(id) {
            return Err(AppError::NotFound(format!("orders of user {id}")));
        }

        let orders = store.api.orders(None).await?;
        Ok::<_, AppError>(
            orders
                .iter()
                .filter(|order| !order.status.is_cart())
                .map(OrderSummaryView::from)
                .collect::<Vec<_>>(),
        )
    }
    .await;

    match result {
        Ok(orders) => OrdersListTemplate { orders }.into_response(),
        Err(e) => action_failed(&store, e),
    }
}
