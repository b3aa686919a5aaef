//! Cart route handlers.
//!
//! The cart is the user's order with status In Cart. It is looked up on
//! every use and created only when the user has none.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Path,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use tracing::instrument;

use online_store_core::ProductId;

use super::{FormFields, action_failed};
use crate::api::NewItem;
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::StoreSession;

/// Add-to-cart confirmation fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_notice.html")]
pub struct CartNoticeTemplate {
    pub message: &'static str,
}

/// Parse the quantity to add. A missing field adds one.
///
/// # Errors
///
/// Returns `AppError::BadRequest` unless the quantity is at least one.
pub fn parse_add_quantity(fields: &FormFields) -> Result<i64, AppError> {
    if fields.get("quantity").is_none_or(str::is_empty) {
        return Ok(1);
    }

    fields
        .parse_field::<i64>("quantity", "quantity")
        .ok()
        .filter(|quantity| *quantity >= 1)
        .ok_or_else(|| AppError::BadRequest("Quantity must be at least 1".to_string()))
}

/// Add a product to the cart (HTMX).
#[instrument(skip(store, fields))]
pub async fn add(store: StoreSession, Path(id): Path<ProductId>, fields: FormFields) -> Response {
    let result = async {
        let quantity = parse_add_quantity(&fields)?;
        let cart = store.api.cart().await?;
        store
            .api
            .add_item(
                cart.id,
                NewItem {
                    product_id: id,
                    quantity,
                },
            )
            .await?;
        Ok::<_, AppError>(cart.id)
    }
    .await;

    match result {
        Ok(cart_id) => {
            add_breadcrumb(
                "cart",
                "Added product to cart",
                Some(&[
                    ("product_id", id.to_string().as_str()),
                    ("order_id", cart_id.to_string().as_str()),
                ]),
            );

            (
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                CartNoticeTemplate { message: "Success" },
            )
                .into_response()
        }
        Err(e) => action_failed(&store, e),
    }
}

/// Send the header's cart button to the cart order.
#[instrument(skip(store))]
pub async fn show(store: StoreSession) -> Result<Redirect, AppError> {
    let cart = store.api.cart().await?;
    Ok(Redirect::to(&format!("/store/orders/{}", cart.id)))
}
