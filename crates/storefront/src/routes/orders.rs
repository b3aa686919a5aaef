//! Order route handlers.
//!
//! One page serves both the cart and placed orders. The cart lists its items
//! with remove buttons, a subtotal and the checkout form; a placed order
//! shows its status, shipping address, dates and invoice instead.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Path,
    response::{IntoResponse, Response},
};
use tokio::task::JoinSet;
use tracing::instrument;

use online_store_core::{ItemId, OrderId, OrderStatus, Price, ProductId};

use super::{FormFields, action_failed, redirect_after, removed};
use crate::api::{Address, ApiSession, Invoice, Order, OrderItem};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, StoreSession};
use crate::navigation::NavigationView;
use crate::views::{PageChrome, format_timestamp};

// =============================================================================
// Views
// =============================================================================

/// An order line for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemView {
    pub id: Option<ItemId>,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub price: String,
}

impl OrderItemView {
    fn new(item: &OrderItem, name: Option<&String>) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            name: name.map_or_else(|| format!("Product {}", item.product_id), Clone::clone),
            quantity: item.quantity,
            price: item.price.to_string(),
        }
    }
}

/// Invoice display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceView {
    pub id: String,
    pub total: String,
}

impl From<&Invoice> for InvoiceView {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.map(|id| id.to_string()).unwrap_or_default(),
            total: invoice.total_price.to_string(),
        }
    }
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub status: &'static str,
    pub is_cart: bool,
    pub address: String,
    pub created_at: String,
    pub latest_update: String,
    pub items: Vec<OrderItemView>,
    pub subtotal: String,
    pub invoice: Option<InvoiceView>,
}

impl OrderView {
    #[must_use]
    pub fn new(
        order: &Order,
        names: &HashMap<ProductId, String>,
        invoice: Option<&Invoice>,
    ) -> Self {
        Self {
            id: order.id,
            status: order.status.label(),
            is_cart: order.status.is_cart(),
            address: if order.address.is_complete() {
                order.address.to_string()
            } else {
                String::new()
            },
            created_at: format_timestamp(order.created_at.as_deref()),
            latest_update: format_timestamp(order.latest_update.as_deref()),
            items: order
                .products
                .iter()
                .map(|item| OrderItemView::new(item, names.get(&item.product_id)))
                .collect(),
            subtotal: subtotal(&order.products).map_or_else(|| "-".to_string(), |p| p.to_string()),
            invoice: invoice.map(InvoiceView::from),
        }
    }
}

/// An entry of a user's orders list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummaryView {
    pub id: OrderId,
    pub status: &'static str,
    pub created_at: String,
    pub items: usize,
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status.label(),
            created_at: format_timestamp(order.created_at.as_deref()),
            items: order.products.len(),
        }
    }
}

/// Sum of unit price times quantity over `items`.
///
/// Returns `None` if the items mix currencies or the sum overflows.
#[must_use]
pub fn subtotal(items: &[OrderItem]) -> Option<Price> {
    let currency = items.first().map(|item| item.price.currency).unwrap_or_default();
    items.iter().try_fold(Price::new(0, currency), |total, item| {
        item.price
            .times(item.quantity)
            .and_then(|line| total.checked_add(line))
            .ok()
    })
}

/// Shipping address from the checkout form.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if any field is blank.
pub fn checkout_address(fields: &FormFields) -> Result<Address, AppError> {
    let field = |key| fields.get(key).unwrap_or_default().to_string();
    let address = Address {
        city: field("city"),
        country: field("country"),
        address: field("address"),
        postal_code: field("postal_code"),
    };

    if address.is_complete() {
        Ok(address)
    } else {
        Err(AppError::BadRequest(
            "Fill in the city, country, address and postal code".to_string(),
        ))
    }
}

/// Names of the ordered products, fetched concurrently.
///
/// Products that fail to load are left out; the failures reach the page's
/// error modal.
async fn product_names(api: &ApiSession, items: &[OrderItem]) -> HashMap<ProductId, String> {
    let mut tasks = JoinSet::new();
    let mut ids: Vec<ProductId> = items.iter().map(|item| item.product_id).collect();
    ids.sort_unstable_by_key(ProductId::as_i64);
    ids.dedup();

    for id in ids {
        let api = api.clone();
        tasks.spawn(async move { (id, api.product(id).await) });
    }

    let mut names = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, Ok(product))) => {
                names.insert(id, product.name);
            }
            Ok((_, Err(_))) => {}
            Err(e) => tracing::warn!("Product name task failed: {e}"),
        }
    }
    names
}

// =============================================================================
// Templates
// =============================================================================

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageChrome,
    pub order: OrderView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display an order or the cart.
#[instrument(skip(store, nonce))]
pub async fn show(
    store: StoreSession,
    CspNonce(nonce): CspNonce,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse, AppError> {
    let nav = NavigationView::resolve(&store.api).await;
    let order = store.api.order_items(id).await?;

    if !nav.is(order.user_id) {
        return Err(AppError::NotFound(format!("order {id}")));
    }

    let invoice = async {
        if order.status == OrderStatus::InCart {
            None
        } else {
            store.api.invoice(id).await.ok()
        }
    };
    let (names, invoice) = tokio::join!(product_names(&store.api, &order.products), invoice);

    Ok(OrderShowTemplate {
        order: OrderView::new(&order, &names, invoice.as_ref()),
        page: PageChrome::new(nav, store.notices.take(), nonce),
    })
}

/// Remove an item from the cart (HTMX).
#[instrument(skip(store))]
pub async fn remove_item(
    store: StoreSession,
    Path((id, item)): Path<(OrderId, ItemId)>,
) -> Response {
    match store.api.remove_item(id, item).await {
        Ok(()) => removed(),
        Err(e) => action_failed(&store, e.into()),
    }
}

/// Check out the cart: set the shipping address and place the order.
#[instrument(skip(store, fields))]
pub async fn checkout(store: StoreSession, Path(id): Path<OrderId>, fields: FormFields) -> Response {
    let result = async {
        let address = checkout_address(&fields)?;
        let mut order = store.api.order_items(id).await?;
        if !order.status.is_cart() {
            return Err(AppError::BadRequest(
                "This order has already been placed".to_string(),
            ));
        }

        order.address = address;
        order.status = OrderStatus::InProgress;
        Ok::<_, AppError>(store.api.update_order(&order).await?)
    }
    .await;

    match result {
        Ok(order) => {
            // Some backends answer without the id; the order keeps its id.
            let placed = if order.id.as_i64() == 0 { id } else { order.id };
            add_breadcrumb("order", "Placed order", Some(&[("order_id", placed.to_string().as_str())]));
            redirect_after(&store, &format!("/store/orders/{placed}"))
        }
        Err(e) => action_failed(&store, e),
    }
}

#[cfg(test)]
mod tests {
    use online_store_core::Currency;

    use super::*;

    fn item(product: i64, units: i64, quantity: i64) -> OrderItem {
        OrderItem {
            id: Some(ItemId::new(product * 10)),
            product_id: ProductId::new(product),
            quantity,
            price: Price::bgn(units),
        }
    }

    #[test]
    fn test_subtotal() {
        let items = vec![item(1, 1050, 2), item(2, 199, 1)];
        assert_eq!(subtotal(&items), Some(Price::bgn(2299)));
        assert_eq!(subtotal(&[]).map(|p| p.units), Some(0));
    }

    #[test]
    fn test_subtotal_rejects_mixed_currencies() {
        let mut other = item(2, 100, 1);
        other.price = Price::new(100, Currency::Other(9));
        assert_eq!(subtotal(&[item(1, 100, 1), other]), None);
    }

    #[test]
    fn test_checkout_address_requires_every_field() {
        let complete =
            FormFields::parse(b"city=Sofia&country=Bulgaria&address=1+Main+St&postal_code=1000");
        let address = checkout_address(&complete).ok();
        assert_eq!(
            address.map(|a| a.to_string()).as_deref(),
            Some("Sofia, Bulgaria, 1 Main St, 1000")
        );

        let missing = FormFields::parse(b"city=Sofia&country=Bulgaria&address=+&postal_code=1000");
        assert!(checkout_address(&missing).is_err());
    }

    #[test]
    fn test_order_view_names_and_invoice() {
        let order = Order {
            id: OrderId::new(4),
            status: OrderStatus::InProgress,
            products: vec![item(1, 500, 3), item(2, 100, 1)],
            ..Order::default()
        };
        let names = HashMap::from([(ProductId::new(1), "Lamp".to_string())]);
        let invoice = Invoice {
            id: Some(online_store_core::InvoiceId::new(9)),
            total_price: Price::bgn(1600),
            ..Invoice::default()
        };

        let view = OrderView::new(&order, &names, Some(&invoice));
        assert_eq!(view.status, "In Progress");
        assert!(!view.is_cart);
        assert_eq!(view.items.first().map(|i| i.name.as_str()), Some("Lamp"));
        assert_eq!(view.items.get(1).map(|i| i.name.as_str()), Some("Product 2"));
        assert_eq!(view.subtotal, "16,00 BGN");
        assert_eq!(
            view.invoice,
            Some(InvoiceView {
                id: "9".to_string(),
                total: "16,00 BGN".to_string(),
            })
        );
        assert_eq!(view.address, "");
    }
}
