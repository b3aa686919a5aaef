//! Records exchanged with the store backend.
//!
//! The backend serializes with camelCase keys and writes unset columns and
//! empty lists as `null`, so every field decodes a missing key or a `null`
//! to its default.

use online_store_core::{
    CategoryMask, CommentId, ImageId, InvoiceId, ItemId, OrderId, OrderStatus, Price, ProductId,
    UserId,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Decode `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Users
// =============================================================================

/// A store user as returned by `/users/{id}` and `/users/me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(deserialize_with = "null_as_default")]
    pub id: UserId,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: String,
    // The backend spells this key with a capital L.
    #[serde(
        rename = "LastName",
        alias = "lastName",
        deserialize_with = "null_as_default"
    )]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub picture_url: String,
    pub created_at: Option<String>,
}

impl User {
    /// The profile with private contact details removed.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.email.clear();
        self
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(deserialize_with = "null_as_default")]
    pub id: ProductId,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub price: Price,
    #[serde(deserialize_with = "null_as_default")]
    pub quantity: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub category: CategoryMask,
    #[serde(deserialize_with = "null_as_default")]
    pub available: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub ratings_count: i64,
    pub created_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: UserId,
}

/// One page of a product listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProductPage {
    #[serde(deserialize_with = "null_as_default")]
    pub products: Vec<Product>,
    /// Total number of matching products across all pages, when reported.
    pub count: Option<i64>,
}

/// The listing endpoint answers with either a page object or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductListing {
    Page(ProductPage),
    List(Vec<Product>),
}

impl From<ProductListing> for ProductPage {
    fn from(listing: ProductListing) -> Self {
        match listing {
            ProductListing::Page(page) => page,
            ProductListing::List(products) => Self {
                products,
                count: None,
            },
        }
    }
}

/// Body of `POST /products`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub quantity: i64,
    pub available: bool,
    pub category: CategoryMask,
}

/// Body of `PUT /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub description: String,
    pub price: Price,
    pub quantity: i64,
    pub available: bool,
    pub category: CategoryMask,
}

/// Body of `PATCH /products/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingInput {
    pub rating: u8,
}

/// Listing filters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Substring match on the product name.
    pub name: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    /// Products sharing at least one category with this mask.
    pub category: Option<CategoryMask>,
    /// Products listed by this user.
    pub user_id: Option<UserId>,
}

impl ProductQuery {
    /// Query string pairs in the backend's naming.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            pairs.push(("name", name.to_string()));
        }
        if self.page > 0 {
            pairs.push(("page", self.page.to_string()));
        }
        if self.page_size > 0 {
            pairs.push(("pageSize", self.page_size.to_string()));
        }
        if let Some(category) = self.category {
            pairs.push(("category", category.bits().to_string()));
        }
        if let Some(user_id) = self.user_id {
            pairs.push(("userId", user_id.to_string()));
        }
        pairs
    }
}

// =============================================================================
// Images
// =============================================================================

/// A product image. `data` is base64, optionally already a `data:` URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Image {
    pub id: Option<ImageId>,
    #[serde(deserialize_with = "null_as_default")]
    pub data: String,
    pub format: Option<String>,
}

impl Image {
    /// Value usable as an `<img src>`.
    #[must_use]
    pub fn src(&self) -> String {
        if self.data.starts_with("data:") {
            return self.data.clone();
        }
        let format = self.format.as_deref().unwrap_or("png");
        format!("data:image/{format};base64,{}", self.data)
    }
}

/// Body of `POST /products/{id}/images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewImage {
    pub data: String,
    pub format: String,
}

// =============================================================================
// Comments
// =============================================================================

/// A comment left on a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: Option<CommentId>,
    #[serde(deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user: User,
    pub created_at: Option<String>,
}

/// Body of `POST /products/{id}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub comment: String,
}

// =============================================================================
// Orders
// =============================================================================

/// Shipping address of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    /// Street address.
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub postal_code: String,
}

impl Address {
    /// Whether every field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.city, &self.country, &self.address, &self.postal_code]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.city, self.country, self.address, self.postal_code
        )
    }
}

/// A product line inside an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderItem {
    pub id: Option<ItemId>,
    #[serde(deserialize_with = "null_as_default")]
    pub product_id: ProductId,
    #[serde(deserialize_with = "null_as_default")]
    pub quantity: i64,
    /// Unit price at the time the item was added.
    #[serde(deserialize_with = "null_as_default")]
    pub price: Price,
}

/// An order. The order with status `InCart` is the user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    #[serde(deserialize_with = "null_as_default")]
    pub id: OrderId,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: UserId,
    #[serde(deserialize_with = "null_as_default")]
    pub status: OrderStatus,
    #[serde(deserialize_with = "null_as_default")]
    pub address: Address,
    #[serde(deserialize_with = "null_as_default")]
    pub products: Vec<OrderItem>,
    pub created_at: Option<String>,
    pub latest_update: Option<String>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub status: OrderStatus,
}

/// Body of `POST /orders/{id}/items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// The invoice issued when an order leaves the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    pub id: Option<InvoiceId>,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: UserId,
    #[serde(deserialize_with = "null_as_default")]
    pub total_price: Price,
    pub created_at: Option<String>,
}

// =============================================================================
// Errors
// =============================================================================

/// JSON error body returned with non-2xx statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub code: Option<u16>,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use online_store_core::Currency;

    use super::*;

    #[test]
    fn test_product_decodes_backend_json() {
        let json = r#"{
            "id": 5,
            "name": "Lamp",
            "description": "Bright",
            "price": {"units": 1050, "currency": 1},
            "quantity": 3,
            "category": 9,
            "available": true,
            "rating": 4.5,
            "ratingsCount": 2,
            "createdAt": "2024-03-01T10:00:00Z",
            "userId": 7
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(5));
        assert_eq!(product.price.currency, Currency::Bgn);
        assert_eq!(product.category.bits(), 9);
        assert_eq!(product.user_id, UserId::new(7));
        assert_eq!(product.ratings_count, 2);
    }

    #[test]
    fn test_listing_accepts_page_or_list() {
        let page: ProductListing =
            serde_json::from_str(r#"{"products":[{"id":1}],"count":12}"#).unwrap();
        let page = ProductPage::from(page);
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.count, Some(12));

        let list: ProductListing = serde_json::from_str(r#"[{"id":1},{"id":2}]"#).unwrap();
        let page = ProductPage::from(list);
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.count, None);
    }

    #[test]
    fn test_user_last_name_key() {
        let user: User =
            serde_json::from_str(r#"{"id":3,"firstName":"Ana","LastName":"Ivanova"}"#).unwrap();
        assert_eq!(user.first_name, "Ana");
        assert_eq!(user.last_name, "Ivanova");
    }

    #[test]
    fn test_order_decodes_status_and_items() {
        let json = r#"{
            "id": 42, "userId": 3, "status": 1,
            "products": [{"id": 8, "productId": 5, "quantity": 2, "price": {"units": 300, "currency": 1}}]
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert!(order.status.is_cart());
        assert_eq!(order.products.first().unwrap().product_id, ProductId::new(5));
    }

    #[test]
    fn test_orders_with_null_columns_decode() {
        let json = r#"[{
            "id": 4, "userId": 7, "products": null, "status": 1,
            "address": {"id": null, "city": null, "country": null, "address": null, "postalCode": null},
            "createdAt": "2024-03-01T10:00:00Z", "latestUpdate": null
        }]"#;
        let orders: Vec<Order> = serde_json::from_str(json).unwrap();
        let order = orders.first().unwrap();
        assert_eq!(order.id, OrderId::new(4));
        assert!(order.status.is_cart());
        assert!(order.products.is_empty());
        assert_eq!(order.address, Address::default());
        assert_eq!(order.latest_update, None);
    }

    #[test]
    fn test_product_with_null_columns_decodes() {
        let json = r#"{
            "id": 5, "name": "Lamp", "description": null,
            "price": {"units": 1050, "currency": 1},
            "quantity": null, "category": 1, "available": null,
            "comments": null, "rating": null, "ratingsCount": null,
            "createdAt": null, "userId": 7
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.name, "Lamp");
        assert_eq!(product.description, "");
        assert_eq!(product.quantity, 0);
        assert!(!product.available);
        assert!(product.rating.abs() < f64::EPSILON);
        assert_eq!(product.created_at, None);
    }

    #[test]
    fn test_comment_with_null_user_fields_decodes() {
        let json = r#"{
            "id": 4, "productId": 5, "comment": "Nice",
            "user": {"id": 2, "name": null, "firstName": "Boris", "LastName": null,
                     "pictureUrl": null, "email": null,
                     "address": {"id": null, "city": null, "country": null, "address": null, "postalCode": null},
                     "createdAt": null},
            "createdAt": "2024-03-02T08:00:00Z"
        }"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.user.first_name, "Boris");
        assert_eq!(comment.user.last_name, "");
        assert_eq!(comment.user.picture_url, "");
    }

    #[test]
    fn test_page_with_null_products_decodes() {
        let page: ProductListing =
            serde_json::from_str(r#"{"products":null,"count":0}"#).unwrap();
        assert!(ProductPage::from(page).products.is_empty());
    }

    #[test]
    fn test_public_profile_drops_email() {
        let user = User {
            id: UserId::new(3),
            first_name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            ..User::default()
        };
        let public = user.public();
        assert_eq!(public.first_name, "Ana");
        assert!(public.email.is_empty());
    }

    #[test]
    fn test_query_pairs() {
        let query = ProductQuery {
            name: Some("lamp".to_string()),
            page: 2,
            page_size: 40,
            category: Some(CategoryMask::from_bits(3)),
            user_id: None,
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("name", "lamp".to_string()),
                ("page", "2".to_string()),
                ("pageSize", "40".to_string()),
                ("category", "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_image_src() {
        let raw = Image {
            id: None,
            data: "AAAA".to_string(),
            format: Some("jpeg".to_string()),
        };
        assert_eq!(raw.src(), "data:image/jpeg;base64,AAAA");

        let url = Image {
            id: None,
            data: "data:image/png;base64,BBBB".to_string(),
            format: None,
        };
        assert_eq!(url.src(), "data:image/png;base64,BBBB");
    }

    #[test]
    fn test_new_item_wire_format() {
        let item = NewItem {
            product_id: ProductId::new(5),
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(item).unwrap(),
            serde_json::json!({"productId": 5, "quantity": 2})
        );
    }

    #[test]
    fn test_address_display_and_completeness() {
        let address = Address {
            city: "Sofia".to_string(),
            country: "Bulgaria".to_string(),
            address: "1 Vitosha Blvd".to_string(),
            postal_code: "1000".to_string(),
        };
        assert!(address.is_complete());
        assert_eq!(address.to_string(), "Sofia, Bulgaria, 1 Vitosha Blvd, 1000");
        assert!(!Address::default().is_complete());
    }
}
