//! Core types for the Online Store.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod id;
pub mod price;
pub mod status;

pub use category::{CategoryCatalog, CategoryError, CategoryMask, DEFAULT_CATEGORIES, MAX_CATEGORIES};
pub use id::*;
pub use price::{Currency, Price, PriceError};
pub use status::OrderStatus;
