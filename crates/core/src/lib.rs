//! Online Store Core - Shared types library.
//!
//! This crate provides the types shared by the storefront and its tests:
//! type-safe IDs, minor-unit prices, order statuses and the product
//! category bitmask encoding.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, statuses and categories

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
