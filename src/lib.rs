//! Storefront category taxonomy and product catalog over an embedded
//! document store.
//!
//! The taxonomy is a forest of three-level category trees stored as nested
//! documents; products reference it through denormalized name strings.
//! [`taxonomy::TaxonomyStore`] owns the tree and the cascading-delete
//! semantics, [`catalog::ProductCatalog`] owns the product records, and both
//! sit on the injected [`store::DocumentStore`] adapter.

pub mod catalog;
pub mod category;
pub mod error;
pub mod product;
pub mod store;
pub mod taxonomy;
pub mod utils;
