//! Product records and the draft builder
//!
//! Products reference the taxonomy through denormalized *name* strings, not
//! ids. A taxonomy rename does not propagate here, and a dangling name is not
//! an error: such products simply match no category filter.

use chrono::Utc;

use crate::category::{Depth, TimeStamp};
use crate::error::TaxonomyError;
use crate::utils;

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Product {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    /// Minor currency units; integers for currency.
    #[n(3)]
    pub price: u64,
    #[n(4)]
    pub stock: u32,
    #[n(5)]
    pub category: Option<String>,
    #[n(6)]
    pub subcategory: Option<String>,
    #[n(7)]
    pub subsubcategory: Option<String>,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
}

impl Product {
    /// True when no taxonomy name is attached at any level. Shown under
    /// "All Products" only.
    pub fn is_uncategorized(&self) -> bool {
        self.category.is_none() && self.subcategory.is_none() && self.subsubcategory.is_none()
    }

    /// Null the denormalized path from `depth` downwards. The cascade rule is
    /// uniform: deleting an ancestor clears every descendant-level field too.
    pub fn clear_path_from(&mut self, depth: Depth) {
        match depth {
            Depth::Category => {
                self.category = None;
                self.subcategory = None;
                self.subsubcategory = None;
            }
            Depth::SubCategory => {
                self.subcategory = None;
                self.subsubcategory = None;
            }
            Depth::SubSubCategory => {
                self.subsubcategory = None;
            }
        }
    }

    /// Exact string equality per provided level. Levels the caller leaves out
    /// are not constrained.
    pub fn matches_path(
        &self,
        category: &str,
        subcategory: Option<&str>,
        subsubcategory: Option<&str>,
    ) -> bool {
        if self.category.as_deref() != Some(category) {
            return false;
        }
        if let Some(sub) = subcategory {
            if self.subcategory.as_deref() != Some(sub) {
                return false;
            }
        }
        if let Some(leaf) = subsubcategory {
            if self.subsubcategory.as_deref() != Some(leaf) {
                return false;
            }
        }
        true
    }
}

/// The denormalized path fields are independently nullable but must fill
/// top-down: a subcategory name without a category, or a sub-subcategory
/// without a subcategory, matches no filter and can never be repaired by a
/// cascade sweep.
pub fn validate_path_fill(
    category: Option<&str>,
    subcategory: Option<&str>,
    subsubcategory: Option<&str>,
) -> Result<(), TaxonomyError> {
    if subcategory.is_some() && category.is_none() {
        return Err(TaxonomyError::Validation(
            "subcategory given without a category".into(),
        ));
    }
    if subsubcategory.is_some() && subcategory.is_none() {
        return Err(TaxonomyError::Validation(
            "sub-subcategory given without a subcategory".into(),
        ));
    }
    Ok(())
}

/// Consuming builder for a new product record. `build` validates, stamps a
/// fresh id and the creation time.
#[derive(Debug, Default)]
pub struct ProductDraft {
    name: Option<String>,
    description: Option<String>,
    price: u64,
    stock: u32,
    category: Option<String>,
    subcategory: Option<String>,
    subsubcategory: Option<String>,
}

impl ProductDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
    pub fn set_price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }
    pub fn set_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }
    /// Attach the denormalized category path by name. Levels are independently
    /// optional but must fill top-down.
    pub fn set_category_path(
        mut self,
        category: &str,
        subcategory: Option<&str>,
        subsubcategory: Option<&str>,
    ) -> Self {
        self.category = Some(category.to_string());
        self.subcategory = subcategory.map(str::to_string);
        self.subsubcategory = subsubcategory.map(str::to_string);
        self
    }

    pub fn build(self) -> Result<Product, TaxonomyError> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(TaxonomyError::Validation(
                    "product name must not be empty or whitespace-only".into(),
                ));
            }
        };
        validate_path_fill(
            self.category.as_deref(),
            self.subcategory.as_deref(),
            self.subsubcategory.as_deref(),
        )?;

        Ok(Product {
            id: utils::new_node_id(utils::PRODUCT_HRP)?,
            name,
            description: self.description.unwrap_or_default(),
            price: self.price,
            stock: self.stock,
            category: self.category,
            subcategory: self.subcategory,
            subsubcategory: self.subsubcategory,
            created_at: TimeStamp::new(),
        })
    }
}
