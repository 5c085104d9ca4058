//! Service layer API for product records

use tracing::debug;

use crate::error::TaxonomyError;
use crate::product::{Product, ProductDraft, validate_path_fill};
use crate::store::{DocumentStore, PRODUCTS};

/// Owns product records. Coupled to the taxonomy only through the denormalized
/// name fields on each product; cascade repairs are issued by
/// [`TaxonomyStore`](crate::taxonomy::TaxonomyStore) against the same store.
pub struct ProductCatalog {
    store: DocumentStore,
}

impl ProductCatalog {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn create(&self, draft: ProductDraft) -> Result<Product, TaxonomyError> {
        let product = draft.build()?;
        self.store.put(PRODUCTS, &product.id, &product)?;
        debug!(product = %product.id, "created product");
        Ok(product)
    }

    pub fn get_by_id(&self, product_id: &str) -> Result<Option<Product>, TaxonomyError> {
        self.store.get(PRODUCTS, product_id)
    }

    /// Every product in creation order, dangling references included. This is
    /// the "All Products" view.
    pub fn get_all(&self) -> Result<Vec<Product>, TaxonomyError> {
        let mut products: Vec<Product> = self
            .store
            .scan(PRODUCTS)?
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        products.sort_by_key(|p| p.created_at.to_datetime_utc());
        Ok(products)
    }

    /// Whole-record write-back of a previously fetched product.
    pub fn update(&self, product: &Product) -> Result<(), TaxonomyError> {
        if self.store.get::<Product>(PRODUCTS, &product.id)?.is_none() {
            return Err(TaxonomyError::NotFound(product.id.clone()));
        }
        self.store.put(PRODUCTS, &product.id, product)
    }

    pub fn delete(&self, product_id: &str) -> Result<(), TaxonomyError> {
        if self.store.get::<Product>(PRODUCTS, product_id)?.is_none() {
            return Err(TaxonomyError::NotFound(product_id.to_string()));
        }
        self.store.delete(PRODUCTS, product_id)
    }

    /// Set the denormalized path names on a product, independently of the
    /// tree. Nothing checks the names against live taxonomy nodes; a dangling
    /// path degrades to the uncategorized view instead of erroring. The path
    /// must still fill top-down, as when the product was drafted.
    pub fn assign_path(
        &self,
        product_id: &str,
        category: Option<&str>,
        subcategory: Option<&str>,
        subsubcategory: Option<&str>,
    ) -> Result<Product, TaxonomyError> {
        validate_path_fill(category, subcategory, subsubcategory)?;

        let mut product: Product = self
            .store
            .get(PRODUCTS, product_id)?
            .ok_or_else(|| TaxonomyError::NotFound(product_id.to_string()))?;

        product.category = category.map(str::to_string);
        product.subcategory = subcategory.map(str::to_string);
        product.subsubcategory = subsubcategory.map(str::to_string);

        self.store.put(PRODUCTS, product_id, &product)?;
        Ok(product)
    }

    /// Products matching the given name path by exact string equality, in
    /// creation order. Levels left as `None` are unconstrained.
    pub fn filter_by_category_path(
        &self,
        category: &str,
        subcategory: Option<&str>,
        subsubcategory: Option<&str>,
    ) -> Result<Vec<Product>, TaxonomyError> {
        let mut products: Vec<Product> = self
            .store
            .query_by(PRODUCTS, |p: &Product| {
                p.matches_path(category, subcategory, subsubcategory)
            })?
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        products.sort_by_key(|p| p.created_at.to_datetime_utc());
        Ok(products)
    }
}
