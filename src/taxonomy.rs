//! Service layer API for taxonomy tree operations

use tracing::{debug, warn};

use crate::category::{
    Category, Depth, NodePath, PathEntry, SubCategory, SubSubCategory, flatten, locate,
    validate_name,
};
use crate::error::TaxonomyError;
use crate::product::Product;
use crate::store::{CATEGORIES, DocumentStore, PRODUCTS};
use crate::utils;

/// Owns the three-level category tree. Single-document mutations are
/// compare-and-swap protected; cascading deletes commit the tree rewrite and
/// the product repairs in one atomic batch built from a point-in-time product
/// query.
pub struct TaxonomyStore {
    store: DocumentStore,
    // in future we could add a config for per-role mutation constraints
}

impl TaxonomyStore {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    fn load_category(&self, category_id: &str) -> Result<(Category, sled::IVec), TaxonomyError> {
        self.store
            .get_raw(CATEGORIES, category_id)?
            .ok_or_else(|| TaxonomyError::NotFound(category_id.to_string()))
    }

    /// Create a node. Without a parent this is a fresh depth-0 category
    /// document; with one, the parent is located anywhere in the forest and
    /// the owning category document is rewritten with the child appended.
    /// Creating under a depth-2 node fails with [`TaxonomyError::DepthExceeded`].
    ///
    /// Names are not unique keys: creating the same name twice yields two
    /// distinct nodes.
    pub fn create(&self, name: &str, parent_id: Option<&str>) -> Result<String, TaxonomyError> {
        validate_name(name)?;

        let Some(parent_id) = parent_id else {
            let id = utils::new_node_id(utils::CATEGORY_HRP)?;
            let category = Category::new(id.clone(), name.to_string());
            self.store.put(CATEGORIES, &id, &category)?;
            debug!(category = %id, "created root category");
            return Ok(id);
        };

        let path = self
            .find(parent_id)?
            .ok_or_else(|| TaxonomyError::NotFound(parent_id.to_string()))?;
        let (mut category, raw) = self.load_category(&path.category_id)?;

        let id = match path.depth {
            Depth::Category => {
                let id = utils::new_node_id(utils::SUBCATEGORY_HRP)?;
                category.add_subcategory(SubCategory {
                    id: id.clone(),
                    name: name.to_string(),
                    sub_categories: vec![],
                })?;
                id
            }
            Depth::SubCategory => {
                let id = utils::new_node_id(utils::SUBSUBCATEGORY_HRP)?;
                category.add_subsubcategory(
                    &path.node_id,
                    SubSubCategory {
                        id: id.clone(),
                        name: name.to_string(),
                    },
                )?;
                id
            }
            Depth::SubSubCategory => return Err(TaxonomyError::DepthExceeded),
        };

        category.version += 1;
        self.store.swap(CATEGORIES, &category.id, &raw, &category)?;
        debug!(node = %id, parent = %parent_id, "created child node");
        Ok(id)
    }

    /// Rename a node at any depth. Product records keep whatever name they
    /// were stamped with; a renamed path leaves them dangling by design.
    pub fn rename(&self, node_id: &str, new_name: &str) -> Result<(), TaxonomyError> {
        validate_name(new_name)?;

        let path = self
            .find(node_id)?
            .ok_or_else(|| TaxonomyError::NotFound(node_id.to_string()))?;
        let (mut category, raw) = self.load_category(&path.category_id)?;

        if !category.rename_node(node_id, new_name) {
            // the forest changed between find and load
            return Err(TaxonomyError::NotFound(node_id.to_string()));
        }
        category.version += 1;
        self.store.swap(CATEGORIES, &category.id, &raw, &category)
    }

    /// The wholesale update primitive: replace a category document with the
    /// caller's in-memory copy. The copy must carry the version it was read
    /// at, otherwise the write is rejected with [`TaxonomyError::Conflict`].
    pub fn update_category(&self, mut category: Category) -> Result<Category, TaxonomyError> {
        category.ensure_valid_names()?;
        category.ensure_unique_ids()?;

        let (current, raw) = self.load_category(&category.id)?;
        if category.version != current.version {
            warn!(category = %category.id, "stale wholesale update rejected");
            return Err(TaxonomyError::Conflict(category.id));
        }

        category.version += 1;
        self.store.swap(CATEGORIES, &category.id, &raw, &category)?;
        Ok(category)
    }

    /// Delete a depth-0 category and null the full denormalized path on every
    /// product referencing it by name. The product sweep and the document
    /// deletion commit in one batch: either both apply or neither does.
    pub fn delete_category(&self, category_id: &str) -> Result<(), TaxonomyError> {
        let category: Category = self
            .store
            .get(CATEGORIES, category_id)?
            .ok_or_else(|| TaxonomyError::NotFound(category_id.to_string()))?;

        // point-in-time query; concurrent product writes can slip past it
        let orphans = self.store.query_by::<Product, _>(PRODUCTS, |p| {
            p.category.as_deref() == Some(category.name.as_str())
        })?;

        let mut batch = self.store.batch();
        let swept = orphans.len();
        for (id, mut product) in orphans {
            product.clear_path_from(Depth::Category);
            batch.set(PRODUCTS, &id, &product)?;
        }
        batch.delete(CATEGORIES, category_id);
        batch.commit()?;

        debug!(category = %category_id, products = swept, "deleted category with cascade");
        Ok(())
    }

    /// Delete a depth-1 or depth-2 node inside the given category and null the
    /// matching products' fields from that depth down, in one batch with the
    /// tree rewrite. Products are matched on the full name path so same-named
    /// nodes under other categories are untouched.
    ///
    /// A batch cannot carry a compare-and-swap, so the tree rewrite here is
    /// last-write-wins.
    pub fn delete_subcategory(
        &self,
        category_id: &str,
        node_id: &str,
    ) -> Result<(), TaxonomyError> {
        let (mut category, _raw) = self.load_category(category_id)?;
        let removed = category
            .remove_node(node_id)
            .ok_or_else(|| TaxonomyError::NotFound(node_id.to_string()))?;
        category.version += 1;

        let category_name = category.name.clone();
        let orphans = self.store.query_by::<Product, _>(PRODUCTS, |p| {
            if p.category.as_deref() != Some(category_name.as_str()) {
                return false;
            }
            match removed.depth {
                Depth::SubCategory => p.subcategory.as_deref() == Some(removed.name.as_str()),
                Depth::SubSubCategory => {
                    p.subcategory.as_deref() == removed.parent_name.as_deref()
                        && p.subsubcategory.as_deref() == Some(removed.name.as_str())
                }
                Depth::Category => false,
            }
        })?;

        let mut batch = self.store.batch();
        let swept = orphans.len();
        for (id, mut product) in orphans {
            product.clear_path_from(removed.depth);
            batch.set(PRODUCTS, &id, &product)?;
        }
        batch.set(CATEGORIES, category_id, &category)?;
        batch.commit()?;

        debug!(
            category = %category_id,
            node = %node_id,
            products = swept,
            "deleted subtree node with cascade"
        );
        Ok(())
    }

    pub fn get_category(&self, category_id: &str) -> Result<Category, TaxonomyError> {
        self.store
            .get(CATEGORIES, category_id)?
            .ok_or_else(|| TaxonomyError::NotFound(category_id.to_string()))
    }

    /// All root categories in creation order.
    pub fn list_categories(&self) -> Result<Vec<Category>, TaxonomyError> {
        let mut categories: Vec<Category> = self
            .store
            .scan(CATEGORIES)?
            .into_iter()
            .map(|(_, c)| c)
            .collect();
        categories.sort_by_key(|c| c.created_at.to_datetime_utc());
        Ok(categories)
    }

    /// Locate a node by id anywhere in the forest.
    pub fn find(&self, node_id: &str) -> Result<Option<NodePath>, TaxonomyError> {
        Ok(locate(&self.list_categories()?, node_id))
    }

    /// Convenience lookup by display name at depth 0. Names are not unique;
    /// the oldest match wins.
    pub fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, TaxonomyError> {
        Ok(self
            .list_categories()?
            .into_iter()
            .find(|c| c.name == name))
    }

    /// The flattened forest, one row per node with its full name path.
    pub fn flatten(&self) -> Result<Vec<PathEntry>, TaxonomyError> {
        Ok(flatten(&self.list_categories()?))
    }
}
