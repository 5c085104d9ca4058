//! Category tree data model and tree algorithms
//!
//! The taxonomy is a forest of [`Category`] documents. Depth-1 and depth-2
//! nodes have no storage location of their own, they live embedded in the
//! owning category document and every mutation of them is a whole-document
//! rewrite. Depth is hard-capped at three levels: the leaf type simply has no
//! children field.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::TaxonomyError;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Depth-2 leaf node.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct SubSubCategory {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
}

/// Depth-1 node, exclusively owned by its containing [`Category`].
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct SubCategory {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub sub_categories: Vec<SubSubCategory>,
}

/// Depth-0 root node, the unit of storage. Insertion order of the embedded
/// sequences is significant for display.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Category {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub sub_categories: Vec<SubCategory>,
    #[n(3)]
    pub created_at: TimeStamp<Utc>,
    /// Optimistic-concurrency counter, bumped on every write.
    #[n(4)]
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Category,
    SubCategory,
    SubSubCategory,
}

/// Where a node sits in the forest, as returned by [`locate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodePath {
    /// Id of the owning (depth-0) category document.
    pub category_id: String,
    /// Id of the depth-1 owner when the node itself is depth-2.
    pub parent_id: Option<String>,
    pub node_id: String,
    pub name: String,
    pub depth: Depth,
}

/// One renderable row of the flattened tree: the full name path down to the
/// node, for filter population and display.
#[derive(Debug, Clone, PartialEq)]
pub struct PathEntry {
    pub node_id: String,
    pub depth: Depth,
    pub category: String,
    pub subcategory: Option<String>,
    pub subsubcategory: Option<String>,
}

/// What [`Category::remove_node`] took out of the tree, carrying the name
/// context the product cascade sweep matches against.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub depth: Depth,
    pub name: String,
    /// Depth-1 owner name when a depth-2 node was removed.
    pub parent_name: Option<String>,
}

/// Rejects empty or whitespace-only display names before any I/O happens.
pub fn validate_name(name: &str) -> Result<(), TaxonomyError> {
    if name.trim().is_empty() {
        return Err(TaxonomyError::Validation(
            "name must not be empty or whitespace-only".into(),
        ));
    }
    Ok(())
}

impl Category {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            sub_categories: vec![],
            created_at: TimeStamp::new(),
            version: 0,
        }
    }

    /// Append a depth-1 child, preserving insertion order. Sibling ids must
    /// stay unique.
    pub fn add_subcategory(&mut self, sub: SubCategory) -> Result<(), TaxonomyError> {
        if self.sub_categories.iter().any(|s| s.id == sub.id) {
            return Err(TaxonomyError::Validation(format!(
                "duplicate subcategory id '{}'",
                sub.id
            )));
        }
        self.sub_categories.push(sub);
        Ok(())
    }

    /// Append a depth-2 child under the given depth-1 node.
    pub fn add_subsubcategory(
        &mut self,
        parent_sub_id: &str,
        node: SubSubCategory,
    ) -> Result<(), TaxonomyError> {
        let parent = self
            .sub_categories
            .iter_mut()
            .find(|s| s.id == parent_sub_id)
            .ok_or_else(|| TaxonomyError::NotFound(parent_sub_id.to_string()))?;

        if parent.sub_categories.iter().any(|s| s.id == node.id) {
            return Err(TaxonomyError::Validation(format!(
                "duplicate sub-subcategory id '{}'",
                node.id
            )));
        }
        parent.sub_categories.push(node);
        Ok(())
    }

    /// Filter a depth-1 or depth-2 node out of the embedded sequences.
    /// Removing a depth-1 node drops its whole subtree with it.
    pub fn remove_node(&mut self, node_id: &str) -> Option<RemovedNode> {
        if let Some(pos) = self.sub_categories.iter().position(|s| s.id == node_id) {
            let removed = self.sub_categories.remove(pos);
            return Some(RemovedNode {
                depth: Depth::SubCategory,
                name: removed.name,
                parent_name: None,
            });
        }

        for sub in &mut self.sub_categories {
            if let Some(pos) = sub.sub_categories.iter().position(|s| s.id == node_id) {
                let removed = sub.sub_categories.remove(pos);
                return Some(RemovedNode {
                    depth: Depth::SubSubCategory,
                    name: removed.name,
                    parent_name: Some(sub.name.clone()),
                });
            }
        }
        None
    }

    /// Rename whichever node carries `node_id`, at any depth. Returns false
    /// when the id is not part of this category's tree. Renames never
    /// propagate to product records.
    pub fn rename_node(&mut self, node_id: &str, new_name: &str) -> bool {
        if self.id == node_id {
            self.name = new_name.to_string();
            return true;
        }
        for sub in &mut self.sub_categories {
            if sub.id == node_id {
                sub.name = new_name.to_string();
                return true;
            }
            for leaf in &mut sub.sub_categories {
                if leaf.id == node_id {
                    leaf.name = new_name.to_string();
                    return true;
                }
            }
        }
        false
    }

    /// Every display name in the document must pass [`validate_name`]. Guards
    /// wholesale document replacement, where the caller supplies the whole
    /// tree and the per-node create/rename checks never ran.
    pub fn ensure_valid_names(&self) -> Result<(), TaxonomyError> {
        validate_name(&self.name)?;
        for sub in &self.sub_categories {
            validate_name(&sub.name)?;
            for leaf in &sub.sub_categories {
                validate_name(&leaf.name)?;
            }
        }
        Ok(())
    }

    /// Sibling-id uniqueness at both embedded levels. Guards wholesale
    /// document replacement, where the caller supplies the whole tree.
    pub fn ensure_unique_ids(&self) -> Result<(), TaxonomyError> {
        let mut seen = std::collections::HashSet::new();
        for sub in &self.sub_categories {
            if !seen.insert(sub.id.as_str()) {
                return Err(TaxonomyError::Validation(format!(
                    "duplicate subcategory id '{}'",
                    sub.id
                )));
            }
            let mut leaf_seen = std::collections::HashSet::new();
            for leaf in &sub.sub_categories {
                if !leaf_seen.insert(leaf.id.as_str()) {
                    return Err(TaxonomyError::Validation(format!(
                        "duplicate sub-subcategory id '{}'",
                        leaf.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .sub_categories
            .iter()
            .map(|s| 1 + s.sub_categories.len())
            .sum::<usize>()
    }
}

/// Linear scan over the whole forest, stopping at the first id match.
/// O(total node count) per call; no index is maintained, a deliberate
/// simplicity trade-off at taxonomy sizes of tens to low hundreds of nodes.
pub fn locate(categories: &[Category], node_id: &str) -> Option<NodePath> {
    for category in categories {
        if category.id == node_id {
            return Some(NodePath {
                category_id: category.id.clone(),
                parent_id: None,
                node_id: category.id.clone(),
                name: category.name.clone(),
                depth: Depth::Category,
            });
        }
        for sub in &category.sub_categories {
            if sub.id == node_id {
                return Some(NodePath {
                    category_id: category.id.clone(),
                    parent_id: None,
                    node_id: sub.id.clone(),
                    name: sub.name.clone(),
                    depth: Depth::SubCategory,
                });
            }
            for leaf in &sub.sub_categories {
                if leaf.id == node_id {
                    return Some(NodePath {
                        category_id: category.id.clone(),
                        parent_id: Some(sub.id.clone()),
                        node_id: leaf.id.clone(),
                        name: leaf.name.clone(),
                        depth: Depth::SubSubCategory,
                    });
                }
            }
        }
    }
    None
}

/// One row per node, depth-first in insertion order. The render path consumes
/// this instead of walking the nested documents on every screen.
pub fn flatten(categories: &[Category]) -> Vec<PathEntry> {
    let mut rows = Vec::new();
    for category in categories {
        rows.push(PathEntry {
            node_id: category.id.clone(),
            depth: Depth::Category,
            category: category.name.clone(),
            subcategory: None,
            subsubcategory: None,
        });
        for sub in &category.sub_categories {
            rows.push(PathEntry {
                node_id: sub.id.clone(),
                depth: Depth::SubCategory,
                category: category.name.clone(),
                subcategory: Some(sub.name.clone()),
                subsubcategory: None,
            });
            for leaf in &sub.sub_categories {
                rows.push(PathEntry {
                    node_id: leaf.id.clone(),
                    depth: Depth::SubSubCategory,
                    category: category.name.clone(),
                    subcategory: Some(sub.name.clone()),
                    subsubcategory: Some(leaf.name.clone()),
                });
            }
        }
    }
    rows
}
