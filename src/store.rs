//! Typed document-store facade over sled
//!
//! Collections are key-prefix namespaces inside a single sled keyspace so that
//! one [`sled::Batch`] can span collections atomically. Documents are encoded
//! as CBOR; partial updates do not exist at this layer, callers read a whole
//! document, modify it in memory and write it back.

use sled::IVec;
use std::sync::Arc;
use tracing::trace;

use crate::error::TaxonomyError;

/// Collection holding the category tree documents.
pub const CATEGORIES: &str = "categories";
/// Collection holding product records.
pub const PRODUCTS: &str = "products";

const SEP: u8 = b'/';

fn doc_key(collection: &str, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(collection.len() + 1 + id.len());
    key.extend_from_slice(collection.as_bytes());
    key.push(SEP);
    key.extend_from_slice(id.as_bytes());
    key
}

pub(crate) fn encode_doc<T: minicbor::Encode<()>>(doc: &T) -> Result<Vec<u8>, TaxonomyError> {
    minicbor::to_vec(doc).map_err(|e| TaxonomyError::Encode(e.to_string()))
}

#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<sled::Db>,
}

impl DocumentStore {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    pub fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, TaxonomyError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.db.get(doc_key(collection, id))? {
            Some(raw) => Ok(Some(minicbor::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Fetch a document together with its stored bytes, for a later
    /// compare-and-swap through [`DocumentStore::swap`].
    pub fn get_raw<T>(&self, collection: &str, id: &str) -> Result<Option<(T, IVec)>, TaxonomyError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.db.get(doc_key(collection, id))? {
            Some(raw) => {
                let doc = minicbor::decode(&raw)?;
                Ok(Some((doc, raw)))
            }
            None => Ok(None),
        }
    }

    /// Whole-document write, overwriting whatever is stored.
    pub fn put<T: minicbor::Encode<()>>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), TaxonomyError> {
        self.db.insert(doc_key(collection, id), encode_doc(doc)?)?;
        Ok(())
    }

    /// Whole-document write guarded by the bytes a prior [`get_raw`] returned.
    /// Fails with [`TaxonomyError::Conflict`] if the stored bytes changed in
    /// the meantime.
    ///
    /// [`get_raw`]: DocumentStore::get_raw
    pub fn swap<T: minicbor::Encode<()>>(
        &self,
        collection: &str,
        id: &str,
        expected: &IVec,
        doc: &T,
    ) -> Result<(), TaxonomyError> {
        let new = encode_doc(doc)?;
        self.db
            .compare_and_swap(doc_key(collection, id), Some(expected), Some(new))?
            .map_err(|_| TaxonomyError::Conflict(id.to_string()))
    }

    pub fn delete(&self, collection: &str, id: &str) -> Result<(), TaxonomyError> {
        self.db.remove(doc_key(collection, id))?;
        Ok(())
    }

    /// All documents of a collection, in key order.
    pub fn scan<T>(&self, collection: &str) -> Result<Vec<(String, T)>, TaxonomyError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        let mut prefix = collection.as_bytes().to_vec();
        prefix.push(SEP);

        let mut out = Vec::new();
        for entry in self.db.scan_prefix(&prefix) {
            let (key, raw) = entry?;
            let id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            out.push((id, minicbor::decode(&raw)?));
        }
        Ok(out)
    }

    /// Linear predicate scan, the query-by-field primitive. Cost is O(size of
    /// the collection), acceptable for the expected data volumes.
    pub fn query_by<T, F>(
        &self,
        collection: &str,
        predicate: F,
    ) -> Result<Vec<(String, T)>, TaxonomyError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
        F: Fn(&T) -> bool,
    {
        Ok(self
            .scan(collection)?
            .into_iter()
            .filter(|(_, doc)| predicate(doc))
            .collect())
    }

    pub fn batch(&self) -> WriteBatch<'_> {
        WriteBatch {
            store: self,
            inner: sled::Batch::default(),
            ops: 0,
        }
    }
}

/// A multi-document write set committed all-or-nothing. Operations are
/// prepared in memory; nothing reaches the store before [`commit`].
///
/// [`commit`]: WriteBatch::commit
pub struct WriteBatch<'a> {
    store: &'a DocumentStore,
    inner: sled::Batch,
    ops: usize,
}

impl WriteBatch<'_> {
    pub fn set<T: minicbor::Encode<()>>(
        &mut self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), TaxonomyError> {
        self.inner.insert(doc_key(collection, id), encode_doc(doc)?);
        self.ops += 1;
        Ok(())
    }

    pub fn delete(&mut self, collection: &str, id: &str) {
        self.inner.remove(doc_key(collection, id));
        self.ops += 1;
    }

    pub fn len(&self) -> usize {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops == 0
    }

    pub fn commit(self) -> Result<(), TaxonomyError> {
        trace!(ops = self.ops, "committing write batch");
        self.store.db.apply_batch(self.inner)?;
        Ok(())
    }
}
