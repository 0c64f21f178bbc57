//! Document persistence.
//!
//! The core only needs a very small persistence contract: create, fetch by id, list a
//! collection, replace and remove JSON documents. [`DocumentStore`] is that contract and is
//! object-safe so services can share an `Arc<dyn DocumentStore>`. [`Collection`] layers typed
//! access and predicate filtering on top of it.
//!
//! Backends:
//! - [`MemoryStore`]: process-local maps, used by tests and `MINDCARE_STORAGE=memory`.
//! - [`FileStore`]: one JSON file per document in a sharded directory tree.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::{CoreError, CoreResult};
use mindcare_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Untyped document persistence keyed by collection name and record id.
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document. Fails with [`CoreError::Conflict`] if the id already exists.
    fn insert(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<()>;

    /// Inserts several documents, stopping at the first failure.
    fn insert_many(&self, collection: &str, docs: Vec<(RecordId, Value)>) -> CoreResult<()> {
        for (id, doc) in docs {
            self.insert(collection, id, doc)?;
        }
        Ok(())
    }

    fn get(&self, collection: &str, id: RecordId) -> CoreResult<Option<Value>>;

    /// Returns every document of a collection. Order is unspecified.
    fn list(&self, collection: &str) -> CoreResult<Vec<Value>>;

    /// Replaces an existing document. Returns `false` when the id does not exist.
    fn replace(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<bool>;

    /// Removes a document. Returns `false` when the id does not exist.
    fn remove(&self, collection: &str, id: RecordId) -> CoreResult<bool>;
}

/// A record type stored in its own collection.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn id(&self) -> RecordId;
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn insert(&self, doc: &T) -> CoreResult<()> {
        self.store.insert(T::COLLECTION, doc.id(), to_value(doc)?)
    }

    pub fn insert_many(&self, docs: &[T]) -> CoreResult<()> {
        let values = docs
            .iter()
            .map(|doc| Ok((doc.id(), to_value(doc)?)))
            .collect::<CoreResult<Vec<_>>>()?;
        self.store.insert_many(T::COLLECTION, values)
    }

    pub fn get(&self, id: RecordId) -> CoreResult<Option<T>> {
        self.store
            .get(T::COLLECTION, id)?
            .map(from_value)
            .transpose()
    }

    pub fn all(&self) -> CoreResult<Vec<T>> {
        self.store
            .list(T::COLLECTION)?
            .into_iter()
            .map(from_value)
            .collect()
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> CoreResult<Vec<T>> {
        Ok(self.all()?.into_iter().filter(|doc| predicate(doc)).collect())
    }

    pub fn find_one(&self, predicate: impl Fn(&T) -> bool) -> CoreResult<Option<T>> {
        Ok(self.all()?.into_iter().find(|doc| predicate(doc)))
    }

    pub fn update(&self, doc: &T) -> CoreResult<bool> {
        self.store.replace(T::COLLECTION, doc.id(), to_value(doc)?)
    }

    pub fn delete(&self, id: RecordId) -> CoreResult<bool> {
        self.store.remove(T::COLLECTION, id)
    }

    /// Removes every document matching `predicate`, returning how many were removed.
    pub fn delete_where(&self, predicate: impl Fn(&T) -> bool) -> CoreResult<usize> {
        let mut removed = 0;
        for doc in self.find(predicate)? {
            if self.store.remove(T::COLLECTION, doc.id())? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn to_value<T: Serialize>(doc: &T) -> CoreResult<Value> {
    serde_json::to_value(doc).map_err(CoreError::Serialization)
}

fn from_value<T: DeserializeOwned>(value: Value) -> CoreResult<T> {
    serde_json::from_value(value).map_err(CoreError::Deserialization)
}
