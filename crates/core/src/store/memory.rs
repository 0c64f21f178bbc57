use super::DocumentStore;
use crate::{CoreError, CoreResult};
use mindcare_uuid::RecordId;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

type Collections = HashMap<String, BTreeMap<RecordId, Value>>;

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(CoreError::Conflict(format!(
                "document {} already exists in {}",
                id, collection
            )));
        }
        docs.insert(id, doc);
        Ok(())
    }

    fn insert_many(&self, collection: &str, docs: Vec<(RecordId, Value)>) -> CoreResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        let existing = collections.entry(collection.to_string()).or_default();
        if let Some((id, _)) = docs.iter().find(|(id, _)| existing.contains_key(id)) {
            return Err(CoreError::Conflict(format!(
                "document {} already exists in {}",
                id, collection
            )));
        }
        existing.extend(docs);
        Ok(())
    }

    fn get(&self, collection: &str, id: RecordId) -> CoreResult<Option<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    fn list(&self, collection: &str) -> CoreResult<Vec<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn replace(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<bool> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        match collections.get_mut(collection).and_then(|docs| docs.get_mut(&id)) {
            Some(slot) => {
                *slot = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, collection: &str, id: RecordId) -> CoreResult<bool> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        Ok(collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_rejects_duplicate_ids() {
        let store = MemoryStore::new();
        let id = RecordId::new();
        store.insert("things", id, json!({"n": 1})).unwrap();

        let err = store.insert("things", id, json!({"n": 2})).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(store.get("things", id).unwrap(), Some(json!({"n": 1})));
    }

    #[test]
    fn insert_many_is_all_or_nothing_on_conflict() {
        let store = MemoryStore::new();
        let taken = RecordId::new();
        store.insert("things", taken, json!(1)).unwrap();

        let result = store.insert_many(
            "things",
            vec![(RecordId::new(), json!(2)), (taken, json!(3))],
        );
        assert!(result.is_err());
        assert_eq!(store.list("things").unwrap().len(), 1);
    }

    #[test]
    fn collections_are_isolated() {
        let store = MemoryStore::new();
        let id = RecordId::new();
        store.insert("a", id, json!("x")).unwrap();

        assert_eq!(store.get("b", id).unwrap(), None);
        assert!(store.list("b").unwrap().is_empty());
        assert!(!store.remove("b", id).unwrap());
        assert!(store.remove("a", id).unwrap());
    }
}
