//! File-backed document store.
//!
//! Layout: `<root>/<collection>/<s1>/<s2>/<id>/document.json`, where `s1`/`s2` are the first
//! two pairs of hex characters of the record id (see [`RecordId::sharded_dir`]).
//!
//! Each write goes to `document.json.tmp` first and is then renamed over the live file, so a
//! reader never observes a half-written document. Writes are serialised through a single mutex
//! so the existence check in `insert` cannot race another insert of the same id.

use super::DocumentStore;
use crate::constants::DOCUMENT_FILENAME;
use crate::{CoreError, CoreResult};
use mindcare_uuid::RecordId;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if necessary) a store rooted at `root`.
    pub fn open(root: &Path) -> CoreResult<Self> {
        fs::create_dir_all(root).map_err(CoreError::StorageDirCreation)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> CoreResult<PathBuf> {
        let safe = !collection.is_empty()
            && collection
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_'));
        if !safe {
            return Err(CoreError::InvalidInput(format!(
                "invalid collection name '{}'",
                collection
            )));
        }
        Ok(self.root.join(collection))
    }

    fn document_path(&self, collection: &str, id: RecordId) -> CoreResult<PathBuf> {
        Ok(id
            .sharded_dir(&self.collection_dir(collection)?)
            .join(DOCUMENT_FILENAME))
    }

    fn write_document(path: &Path, doc: &Value) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;
        }
        let contents = serde_json::to_vec_pretty(doc).map_err(CoreError::Serialization)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(CoreError::FileWrite)?;
        fs::rename(&tmp, path).map_err(CoreError::FileWrite)
    }

    fn read_document(path: &Path) -> CoreResult<Option<Value>> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(CoreError::Deserialization),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::FileRead(e)),
        }
    }
}

impl DocumentStore for FileStore {
    fn insert(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<()> {
        let path = self.document_path(collection, id)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        if path.exists() {
            return Err(CoreError::Conflict(format!(
                "document {} already exists in {}",
                id, collection
            )));
        }
        Self::write_document(&path, &doc)
    }

    fn get(&self, collection: &str, id: RecordId) -> CoreResult<Option<Value>> {
        Self::read_document(&self.document_path(collection, id)?)
    }

    fn list(&self, collection: &str) -> CoreResult<Vec<Value>> {
        let collection_dir = self.collection_dir(collection)?;
        let mut docs = Vec::new();

        let s1_iter = match fs::read_dir(&collection_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(docs),
            Err(e) => return Err(CoreError::FileRead(e)),
        };

        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };

                for id_ent in id_iter.flatten() {
                    let doc_path = id_ent.path().join(DOCUMENT_FILENAME);
                    if !doc_path.is_file() {
                        continue;
                    }

                    match Self::read_document(&doc_path) {
                        Ok(Some(doc)) => docs.push(doc),
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!("skipping unreadable document {}: {}", doc_path.display(), e);
                        }
                    }
                }
            }
        }

        Ok(docs)
    }

    fn replace(&self, collection: &str, id: RecordId, doc: Value) -> CoreResult<bool> {
        let path = self.document_path(collection, id)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        if !path.is_file() {
            return Ok(false);
        }
        Self::write_document(&path, &doc)?;
        Ok(true)
    }

    fn remove(&self, collection: &str, id: RecordId) -> CoreResult<bool> {
        let path = self.document_path(collection, id)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        let Some(dir) = path.parent() else {
            return Ok(false);
        };
        match fs::remove_dir_all(dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CoreError::FileRemove(e)),
        }
    }
}
