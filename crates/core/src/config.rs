//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Request
//! handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_COMPANION_MODEL, DEFAULT_COMPANION_TIMEOUT_SECS};
use crate::store::{DocumentStore, FileStore, MemoryStore};
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which document store backend to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    File,
}

impl std::str::FromStr for StorageKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "file" => Ok(StorageKind::File),
            other => Err(CoreError::InvalidInput(format!(
                "unknown storage kind '{}' (expected 'file' or 'memory')",
                other
            ))),
        }
    }
}

/// Settings for the LLM-backed chat companion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanionConfig {
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl CompanionConfig {
    pub fn new(base_url: String, model: String, timeout_secs: u64) -> CoreResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CoreError::InvalidInput(
                "companion URL must start with http:// or https://".into(),
            ));
        }
        if model.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "companion model cannot be empty".into(),
            ));
        }
        if timeout_secs == 0 {
            return Err(CoreError::InvalidInput(
                "companion timeout must be at least one second".into(),
            ));
        }

        Ok(Self {
            base_url,
            model: model.trim().to_string(),
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    storage: StorageKind,
    data_dir: PathBuf,
    companion: Option<CompanionConfig>,
}

impl CoreConfig {
    pub fn new(
        storage: StorageKind,
        data_dir: PathBuf,
        companion: Option<CompanionConfig>,
    ) -> CoreResult<Self> {
        if storage == StorageKind::File && data_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "data directory cannot be empty for file storage".into(),
            ));
        }

        Ok(Self {
            storage,
            data_dir,
            companion,
        })
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn companion(&self) -> Option<&CompanionConfig> {
        self.companion.as_ref()
    }

    /// Opens the configured document store, creating the data directory when needed.
    pub fn open_store(&self) -> CoreResult<Arc<dyn DocumentStore>> {
        match self.storage {
            StorageKind::Memory => Ok(Arc::new(MemoryStore::new())),
            StorageKind::File => Ok(Arc::new(FileStore::open(&self.data_dir)?)),
        }
    }
}

/// Parse the storage kind from an optional string value, defaulting to file storage.
pub fn storage_kind_from_env_value(value: Option<String>) -> CoreResult<StorageKind> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<StorageKind>())
        .transpose()
        .map(|kind| kind.unwrap_or(StorageKind::File))
}

/// Build the companion configuration from optional raw values.
///
/// Returns `Ok(None)` when no URL is supplied: the companion then answers with its fallback
/// replies only.
pub fn companion_config_from_env_values(
    url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<String>,
) -> CoreResult<Option<CompanionConfig>> {
    let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
        return Ok(None);
    };

    let model = model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COMPANION_MODEL.to_string());
    let timeout_secs = match timeout_secs.filter(|t| !t.trim().is_empty()) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            CoreError::InvalidInput(format!("invalid companion timeout '{}'", raw))
        })?,
        None => DEFAULT_COMPANION_TIMEOUT_SECS,
    };

    CompanionConfig::new(url, model, timeout_secs).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kind_defaults_to_file() {
        assert_eq!(storage_kind_from_env_value(None).unwrap(), StorageKind::File);
        assert_eq!(
            storage_kind_from_env_value(Some("  ".into())).unwrap(),
            StorageKind::File
        );
        assert_eq!(
            storage_kind_from_env_value(Some("Memory".into())).unwrap(),
            StorageKind::Memory
        );
        assert!(storage_kind_from_env_value(Some("mongo".into())).is_err());
    }

    #[test]
    fn companion_config_absent_without_url() {
        let cfg = companion_config_from_env_values(None, Some("x".into()), None).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn companion_config_applies_defaults() {
        let cfg = companion_config_from_env_values(
            Some("http://localhost:11434/".into()),
            None,
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(cfg.base_url(), "http://localhost:11434");
        assert_eq!(cfg.model(), DEFAULT_COMPANION_MODEL);
        assert_eq!(cfg.timeout_secs(), DEFAULT_COMPANION_TIMEOUT_SECS);
    }

    #[test]
    fn companion_config_rejects_bad_values() {
        assert!(CompanionConfig::new("localhost".into(), "m".into(), 5).is_err());
        assert!(CompanionConfig::new("http://x".into(), " ".into(), 5).is_err());
        assert!(CompanionConfig::new("http://x".into(), "m".into(), 0).is_err());
        assert!(companion_config_from_env_values(
            Some("http://x".into()),
            None,
            Some("soon".into())
        )
        .is_err());
    }

    #[test]
    fn file_storage_requires_data_dir() {
        assert!(CoreConfig::new(StorageKind::File, PathBuf::new(), None).is_err());
        assert!(CoreConfig::new(StorageKind::Memory, PathBuf::new(), None).is_ok());
    }
}
