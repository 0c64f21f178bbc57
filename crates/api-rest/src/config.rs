//! REST server configuration resolved from the environment at startup.

use api_shared::TokenVerifier;
use mindcare_core::config::{
    companion_config_from_env_values, storage_kind_from_env_value, CoreConfig,
};
use mindcare_core::constants::DEFAULT_DATA_DIR;
use std::path::PathBuf;

pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";
pub const ENV_REST_ADDR: &str = "MINDCARE_REST_ADDR";
pub const ENV_TOKEN_SECRET: &str = "MINDCARE_TOKEN_SECRET";

/// Everything the REST server needs to start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub addr: String,
    pub core: CoreConfig,
    pub verifier: TokenVerifier,
}

impl AppConfig {
    /// Read `MINDCARE_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Fails if the token secret is missing or shorter than 32 bytes, or if a storage or
    /// companion variable is malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let addr = lookup(ENV_REST_ADDR)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REST_ADDR.into());

        let secret = lookup(ENV_TOKEN_SECRET)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("{} must be set", ENV_TOKEN_SECRET))?;
        let verifier = TokenVerifier::new(secret.into_bytes())?;

        let storage = storage_kind_from_env_value(lookup("MINDCARE_STORAGE"))?;
        let data_dir = lookup("MINDCARE_DATA_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let companion = companion_config_from_env_values(
            lookup("MINDCARE_COMPANION_URL"),
            lookup("MINDCARE_COMPANION_MODEL"),
            lookup("MINDCARE_COMPANION_TIMEOUT_SECS"),
        )?;

        Ok(Self {
            addr,
            core: CoreConfig::new(storage, data_dir, companion)?,
            verifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcare_core::config::StorageKind;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[(ENV_TOKEN_SECRET, SECRET)]).unwrap();
        assert_eq!(cfg.addr, DEFAULT_REST_ADDR);
        assert_eq!(cfg.core.storage(), StorageKind::File);
        assert_eq!(cfg.core.data_dir(), PathBuf::from(DEFAULT_DATA_DIR));
        assert!(cfg.core.companion().is_none());
    }

    #[test]
    fn secret_is_required_and_must_be_long_enough() {
        assert!(config(&[]).is_err());
        assert!(config(&[(ENV_TOKEN_SECRET, "short")]).is_err());
    }

    #[test]
    fn companion_and_storage_are_read() {
        let cfg = config(&[
            (ENV_TOKEN_SECRET, SECRET),
            ("MINDCARE_STORAGE", "memory"),
            ("MINDCARE_COMPANION_URL", "http://localhost:11434"),
            ("MINDCARE_COMPANION_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(cfg.core.storage(), StorageKind::Memory);
        assert_eq!(cfg.core.companion().unwrap().timeout_secs(), 5);
        assert!(config(&[(ENV_TOKEN_SECRET, SECRET), ("MINDCARE_STORAGE", "redis")]).is_err());
    }
}
