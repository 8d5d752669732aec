//! Process configuration resolved from environment variables.
//!
//! # Responsibility
//! - Resolve store location, timeouts, logging and HTTP settings.
//! - Keep the fixed database and collection names in one place.
//!
//! # Invariants
//! - Unset or blank variables fall back to defaults.
//! - Malformed values are reported, never silently replaced.

use crate::dashboard::app::PatchPolicy;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DATABASE_NAME: &str = "AAC";
pub const COLLECTION_NAME: &str = "animals";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8050";

pub const ENV_DATA_DIR: &str = "SHELTER_DATA_DIR";
pub const ENV_STORE_TIMEOUT_MS: &str = "SHELTER_STORE_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "SHELTER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SHELTER_LOG_DIR";
pub const ENV_HTTP_ADDR: &str = "SHELTER_HTTP_ADDR";
pub const ENV_PATCH_POLICY: &str = "SHELTER_PATCH_POLICY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    InvalidPatchPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
            Self::InvalidPatchPolicy(value) => write!(
                f,
                "{ENV_PATCH_POLICY} must be `unconditional` or `confirmed`, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Location and limits of the backing document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub database: String,
    pub collection: String,
    /// Upper bound for a single store call waiting on a busy database.
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database: DATABASE_NAME.to_string(),
            collection: COLLECTION_NAME.to_string(),
            busy_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }

    /// One store file per database name.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite3", self.database))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelterConfig {
    pub store: StoreConfig,
    pub log_level: String,
    /// Rolling log directory; `None` logs to stderr.
    pub log_dir: Option<String>,
    pub http_addr: String,
    pub patch_policy: PatchPolicy,
}

impl ShelterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        let data_dir = value(ENV_DATA_DIR).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let mut store = StoreConfig::new(data_dir);
        if let Some(raw) = value(ENV_STORE_TIMEOUT_MS) {
            let millis = raw
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or(ConfigError::InvalidNumber {
                    key: ENV_STORE_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
            store.busy_timeout = Duration::from_millis(millis);
        }

        let patch_policy = match value(ENV_PATCH_POLICY) {
            Some(raw) => raw
                .parse::<PatchPolicy>()
                .map_err(|_| ConfigError::InvalidPatchPolicy(raw.clone()))?,
            None => PatchPolicy::default(),
        };

        Ok(Self {
            store,
            log_level: value(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: value(ENV_LOG_DIR),
            http_addr: value(ENV_HTTP_ADDR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            patch_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ShelterConfig, DEFAULT_HTTP_ADDR};
    use crate::dashboard::app::PatchPolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let config = ShelterConfig::from_lookup(lookup(&[("SHELTER_HTTP_ADDR", "   ")])).unwrap();
        assert_eq!(config.http_addr, DEFAULT_HTTP_ADDR);
        assert_eq!(config.store.database_path(), PathBuf::from("data/AAC.sqlite3"));
        assert_eq!(config.store.collection, "animals");
        assert_eq!(config.store.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.patch_policy, PatchPolicy::Unconditional);
    }

    #[test]
    fn overrides_are_trimmed() {
        let config = ShelterConfig::from_lookup(lookup(&[
            ("SHELTER_DATA_DIR", " /var/lib/shelter "),
            ("SHELTER_STORE_TIMEOUT_MS", "250"),
            ("SHELTER_LOG_DIR", "/var/log/shelter"),
            ("SHELTER_PATCH_POLICY", "confirmed"),
        ]))
        .unwrap();
        assert_eq!(
            config.store.database_path(),
            PathBuf::from("/var/lib/shelter/AAC.sqlite3")
        );
        assert_eq!(config.store.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/shelter"));
        assert_eq!(config.patch_policy, PatchPolicy::ConfirmedOnly);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = ShelterConfig::from_lookup(lookup(&[("SHELTER_STORE_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = ShelterConfig::from_lookup(lookup(&[("SHELTER_PATCH_POLICY", "sometimes")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPatchPolicy("sometimes".to_string()));
    }
}
