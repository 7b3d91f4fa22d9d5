//! Storage configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::LmdbError;

/// Configuration of the two LMDB environments: the Tangle database and the
/// spent-addresses database.
///
/// Can be loaded from a TOML file via [`StorageConfig::from_toml_file`] or
/// built programmatically with [`StorageConfig::new`] (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the Tangle environment.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory of the spent-addresses environment.
    #[serde(default = "default_spent_addresses_path")]
    pub spent_addresses_path: PathBuf,

    /// Maximum size of each memory map, in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    #[serde(default = "default_max_readers")]
    pub max_readers: u32,

    /// Verify table and index counts when the Tangle environment opens.
    #[serde(default = "default_true")]
    pub run_integrity_check: bool,
}

// ── Defaults ───────────────────────────────────────────────────────────

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/tangle")
}

fn default_spent_addresses_path() -> PathBuf {
    PathBuf::from("./data/spent-addresses")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_max_readers() -> u32 {
    126
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl StorageConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            db_path: data_dir.join("tangle"),
            spent_addresses_path: data_dir.join("spent-addresses"),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LmdbError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LmdbError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, LmdbError> {
        let config: Self = toml::from_str(s).map_err(|e| LmdbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, LmdbError> {
        toml::to_string_pretty(self).map_err(|e| LmdbError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), LmdbError> {
        if self.map_size == 0 {
            return Err(LmdbError::Config("map_size must be positive".into()));
        }
        if self.max_readers == 0 {
            return Err(LmdbError::Config("max_readers must be positive".into()));
        }
        if self.db_path == self.spent_addresses_path {
            return Err(LmdbError::Config(
                "db_path and spent_addresses_path must differ".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            spent_addresses_path: default_spent_addresses_path(),
            map_size: default_map_size(),
            max_readers: default_max_readers(),
            run_integrity_check: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = StorageConfig::new("/var/lib/tangle");
        let toml_str = config.to_toml_string().unwrap();
        let parsed = StorageConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = StorageConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.map_size, 1 << 30);
        assert!(config.run_integrity_check);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            db_path = "/srv/tangle"
            run_integrity_check = false
        "#;
        let config = StorageConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.db_path, PathBuf::from("/srv/tangle"));
        assert!(!config.run_integrity_check);
        assert_eq!(config.max_readers, 126); // default
    }

    #[test]
    fn shared_path_is_rejected() {
        let toml = r#"
            db_path = "/srv/db"
            spent_addresses_path = "/srv/db"
        "#;
        assert!(matches!(
            StorageConfig::from_toml_str(toml),
            Err(LmdbError::Config(_))
        ));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = StorageConfig::from_toml_file("/nonexistent/tangle.toml");
        assert!(matches!(result, Err(LmdbError::Config(_))));
    }
}
