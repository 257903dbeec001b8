//! Configuration loading and management.
//!
//! [`IngestConfig`] can be built programmatically or loaded from TOML, YAML or JSON
//! files, and [`IngestConfig::discover`] searches the working directory and its
//! parents for a `spurhund.toml`.

use crate::{Result, SpurhundError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for by [`IngestConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "spurhund.toml";

/// Main ingestion configuration.
///
/// # Example
///
/// ```rust
/// use spurhund::core::config::IngestConfig;
///
/// let config = IngestConfig::default();
/// assert!(config.allow_list.is_empty());
/// assert_eq!(config.fetch_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Target prefixes remote fetches must match (empty = unrestricted)
    #[serde(default)]
    pub allow_list: Vec<String>,

    /// Timeout for a single remote fetch in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Largest accepted payload in bytes (None = unlimited)
    #[serde(default)]
    pub max_payload_bytes: Option<usize>,

    /// Maximum concurrent ingestions in batch operations (None = num_cpus * 2).
    #[serde(default)]
    pub max_concurrent_ingests: Option<usize>,

    /// Chain the `infer` detector after the built-in signature table
    #[serde(default = "default_true")]
    pub use_infer_detector: bool,

    /// Where managed payloads are kept
    #[serde(default)]
    pub store: StoreConfig,
}

/// Storage backend for managed payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Reference-counted in-memory buffers
    #[default]
    Memory,
    /// One spool file per handle, deleted on release
    Disk,
}

/// Managed payload storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Spool directory for the disk backend (None = `<temp dir>/spurhund`)
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            allow_list: Vec::new(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_payload_bytes: None,
            max_concurrent_ingests: None,
            use_infer_detector: true,
            store: StoreConfig::default(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SpurhundError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

impl IngestConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `SpurhundError::Validation` if the file doesn't exist or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config_file(path)?;
        toml::from_str(&content)
            .map_err(|e| SpurhundError::validation(format!("Invalid TOML in {}: {}", path.display(), e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config_file(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| SpurhundError::validation(format!("Invalid YAML in {}: {}", path.display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config_file(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SpurhundError::validation(format!("Invalid JSON in {}: {}", path.display(), e)))
    }

    /// Load configuration, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("toml") => Self::from_toml_file(path),
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(SpurhundError::validation(format!(
                "Unsupported config file format: {} (expected .toml, .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Discover `spurhund.toml` in the current directory or any parent.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(SpurhundError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(SpurhundError::validation("fetch_timeout_secs must be greater than zero"));
        }
        if self.max_concurrent_ingests == Some(0) {
            return Err(SpurhundError::validation("max_concurrent_ingests must be greater than zero"));
        }
        if self.allow_list.iter().any(|prefix| prefix.trim().is_empty()) {
            return Err(SpurhundError::validation("allow_list entries must not be empty"));
        }
        Ok(())
    }

    /// Effective batch concurrency.
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_ingests.unwrap_or_else(|| num_cpus::get() * 2)
    }
}
