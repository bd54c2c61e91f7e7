//! Implementation of the `init` command and the repository configuration.
//!
//! A featuregate repository is a directory containing `.featuregate/`, which
//! holds `config.yaml` and the `features.jsonl` data file.

use crate::error::{ConfigError, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Default feature ID prefix if none specified
pub const DEFAULT_PREFIX: &str = "flag";

/// Name of the featuregate directory
pub const FEATUREGATE_DIR_NAME: &str = ".featuregate";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the features data file
pub const FEATURES_FILE_NAME: &str = "features.jsonl";

/// Default tracing filter when the config doesn't set one
pub const DEFAULT_LOG_FILTER: &str = "featuregate=info";

/// Minimum prefix length
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Maximum prefix length
pub const MAX_PREFIX_LENGTH: usize = 20;

/// Maximum directory depth to traverse when searching for the repository root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

const BACKEND_MEMORY: &str = "memory";
const BACKEND_JSONL: &str = "jsonl";

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Contents of `.featuregate/config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FeaturegateConfig {
    /// Feature ID prefix (e.g., "flag" for "flag-a3f8")
    pub id_prefix: String,

    /// Storage configuration
    pub storage: StorageConfig,

    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Per-operation deadline for engine calls, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_timeout_ms: Option<u64>,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Backend name: "jsonl" (persisted) or "memory" (discarded on exit)
    pub backend: String,

    /// Path to the data file, relative to the repository root
    pub data_file: String,
}

impl StorageConfig {
    /// Resolve this section into a [`StorageBackend`] rooted at `root_dir`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownBackend` for any name other than "memory" or "jsonl"
    pub fn to_backend(&self, root_dir: &Path) -> Result<StorageBackend> {
        match self.backend.trim().to_ascii_lowercase().as_str() {
            BACKEND_MEMORY => Ok(StorageBackend::InMemory),
            BACKEND_JSONL => Ok(StorageBackend::Jsonl(root_dir.join(&self.data_file))),
            _ => Err(ConfigError::UnknownBackend(self.backend.clone()).into()),
        }
    }
}

impl FeaturegateConfig {
    /// Create a new configuration with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            id_prefix: prefix.to_string(),
            storage: StorageConfig {
                backend: BACKEND_JSONL.to_string(),
                data_file: format!("{FEATUREGATE_DIR_NAME}/{FEATURES_FILE_NAME}"),
            },
            log_filter: default_log_filter(),
            operation_timeout_ms: None,
        }
    }

    /// The configured engine deadline, if any
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate_prefix(&config.id_prefix)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for FeaturegateConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created `.featuregate` directory
    pub featuregate_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created data file
    pub features_file: PathBuf,
    /// The prefix used for feature IDs
    pub prefix: String,
}

/// Validate a feature ID prefix.
///
/// Requirements: 2-20 characters, ASCII letters and digits only.
///
/// Expects pre-trimmed input.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() < MIN_PREFIX_LENGTH {
        return Err(ConfigError::InvalidPrefix(format!(
            "must be at least {MIN_PREFIX_LENGTH} characters"
        ))
        .into());
    }

    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(ConfigError::InvalidPrefix(format!(
            "cannot exceed {MAX_PREFIX_LENGTH} characters"
        ))
        .into());
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidPrefix(
            "must contain only alphanumeric characters".to_string(),
        )
        .into());
    }

    Ok(())
}

/// Initialize a new featuregate repository in `base_dir`.
///
/// # Errors
///
/// Returns an error if:
/// - `.featuregate/` already exists
/// - The prefix is invalid
/// - File system operations fail
pub async fn init(base_dir: &Path, prefix: Option<&str>) -> Result<InitResult> {
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX).trim();
    validate_prefix(prefix)?;

    let featuregate_dir = base_dir.join(FEATUREGATE_DIR_NAME);
    if featuregate_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(featuregate_dir).into());
    }

    fs::create_dir_all(&featuregate_dir).await?;

    let config_file = featuregate_dir.join(CONFIG_FILE_NAME);
    FeaturegateConfig::new(prefix).save(&config_file).await?;

    let features_file = featuregate_dir.join(FEATURES_FILE_NAME);
    fs::write(&features_file, "").await?;

    tracing::debug!(dir = %featuregate_dir.display(), %prefix, "Initialized repository");

    Ok(InitResult {
        featuregate_dir,
        config_file,
        features_file,
        prefix: prefix.to_string(),
    })
}

/// Whether `base_dir` contains a `.featuregate/` directory.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(FEATUREGATE_DIR_NAME).exists()
}

/// Find the repository root by walking up from `start_dir`.
///
/// Returns the directory containing `.featuregate/`, or `None` once the
/// filesystem root or [`MAX_TRAVERSAL_DEPTH`] is reached.
pub fn find_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if is_initialized(&current) {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::short("ab")]
    #[case::default_prefix("flag")]
    #[case::digits("ff2024")]
    #[case::uppercase("FLAG")]
    #[case::max_length("a1b2c3d4e5f6g7h8i9j0")]
    fn test_validate_prefix_valid(#[case] prefix: &str) {
        assert!(validate_prefix(prefix).is_ok());
    }

    #[rstest]
    #[case::single("a", "at least 2")]
    #[case::empty("", "at least 2")]
    #[case::too_long("a".repeat(21), "cannot exceed 20")]
    #[case::hyphen("my-flag", "alphanumeric")]
    #[case::space("my flag", "alphanumeric")]
    fn test_validate_prefix_invalid(#[case] prefix: impl AsRef<str>, #[case] expected: &str) {
        let err = validate_prefix(prefix.as_ref()).unwrap_err().to_string();
        assert!(err.contains(expected), "unexpected message: {err}");
    }

    #[test]
    fn test_config_new_defaults_to_jsonl() {
        let config = FeaturegateConfig::new("flag");
        assert_eq!(config.storage.backend, "jsonl");
        assert_eq!(config.storage.data_file, ".featuregate/features.jsonl");
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.operation_timeout().is_none());
    }

    #[tokio::test]
    async fn test_config_yaml_uses_kebab_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        FeaturegateConfig::new("ff").save(&path).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();

        assert!(content.contains("id-prefix: ff"));
        assert!(content.contains("log-filter: featuregate=info"));
        assert!(!content.contains("operation-timeout-ms"));
    }

    #[tokio::test]
    async fn test_config_load_fills_defaults_and_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(
            &path,
            "id-prefix: ff\nstorage:\n  backend: memory\n  data_file: data.jsonl\noperation-timeout-ms: 250\n",
        )
        .await
        .unwrap();

        let config = FeaturegateConfig::load(&path).await.unwrap();
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_config_load_rejects_bad_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, "id-prefix: x\nstorage:\n  backend: memory\n  data_file: d\n")
            .await
            .unwrap();

        assert!(matches!(
            FeaturegateConfig::load(&path).await,
            Err(Error::Config(ConfigError::InvalidPrefix(_)))
        ));
    }

    #[rstest]
    #[case::memory("memory", true)]
    #[case::jsonl("jsonl", false)]
    #[case::mixed_case("JSONL", false)]
    fn test_to_backend(#[case] name: &str, #[case] in_memory: bool) {
        let storage = StorageConfig {
            backend: name.to_string(),
            data_file: "data.jsonl".to_string(),
        };
        let backend = storage.to_backend(Path::new("/repo")).unwrap();
        assert_eq!(matches!(backend, StorageBackend::InMemory), in_memory);
        if !in_memory {
            assert_eq!(backend.data_path(), Some(Path::new("/repo/data.jsonl")));
        }
    }

    #[test]
    fn test_to_backend_unknown() {
        let storage = StorageConfig {
            backend: "postgres".to_string(),
            data_file: String::new(),
        };
        assert!(matches!(
            storage.to_backend(Path::new("/repo")),
            Err(Error::Config(ConfigError::UnknownBackend(name))) if name == "postgres"
        ));
    }

    #[tokio::test]
    async fn test_init_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let result = init(temp_dir.path(), Some(" ff ")).await.unwrap();

        assert_eq!(result.prefix, "ff");
        assert!(result.config_file.exists());
        assert_eq!(std::fs::read_to_string(&result.features_file).unwrap(), "");

        let config = FeaturegateConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config.id_prefix, "ff");
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), None).await.unwrap();

        assert!(matches!(
            init(temp_dir.path(), None).await,
            Err(Error::Config(ConfigError::AlreadyInitialized(_)))
        ));
    }

    #[test]
    fn test_find_root_from_nested_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(FEATUREGATE_DIR_NAME)).unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_root(&nested), Some(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_root_not_found() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_root(temp_dir.path()).is_none());
    }
}
