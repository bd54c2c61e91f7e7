//! Application context for CLI command execution.
//!
//! [`App`] locates the repository, loads its configuration, opens storage and
//! wires a [`GraphEngine`] over it.
//!
//! # Example
//!
//! ```no_run
//! use featuregate::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     for feature in app.engine().list_features().await? {
//!         println!("{} {}", feature.id, feature.name);
//!     }
//!     Ok(())
//! }
//! ```

use crate::commands::init::{
    CONFIG_FILE_NAME, DEFAULT_LOG_FILTER, FEATUREGATE_DIR_NAME, FeaturegateConfig, find_root,
};
use crate::engine::GraphEngine;
use crate::error::{ConfigError, Result};
use crate::storage::{Storage, create_storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for CLI operations.
pub struct App {
    storage: Arc<dyn Storage>,
    engine: GraphEngine,
    featuregate_dir: PathBuf,
    config: FeaturegateConfig,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("featuregate_dir", &self.featuregate_dir)
            .field("config", &self.config)
            .field("storage", &"<dyn Storage>")
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create an App from `working_dir` or any of its ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No featuregate repository is found in the directory tree
    /// - Configuration cannot be loaded
    /// - Storage initialization fails
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_root(working_dir).ok_or(ConfigError::NotInitialized)?;
        let featuregate_dir = root_dir.join(FEATUREGATE_DIR_NAME);

        let config = FeaturegateConfig::load(&featuregate_dir.join(CONFIG_FILE_NAME)).await?;

        let backend = config.storage.to_backend(&root_dir)?;
        let storage = create_storage(backend, config.id_prefix.clone()).await?;

        let mut engine = GraphEngine::from_storage(Arc::clone(&storage));
        if let Some(deadline) = config.operation_timeout() {
            engine = engine.with_deadline(deadline);
        }

        tracing::debug!(root = %root_dir.display(), prefix = %config.id_prefix, "Opened repository");

        Ok(Self {
            storage,
            engine,
            featuregate_dir,
            config,
        })
    }

    /// The dependency graph engine.
    pub fn engine(&self) -> &GraphEngine {
        &self.engine
    }

    /// The feature ID prefix.
    pub fn prefix(&self) -> &str {
        &self.config.id_prefix
    }

    /// Path to the `.featuregate` directory.
    pub fn featuregate_dir(&self) -> &Path {
        &self.featuregate_dir
    }

    /// Persist storage state. Call after any mutating operation.
    pub async fn save(&self) -> Result<()> {
        self.storage.save().await
    }
}

/// The log filter configured for the repository containing `working_dir`.
///
/// Falls back to `featuregate=info` outside a repository or when the config
/// can't be read.
pub async fn configured_log_filter(working_dir: &Path) -> String {
    let Some(root_dir) = find_root(working_dir) else {
        return DEFAULT_LOG_FILTER.to_string();
    };

    let path = root_dir.join(FEATUREGATE_DIR_NAME).join(CONFIG_FILE_NAME);
    FeaturegateConfig::load(&path)
        .await
        .map_or_else(|_| DEFAULT_LOG_FILTER.to_string(), |config| config.log_filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::domain::{FeatureType, NewFeature};
    use crate::error::Error;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), Some("ff")).await.unwrap();

        let sub_dir = temp_dir.path().join("src").join("lib");
        std::fs::create_dir_all(&sub_dir).unwrap();

        let app = App::from_directory(&sub_dir).await.unwrap();
        assert_eq!(app.prefix(), "ff");
        assert!(app.featuregate_dir().ends_with(FEATUREGATE_DIR_NAME));
        assert!(app.engine().deadline().is_none());
    }

    #[tokio::test]
    async fn test_app_not_initialized() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            App::from_directory(temp_dir.path()).await,
            Err(Error::Config(ConfigError::NotInitialized))
        ));
    }

    #[tokio::test]
    async fn test_app_save_persists_between_instances() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), None).await.unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();
        let feature = app
            .engine()
            .create_feature(NewFeature::new("search", FeatureType::Basic, true))
            .await
            .unwrap();
        app.save().await.unwrap();

        let reopened = App::from_directory(temp_dir.path()).await.unwrap();
        let loaded = reopened.engine().status(&feature.id).await.unwrap();
        assert_eq!(loaded.name, "search");
    }

    #[tokio::test]
    async fn test_app_applies_configured_deadline() {
        let temp_dir = TempDir::new().unwrap();
        let result = init::init(temp_dir.path(), None).await.unwrap();

        let mut config = FeaturegateConfig::load(&result.config_file).await.unwrap();
        config.operation_timeout_ms = Some(1500);
        config.save(&result.config_file).await.unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();
        assert_eq!(app.engine().deadline(), Some(Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn test_configured_log_filter() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(configured_log_filter(temp_dir.path()).await, DEFAULT_LOG_FILTER);

        let result = init::init(temp_dir.path(), None).await.unwrap();
        let mut config = FeaturegateConfig::load(&result.config_file).await.unwrap();
        config.log_filter = "featuregate=debug".to_string();
        config.save(&result.config_file).await.unwrap();

        assert_eq!(configured_log_filter(temp_dir.path()).await, "featuregate=debug");
    }
}
