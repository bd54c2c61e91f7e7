//! Storage abstraction layer for featuregate.
//!
//! The dependency graph engine never owns data. It talks to two stores
//! through the traits defined here:
//!
//! - [`FeatureStore`]: feature records keyed by [`FeatureId`]
//! - [`DependencyStore`]: directed (parent, child) edges
//!
//! Backends implement both, plus [`Storage`] for persistence hooks:
//!
//! - **In-memory**: `HashMap` for features, a petgraph `StableDiGraph` for edges
//! - **JSONL**: the in-memory backend plus atomic saves to a JSON Lines file
//!
//! # Concurrency
//!
//! Every method takes `&self`. Backends hold their state behind an async
//! mutex, so a single `Arc<dyn Storage>` can be shared by concurrent callers.
//! Each method is atomic on its own; sequences of calls are not.
//!
//! # Test Utilities
//!
//! With `cfg(test)` or the `test-util` feature, [`MockStorage`] wraps the
//! in-memory backend, counts writes and injects failures on demand.
//!
//! # Example
//!
//! ```no_run
//! use featuregate::domain::{FeatureType, NewFeature};
//! use featuregate::storage::{create_storage, FeatureStore, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = create_storage(StorageBackend::InMemory, "flag".to_string()).await?;
//!     let feature = storage
//!         .create_feature(NewFeature::new("dark-mode", FeatureType::Basic, true))
//!         .await?;
//!     println!("Created feature: {}", feature.id);
//!     Ok(())
//! }
//! ```

use crate::domain::{DependencyEdge, Feature, FeatureId, NewFeature};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod in_memory;

#[cfg(any(test, feature = "test-util"))]
mod mock;

#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockStorage, StoreOp};

use in_memory::InMemoryStorage;

/// Durable key-to-record storage for features.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Point lookup. Returns `None` if the feature doesn't exist.
    async fn get_feature(&self, id: &FeatureId) -> Result<Option<Feature>>;

    /// Insert a new feature.
    ///
    /// The store mints the identifier and both timestamps. Implementations
    /// **must** call `feature.validate()` first.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFeature` if validation fails
    async fn create_feature(&self, feature: NewFeature) -> Result<Feature>;

    /// Overwrite a stored feature with `feature`, keyed by `feature.id`.
    ///
    /// The caller owns `updated_at`; the store persists what it is given.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if no record has that ID
    async fn update_feature(&self, feature: Feature) -> Result<Feature>;

    /// Set `enabled` on every listed feature and refresh their `updated_at`.
    ///
    /// All-or-nothing: if any ID is unknown nothing is written.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` for the first unknown ID
    async fn bulk_set_enabled(&self, ids: &[FeatureId], enabled: bool) -> Result<()>;

    /// Delete a feature.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if the feature doesn't exist
    /// - `Error::HasDependencies` if edges still reference it
    async fn delete_feature(&self, id: &FeatureId) -> Result<()>;

    /// All features, oldest first.
    async fn list_features(&self) -> Result<Vec<Feature>>;
}

/// Durable storage of directed (parent, child) edges.
///
/// The store does not enforce acyclicity; that is the engine's job.
#[async_trait]
pub trait DependencyStore: Send + Sync {
    /// Insert the edge `parent -> child` and return it.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if either endpoint doesn't exist
    /// - `Error::DuplicateEdge` if the edge is already stored
    async fn add_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<DependencyEdge>;

    /// Whether the edge `parent -> child` is stored.
    async fn edge_exists(&self, parent: &FeatureId, child: &FeatureId) -> Result<bool>;

    /// Delete the edge `parent -> child`.
    ///
    /// # Errors
    ///
    /// - `Error::DependencyNotFound` if the edge doesn't exist
    async fn remove_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<()>;

    /// Features directly gated by `id`. Unknown IDs have no children.
    async fn children_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>>;

    /// Features directly gating `id`. Unknown IDs have no parents.
    async fn parents_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>>;

    /// All edges, oldest first.
    async fn list_edges(&self) -> Result<Vec<DependencyEdge>>;
}

/// A backend providing both stores plus persistence hooks.
#[async_trait]
pub trait Storage: FeatureStore + DependencyStore {
    /// Flush state to persistent storage.
    ///
    /// A no-op for in-memory storage; writes the data file for JSONL.
    async fn save(&self) -> Result<()>;

    /// Discard unsaved state and re-read persistent storage.
    ///
    /// A no-op for in-memory storage.
    async fn reload(&self) -> Result<()>;
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// In-memory storage whose `save()` writes a JSONL file.
struct JsonlBackedStorage {
    inner: InMemoryStorage,
    path: PathBuf,
    prefix: String,
}

#[async_trait]
impl FeatureStore for JsonlBackedStorage {
    async fn get_feature(&self, id: &FeatureId) -> Result<Option<Feature>> {
        self.inner.get_feature(id).await
    }

    async fn create_feature(&self, feature: NewFeature) -> Result<Feature> {
        self.inner.create_feature(feature).await
    }

    async fn update_feature(&self, feature: Feature) -> Result<Feature> {
        self.inner.update_feature(feature).await
    }

    async fn bulk_set_enabled(&self, ids: &[FeatureId], enabled: bool) -> Result<()> {
        self.inner.bulk_set_enabled(ids, enabled).await
    }

    async fn delete_feature(&self, id: &FeatureId) -> Result<()> {
        self.inner.delete_feature(id).await
    }

    async fn list_features(&self) -> Result<Vec<Feature>> {
        self.inner.list_features().await
    }
}

#[async_trait]
impl DependencyStore for JsonlBackedStorage {
    async fn add_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<DependencyEdge> {
        self.inner.add_edge(parent, child).await
    }

    async fn edge_exists(&self, parent: &FeatureId, child: &FeatureId) -> Result<bool> {
        self.inner.edge_exists(parent, child).await
    }

    async fn remove_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<()> {
        self.inner.remove_edge(parent, child).await
    }

    async fn children_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>> {
        self.inner.children_of(id).await
    }

    async fn parents_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>> {
        self.inner.parents_of(id).await
    }

    async fn list_edges(&self) -> Result<Vec<DependencyEdge>> {
        self.inner.list_edges().await
    }
}

#[async_trait]
impl Storage for JsonlBackedStorage {
    async fn save(&self) -> Result<()> {
        in_memory::save_to_jsonl(&self.inner, &self.path).await
    }

    async fn reload(&self) -> Result<()> {
        let fresh = load_or_empty(&self.path, &self.prefix).await?;
        self.inner.replace_with(fresh).await;
        Ok(())
    }
}

/// Load `path` if it exists, logging load warnings; otherwise start empty.
async fn load_or_empty(path: &Path, prefix: &str) -> Result<InMemoryStorage> {
    if !path.exists() {
        return Ok(InMemoryStorage::new(prefix.to_string()));
    }

    let (storage, warnings) = in_memory::load_from_jsonl(path, prefix.to_string()).await?;
    for warning in &warnings {
        tracing::warn!(warning = %warning, path = %path.display(), "JSONL load warning");
    }
    Ok(storage)
}

/// Create a storage instance for the given backend.
///
/// # Arguments
///
/// * `backend` - The storage backend to use
/// * `prefix` - The prefix for generated feature IDs (e.g., "flag")
///
/// # Errors
///
/// - `Error::Io` if the data file cannot be read (JSONL backend)
pub async fn create_storage(
    backend: StorageBackend,
    prefix: String,
) -> Result<std::sync::Arc<dyn Storage>> {
    match backend {
        StorageBackend::InMemory => Ok(std::sync::Arc::new(InMemoryStorage::new(prefix))),
        StorageBackend::Jsonl(path) => {
            let inner = load_or_empty(&path, &prefix).await?;
            Ok(std::sync::Arc::new(JsonlBackedStorage {
                inner,
                path,
                prefix,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_trait_object_usage() {
        let storage = create_storage(StorageBackend::InMemory, "flag".into())
            .await
            .unwrap();

        let feature = storage
            .create_feature(NewFeature::new("search", FeatureType::Basic, true))
            .await
            .unwrap();
        assert!(feature.id.as_str().starts_with("flag-"));

        let features: std::sync::Arc<dyn FeatureStore> = storage.clone();
        assert!(features.get_feature(&feature.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_jsonl_reload_restores_disk_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("features.jsonl");

        let storage = create_storage(StorageBackend::Jsonl(path.clone()), "flag".into())
            .await
            .unwrap();
        let feature = storage
            .create_feature(NewFeature::new("search", FeatureType::Basic, true))
            .await
            .unwrap();
        storage.save().await.unwrap();

        storage
            .bulk_set_enabled(std::slice::from_ref(&feature.id), false)
            .await
            .unwrap();
        assert!(!storage.get_feature(&feature.id).await.unwrap().unwrap().enabled);

        storage.reload().await.unwrap();
        assert!(storage.get_feature(&feature.id).await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_jsonl_reload_missing_file_resets() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("features.jsonl");

        let storage = create_storage(StorageBackend::Jsonl(path.clone()), "flag".into())
            .await
            .unwrap();
        let feature = storage
            .create_feature(NewFeature::new("search", FeatureType::Basic, true))
            .await
            .unwrap();
        storage.save().await.unwrap();

        std::fs::remove_file(&path).unwrap();
        storage.reload().await.unwrap();

        assert!(storage.get_feature(&feature.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_reload_is_noop() {
        let storage = create_storage(StorageBackend::InMemory, "flag".into())
            .await
            .unwrap();
        let feature = storage
            .create_feature(NewFeature::new("search", FeatureType::Basic, false))
            .await
            .unwrap();

        storage.reload().await.unwrap();
        assert!(storage.get_feature(&feature.id).await.unwrap().is_some());
    }

    #[test]
    fn test_backend_data_path() {
        assert!(StorageBackend::InMemory.data_path().is_none());
        let path = PathBuf::from("x/features.jsonl");
        assert_eq!(
            StorageBackend::Jsonl(path.clone()).data_path(),
            Some(path.as_path())
        );
    }
}
