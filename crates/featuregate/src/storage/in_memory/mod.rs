//! In-memory storage backend using HashMap and petgraph.
//!
//! All data lives in RAM and is lost when the process exits, unless it is
//! written out with [`save_to_jsonl`] and read back with [`load_from_jsonl`].
//!
//! # Architecture
//!
//! - `HashMap<FeatureId, Feature>` for O(1) feature lookups
//! - `petgraph::stable_graph::StableDiGraph` holding one node per feature
//!   and one edge per dependency, weighted with the [`DependencyEdge`] record
//! - `HashMap<FeatureId, NodeIndex>` mapping features to graph nodes
//! - Hash-based ID generation for both features and edges
//!
//! ## Edge Direction Convention
//!
//! Edges point **parent -> child**: the source gates the target. Children of
//! a feature are its outgoing neighbours, parents are its incoming ones.
//!
//! A stable graph is used so node indices survive feature deletion.
//!
//! # Thread Safety
//!
//! State sits behind a `tokio::sync::Mutex`; each trait method holds the lock
//! for its whole body, so every single store call is atomic.
//!
//! [`DependencyEdge`]: crate::domain::DependencyEdge

mod graph;
mod inner;
mod jsonl;
mod trait_impl;

use inner::InMemoryStorageInner;
use tokio::sync::{Mutex, MutexGuard};

pub use jsonl::{LoadWarning, load_from_jsonl, save_to_jsonl};

/// Thread-safe in-memory storage implementing every storage trait.
pub struct InMemoryStorage {
    inner: Mutex<InMemoryStorageInner>,
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage").finish_non_exhaustive()
    }
}

impl InMemoryStorage {
    /// Create an empty store.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The prefix for feature IDs (e.g., "flag")
    ///
    /// # Example
    ///
    /// ```
    /// use featuregate::storage::in_memory::InMemoryStorage;
    ///
    /// let storage = InMemoryStorage::new("flag".to_string());
    /// ```
    pub fn new(prefix: String) -> Self {
        Self::from_inner(InMemoryStorageInner::new(prefix))
    }

    fn from_inner(inner: InMemoryStorageInner) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, InMemoryStorageInner> {
        self.inner.lock().await
    }

    /// Swap the whole state for `other`'s, used by JSONL reloads.
    pub(crate) async fn replace_with(&self, other: InMemoryStorage) {
        let fresh = other.inner.into_inner();
        *self.inner.lock().await = fresh;
    }
}
