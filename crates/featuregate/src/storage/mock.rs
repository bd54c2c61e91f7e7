//! Instrumented storage for tests.

use super::in_memory::InMemoryStorage;
use super::{DependencyStore, FeatureStore, Storage};
use crate::domain::{DependencyEdge, Feature, FeatureId, NewFeature};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store operations a [`MockStorage`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// `FeatureStore::get_feature`
    GetFeature,
    /// `FeatureStore::update_feature`
    UpdateFeature,
    /// `FeatureStore::bulk_set_enabled`
    BulkSetEnabled,
    /// `DependencyStore::add_edge`
    AddEdge,
    /// `DependencyStore::edge_exists`
    EdgeExists,
    /// `DependencyStore::children_of`
    ChildrenOf,
    /// `DependencyStore::parents_of`
    ParentsOf,
}

#[derive(Debug, Clone)]
struct FailPoint {
    op: StoreOp,
    only_for: Option<FeatureId>,
}

/// In-memory storage that counts writes and injects failures.
///
/// Use it to assert that an operation issued no write, or that a store
/// failure part way through a traversal leaves state untouched.
///
/// # Example
///
/// ```rust,ignore
/// use featuregate::storage::{MockStorage, StoreOp};
///
/// let storage = MockStorage::new();
/// storage.fail_on(StoreOp::ChildrenOf, None);
/// ```
#[derive(Debug)]
pub struct MockStorage {
    inner: InMemoryStorage,
    fail_point: Mutex<Option<FailPoint>>,
    writes: AtomicUsize,
    bulk_writes: AtomicUsize,
}

impl MockStorage {
    /// Create an empty mock store using the `flag` ID prefix.
    pub fn new() -> Self {
        Self {
            inner: InMemoryStorage::new("flag".to_string()),
            fail_point: Mutex::new(None),
            writes: AtomicUsize::new(0),
            bulk_writes: AtomicUsize::new(0),
        }
    }

    /// Fail every future call of `op`, or only calls about `only_for`.
    pub fn fail_on(&self, op: StoreOp, only_for: Option<FeatureId>) {
        *self.lock_fail_point() = Some(FailPoint { op, only_for });
    }

    /// Stop injecting failures.
    pub fn clear_failure(&self) {
        *self.lock_fail_point() = None;
    }

    /// Number of mutating calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `bulk_set_enabled` calls that reached the store.
    pub fn bulk_writes(&self) -> usize {
        self.bulk_writes.load(Ordering::SeqCst)
    }

    /// Reset the write counters (e.g. after seeding fixtures).
    pub fn reset_counters(&self) {
        self.writes.store(0, Ordering::SeqCst);
        self.bulk_writes.store(0, Ordering::SeqCst);
    }

    fn lock_fail_point(&self) -> std::sync::MutexGuard<'_, Option<FailPoint>> {
        self.fail_point
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check(&self, op: StoreOp, id: &FeatureId) -> Result<()> {
        let fail_point = self.lock_fail_point();
        match fail_point.as_ref() {
            Some(point) if point.op == op && point.only_for.as_ref().is_none_or(|only| only == id) => {
                Err(StorageError::Unavailable(format!("injected failure on {op:?} for {id}")).into())
            }
            _ => Ok(()),
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureStore for MockStorage {
    async fn get_feature(&self, id: &FeatureId) -> Result<Option<Feature>> {
        self.check(StoreOp::GetFeature, id)?;
        self.inner.get_feature(id).await
    }

    async fn create_feature(&self, feature: NewFeature) -> Result<Feature> {
        self.record_write();
        self.inner.create_feature(feature).await
    }

    async fn update_feature(&self, feature: Feature) -> Result<Feature> {
        self.check(StoreOp::UpdateFeature, &feature.id)?;
        self.record_write();
        self.inner.update_feature(feature).await
    }

    async fn bulk_set_enabled(&self, ids: &[FeatureId], enabled: bool) -> Result<()> {
        for id in ids {
            self.check(StoreOp::BulkSetEnabled, id)?;
        }
        self.record_write();
        self.bulk_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.bulk_set_enabled(ids, enabled).await
    }

    async fn delete_feature(&self, id: &FeatureId) -> Result<()> {
        self.record_write();
        self.inner.delete_feature(id).await
    }

    async fn list_features(&self) -> Result<Vec<Feature>> {
        self.inner.list_features().await
    }
}

#[async_trait]
impl DependencyStore for MockStorage {
    async fn add_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<DependencyEdge> {
        self.check(StoreOp::AddEdge, child)?;
        self.record_write();
        self.inner.add_edge(parent, child).await
    }

    async fn edge_exists(&self, parent: &FeatureId, child: &FeatureId) -> Result<bool> {
        self.check(StoreOp::EdgeExists, child)?;
        self.inner.edge_exists(parent, child).await
    }

    async fn remove_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<()> {
        self.record_write();
        self.inner.remove_edge(parent, child).await
    }

    async fn children_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>> {
        self.check(StoreOp::ChildrenOf, id)?;
        self.inner.children_of(id).await
    }

    async fn parents_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>> {
        self.check(StoreOp::ParentsOf, id)?;
        self.inner.parents_of(id).await
    }

    async fn list_edges(&self) -> Result<Vec<DependencyEdge>> {
        self.inner.list_edges().await
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn save(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureType;
    use crate::error::Error;

    #[tokio::test]
    async fn test_failure_injection_targets_one_feature() {
        let storage = MockStorage::new();
        let a = storage
            .create_feature(NewFeature::new("a", FeatureType::Basic, true))
            .await
            .unwrap();
        let b = storage
            .create_feature(NewFeature::new("b", FeatureType::Basic, true))
            .await
            .unwrap();

        storage.fail_on(StoreOp::GetFeature, Some(b.id.clone()));
        assert!(storage.get_feature(&a.id).await.is_ok());
        assert!(matches!(
            storage.get_feature(&b.id).await,
            Err(Error::Storage(StorageError::Unavailable(_)))
        ));

        storage.clear_failure();
        assert!(storage.get_feature(&b.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_counts_writes() {
        let storage = MockStorage::new();
        let a = storage
            .create_feature(NewFeature::new("a", FeatureType::Basic, true))
            .await
            .unwrap();
        assert_eq!(storage.writes(), 1);

        storage.reset_counters();
        storage
            .bulk_set_enabled(std::slice::from_ref(&a.id), false)
            .await
            .unwrap();
        assert_eq!(storage.writes(), 1);
        assert_eq!(storage.bulk_writes(), 1);
    }
}
