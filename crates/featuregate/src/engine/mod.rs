//! The dependency graph engine.
//!
//! [`GraphEngine`] holds no graph of its own. Every operation re-reads what
//! it needs from a [`FeatureStore`] and a [`DependencyStore`], decides, and
//! then issues at most one write. That makes each operation cheap to cancel:
//! dropping the future before the final write leaves the stores untouched.
//!
//! # Consistency
//!
//! There is no isolation between the reads and the final write. Two
//! concurrent `add_child` calls on complementary edges (`a -> b` and
//! `b -> a`) can both pass their cycle check and both persist. Callers that
//! need strict acyclicity under concurrent writers must serialize access per
//! connected component.
//!
//! # Example
//!
//! ```no_run
//! use featuregate::domain::{FeatureType, NewFeature};
//! use featuregate::engine::GraphEngine;
//! use featuregate::storage::{create_storage, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = create_storage(StorageBackend::InMemory, "flag".to_string()).await?;
//!     let engine = GraphEngine::from_storage(storage);
//!
//!     let checkout = engine.create_feature(NewFeature::new("checkout", FeatureType::Basic, true)).await?;
//!     let one_click = engine.create_feature(NewFeature::new("one-click", FeatureType::Premium, true)).await?;
//!     engine.add_child(&checkout.id, &one_click.id).await?;
//!
//!     let report = engine.disable(&checkout.id).await?;
//!     assert_eq!(report.disabled.len(), 2);
//!     Ok(())
//! }
//! ```

mod traversal;

use crate::domain::{DependencyEdge, Feature, FeatureId, NewFeature};
use crate::error::{Error, Result};
use crate::storage::{DependencyStore, FeatureStore, Storage};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Identifier and name of a feature touched by a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSummary {
    /// Feature ID
    pub id: FeatureId,
    /// Feature name at the time of the cascade
    pub name: String,
}

/// Outcome of a cascading disable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// The feature the cascade started from
    pub root: FeatureId,

    /// Features switched off, in breadth-first order from `root`.
    ///
    /// Features that were already disabled are not listed.
    pub disabled: Vec<FeatureSummary>,
}

impl CascadeReport {
    /// Whether the cascade changed nothing
    pub fn is_noop(&self) -> bool {
        self.disabled.is_empty()
    }
}

/// Cycle-safe edge insertion, cascading disable and gated enable over a
/// pair of stores.
#[derive(Clone)]
pub struct GraphEngine {
    features: Arc<dyn FeatureStore>,
    dependencies: Arc<dyn DependencyStore>,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("features", &"<dyn FeatureStore>")
            .field("dependencies", &"<dyn DependencyStore>")
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl GraphEngine {
    /// Create an engine over two independent stores.
    pub fn new(features: Arc<dyn FeatureStore>, dependencies: Arc<dyn DependencyStore>) -> Self {
        Self {
            features,
            dependencies,
            deadline: None,
        }
    }

    /// Create an engine over a backend that provides both stores.
    pub fn from_storage(storage: Arc<dyn Storage>) -> Self {
        let features: Arc<dyn FeatureStore> = storage.clone();
        let dependencies: Arc<dyn DependencyStore> = storage;
        Self::new(features, dependencies)
    }

    /// Abandon any operation that runs longer than `deadline`.
    ///
    /// The abandoned operation surfaces as [`Error::DeadlineExceeded`].
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The configured per-operation deadline, if any
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    async fn bounded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, operation)
                .await
                .map_err(|_| Error::DeadlineExceeded(deadline))?,
            None => operation.await,
        }
    }

    /// Create a feature, enabled or disabled as requested.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFeature` if the name is empty or too long
    pub async fn create_feature(&self, feature: NewFeature) -> Result<Feature> {
        self.bounded(async {
            let created = self.features.create_feature(feature).await?;
            debug!(id = %created.id, name = %created.name, "Created feature");
            Ok(created)
        })
        .await
    }

    /// Add the edge `parent -> child` ("parent gates child").
    ///
    /// Checks, in order: the two IDs differ, both features exist, `child`
    /// cannot already reach `parent`, and the edge is not already stored.
    /// Feature enabled state is left alone.
    ///
    /// # Errors
    ///
    /// - `Error::SelfReference` if `parent == child`
    /// - `Error::FeatureNotFound` if either feature doesn't exist
    /// - `Error::CyclicDependency` if the edge would close a loop
    /// - `Error::DuplicateEdge` if the edge already exists
    pub async fn add_child(&self, parent: &FeatureId, child: &FeatureId) -> Result<DependencyEdge> {
        self.bounded(async {
            if parent == child {
                return Err(Error::SelfReference(parent.clone()));
            }

            traversal::require_feature(self.features.as_ref(), parent).await?;
            traversal::require_feature(self.features.as_ref(), child).await?;

            if traversal::reaches(self.dependencies.as_ref(), child, parent).await? {
                return Err(Error::CyclicDependency {
                    parent: parent.clone(),
                    child: child.clone(),
                });
            }

            if self.dependencies.edge_exists(parent, child).await? {
                return Err(Error::DuplicateEdge {
                    parent: parent.clone(),
                    child: child.clone(),
                });
            }

            let edge = self.dependencies.add_edge(parent, child).await?;
            debug!(edge = %edge.id, %parent, %child, "Added dependency");
            Ok(edge)
        })
        .await
    }

    /// Remove the edge `parent -> child`.
    ///
    /// Reachability is not re-validated and no feature state changes.
    ///
    /// # Errors
    ///
    /// - `Error::DependencyNotFound` if the edge doesn't exist
    pub async fn remove_child(&self, parent: &FeatureId, child: &FeatureId) -> Result<()> {
        self.bounded(async {
            self.dependencies.remove_edge(parent, child).await?;
            debug!(%parent, %child, "Removed dependency");
            Ok(())
        })
        .await
    }

    /// Disable `id` and every enabled feature it transitively gates.
    ///
    /// The whole cascade set is computed first; a single bulk write then
    /// switches it off. Features already disabled are not rewritten. If
    /// nothing needs disabling, no write is issued.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if `id` or any reachable feature is missing
    /// - `Error::Storage` on any store failure; nothing is written in either case
    pub async fn disable(&self, id: &FeatureId) -> Result<CascadeReport> {
        self.bounded(async {
            let to_disable =
                traversal::cascade_set(self.features.as_ref(), self.dependencies.as_ref(), id)
                    .await?;

            let ids: Vec<FeatureId> = to_disable.iter().map(|f| f.id.clone()).collect();
            if !ids.is_empty() {
                self.features.bulk_set_enabled(&ids, false).await?;
            }

            let report = CascadeReport {
                root: id.clone(),
                disabled: to_disable
                    .into_iter()
                    .map(|f| FeatureSummary {
                        id: f.id,
                        name: f.name,
                    })
                    .collect(),
            };

            let names: Vec<&str> = report.disabled.iter().map(|f| f.name.as_str()).collect();
            info!(
                root = %id,
                count = report.disabled.len(),
                features = ?names,
                "Disabled features"
            );

            Ok(report)
        })
        .await
    }

    /// Enable `id` if every direct parent is enabled.
    ///
    /// Only direct parents are checked, and children are never touched.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if `id` or a parent record is missing
    /// - `Error::ParentDisabled` naming the first disabled parent
    pub async fn enable(&self, id: &FeatureId) -> Result<Feature> {
        self.bounded(async {
            let mut feature = traversal::require_feature(self.features.as_ref(), id).await?;

            for parent_id in self.dependencies.parents_of(id).await? {
                let parent = traversal::require_feature(self.features.as_ref(), &parent_id).await?;
                if !parent.enabled {
                    debug!(%id, parent = %parent_id, "Enable blocked by disabled parent");
                    return Err(Error::ParentDisabled {
                        feature: id.clone(),
                        parent: parent_id,
                    });
                }
            }

            feature.enabled = true;
            feature.updated_at = Utc::now().max(feature.created_at);
            let updated = self.features.update_feature(feature).await?;
            info!(%id, name = %updated.name, "Enabled feature");
            Ok(updated)
        })
        .await
    }

    /// Current record for `id`.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if the feature doesn't exist
    pub async fn status(&self, id: &FeatureId) -> Result<Feature> {
        self.bounded(traversal::require_feature(self.features.as_ref(), id))
            .await
    }

    /// All features, oldest first.
    pub async fn list_features(&self) -> Result<Vec<Feature>> {
        self.bounded(self.features.list_features()).await
    }

    /// Features directly gated by `id`.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if `id` or a child record is missing
    pub async fn children(&self, id: &FeatureId) -> Result<Vec<Feature>> {
        self.bounded(async {
            traversal::require_feature(self.features.as_ref(), id).await?;
            let ids = self.dependencies.children_of(id).await?;
            self.resolve(&ids).await
        })
        .await
    }

    /// Features directly gating `id`.
    ///
    /// # Errors
    ///
    /// - `Error::FeatureNotFound` if `id` or a parent record is missing
    pub async fn parents(&self, id: &FeatureId) -> Result<Vec<Feature>> {
        self.bounded(async {
            traversal::require_feature(self.features.as_ref(), id).await?;
            let ids = self.dependencies.parents_of(id).await?;
            self.resolve(&ids).await
        })
        .await
    }

    /// Delete a feature through the store primitive.
    ///
    /// No edges are cleaned up; stores may refuse while edges remain.
    pub async fn delete_feature(&self, id: &FeatureId) -> Result<()> {
        self.bounded(self.features.delete_feature(id)).await
    }

    async fn resolve(&self, ids: &[FeatureId]) -> Result<Vec<Feature>> {
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            resolved.push(traversal::require_feature(self.features.as_ref(), id).await?);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureType;
    use crate::storage::{MockStorage, StoreOp};
    use rstest::rstest;

    struct Fixture {
        storage: Arc<MockStorage>,
        engine: GraphEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let storage = Arc::new(MockStorage::new());
            let engine = GraphEngine::from_storage(storage.clone());
            Self { storage, engine }
        }

        async fn feature(&self, name: &str, enabled: bool) -> FeatureId {
            self.engine
                .create_feature(NewFeature::new(name, FeatureType::Basic, enabled))
                .await
                .unwrap()
                .id
        }

        async fn enabled(&self, id: &FeatureId) -> bool {
            self.engine.status(id).await.unwrap().enabled
        }
    }

    #[tokio::test]
    async fn test_self_reference_writes_nothing() {
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        fx.storage.reset_counters();

        let err = fx.engine.add_child(&a, &a).await.unwrap_err();
        assert!(matches!(err, Error::SelfReference(id) if id == a));
        assert_eq!(fx.storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_self_reference_checked_before_existence() {
        let fx = Fixture::new();
        let ghost = FeatureId::new("flag-none");
        assert!(matches!(
            fx.engine.add_child(&ghost, &ghost).await,
            Err(Error::SelfReference(_))
        ));
    }

    #[tokio::test]
    async fn test_add_child_requires_both_features() {
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let ghost = FeatureId::new("flag-none");

        assert!(matches!(
            fx.engine.add_child(&a, &ghost).await,
            Err(Error::FeatureNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            fx.engine.add_child(&ghost, &a).await,
            Err(Error::FeatureNotFound(id)) if id == ghost
        ));
    }

    #[tokio::test]
    async fn test_cycle_reported_before_duplicate() {
        // a -> b exists; adding b -> a is a cycle, not a duplicate
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let b = fx.feature("b", true).await;
        fx.engine.add_child(&a, &b).await.unwrap();

        assert!(matches!(
            fx.engine.add_child(&b, &a).await,
            Err(Error::CyclicDependency { .. })
        ));
        assert!(matches!(
            fx.engine.add_child(&a, &b).await,
            Err(Error::DuplicateEdge { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_child_leaves_feature_state_alone() {
        let fx = Fixture::new();
        let a = fx.feature("a", false).await;
        let b = fx.feature("b", true).await;

        fx.engine.add_child(&a, &b).await.unwrap();

        assert!(!fx.enabled(&a).await);
        assert!(fx.enabled(&b).await);
    }

    #[rstest]
    #[case::lookup(StoreOp::GetFeature)]
    #[case::cycle_check(StoreOp::ChildrenOf)]
    #[case::duplicate_check(StoreOp::EdgeExists)]
    #[case::insert(StoreOp::AddEdge)]
    #[tokio::test]
    async fn test_add_child_store_failure_adds_no_edge(#[case] op: StoreOp) {
        // b -> c exists; adding a -> b walks b and c looking for a
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let b = fx.feature("b", true).await;
        let c = fx.feature("c", true).await;
        fx.engine.add_child(&b, &c).await.unwrap();
        fx.storage.reset_counters();

        let target = if op == StoreOp::ChildrenOf { &c } else { &b };
        fx.storage.fail_on(op, Some(target.clone()));
        let err = fx.engine.add_child(&a, &b).await.unwrap_err();
        fx.storage.clear_failure();

        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(fx.storage.writes(), 0);
        assert!(!fx.storage.edge_exists(&a, &b).await.unwrap());
        assert_eq!(fx.storage.list_edges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disable_issues_single_bulk_write() {
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let b = fx.feature("b", true).await;
        let c = fx.feature("c", true).await;
        fx.engine.add_child(&a, &b).await.unwrap();
        fx.engine.add_child(&b, &c).await.unwrap();
        fx.storage.reset_counters();

        let report = fx.engine.disable(&a).await.unwrap();

        assert_eq!(fx.storage.writes(), 1);
        assert_eq!(fx.storage.bulk_writes(), 1);
        let ids: Vec<FeatureId> = report.disabled.iter().map(|f| f.id.clone()).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_disable_already_disabled_leaf_is_noop() {
        let fx = Fixture::new();
        let a = fx.feature("a", false).await;
        fx.storage.reset_counters();

        let report = fx.engine.disable(&a).await.unwrap();

        assert!(report.is_noop());
        assert_eq!(fx.storage.writes(), 0);
    }

    #[rstest]
    #[case::lookup(StoreOp::GetFeature)]
    #[case::children(StoreOp::ChildrenOf)]
    #[tokio::test]
    async fn test_disable_store_failure_mid_traversal_writes_nothing(#[case] op: StoreOp) {
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let b = fx.feature("b", true).await;
        let c = fx.feature("c", true).await;
        fx.engine.add_child(&a, &b).await.unwrap();
        fx.engine.add_child(&b, &c).await.unwrap();
        fx.storage.reset_counters();

        fx.storage.fail_on(op, Some(c.clone()));
        let err = fx.engine.disable(&a).await.unwrap_err();
        fx.storage.clear_failure();

        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(fx.storage.writes(), 0);
        assert!(fx.enabled(&a).await);
        assert!(fx.enabled(&b).await);
        assert!(fx.enabled(&c).await);
    }

    #[tokio::test]
    async fn test_disable_bulk_write_failure_propagates() {
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;

        fx.storage.fail_on(StoreOp::BulkSetEnabled, None);
        assert!(matches!(fx.engine.disable(&a).await, Err(Error::Storage(_))));
        fx.storage.clear_failure();
        assert!(fx.enabled(&a).await);
    }

    #[tokio::test]
    async fn test_disable_fan_in_lists_each_feature_once() {
        // a -> b, a -> c, b -> d, c -> d
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let b = fx.feature("b", true).await;
        let c = fx.feature("c", true).await;
        let d = fx.feature("d", true).await;
        fx.engine.add_child(&a, &b).await.unwrap();
        fx.engine.add_child(&a, &c).await.unwrap();
        fx.engine.add_child(&b, &d).await.unwrap();
        fx.engine.add_child(&c, &d).await.unwrap();

        let report = fx.engine.disable(&a).await.unwrap();
        assert_eq!(report.disabled.len(), 4);
        assert_eq!(report.disabled.last().unwrap().id, d);
    }

    #[tokio::test]
    async fn test_enable_is_local_to_direct_parents() {
        // grandparent (off) -> parent (on) -> child (off)
        let fx = Fixture::new();
        let grandparent = fx.feature("gp", true).await;
        let parent = fx.feature("p", true).await;
        let child = fx.feature("c", false).await;
        fx.engine.add_child(&grandparent, &parent).await.unwrap();
        fx.engine.add_child(&parent, &child).await.unwrap();

        // Switch the grandparent off without cascading
        fx.storage
            .bulk_set_enabled(std::slice::from_ref(&grandparent), false)
            .await
            .unwrap();

        let enabled = fx.engine.enable(&child).await.unwrap();
        assert!(enabled.enabled);
        assert!(!fx.enabled(&grandparent).await);
    }

    #[tokio::test]
    async fn test_enable_never_cascades_to_children() {
        let fx = Fixture::new();
        let a = fx.feature("a", false).await;
        let b = fx.feature("b", false).await;
        fx.engine.add_child(&a, &b).await.unwrap();

        fx.engine.enable(&a).await.unwrap();
        assert!(!fx.enabled(&b).await);
    }

    #[tokio::test]
    async fn test_enable_blocked_writes_nothing() {
        let fx = Fixture::new();
        let a = fx.feature("a", false).await;
        let b = fx.feature("b", false).await;
        fx.engine.add_child(&a, &b).await.unwrap();
        fx.storage.reset_counters();

        let err = fx.engine.enable(&b).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ParentDisabled { ref feature, ref parent } if *feature == b && *parent == a
        ));
        assert_eq!(fx.storage.writes(), 0);
    }

    #[rstest]
    #[case::parent_lookup(StoreOp::ParentsOf)]
    #[case::parent_record(StoreOp::GetFeature)]
    #[case::write(StoreOp::UpdateFeature)]
    #[tokio::test]
    async fn test_enable_store_failure_leaves_feature_disabled(#[case] op: StoreOp) {
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let b = fx.feature("b", false).await;
        fx.engine.add_child(&a, &b).await.unwrap();
        fx.storage.reset_counters();

        let target = if op == StoreOp::GetFeature { &a } else { &b };
        fx.storage.fail_on(op, Some(target.clone()));
        let err = fx.engine.enable(&b).await.unwrap_err();
        fx.storage.clear_failure();

        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(fx.storage.writes(), 0);
        assert!(!fx.enabled(&b).await);
    }

    #[tokio::test]
    async fn test_enable_refreshes_updated_at() {
        let fx = Fixture::new();
        let a = fx.feature("a", false).await;
        let before = fx.engine.status(&a).await.unwrap();

        let after = fx.engine.enable(&a).await.unwrap();
        assert!(after.enabled);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.engine.status(&FeatureId::new("flag-none")).await,
            Err(Error::FeatureNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_children_and_parents_resolve_records() {
        let fx = Fixture::new();
        let a = fx.feature("a", true).await;
        let b = fx.feature("b", true).await;
        fx.engine.add_child(&a, &b).await.unwrap();

        let children = fx.engine.children(&a).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "b");

        let parents = fx.engine.parents(&b).await.unwrap();
        assert_eq!(parents[0].id, a);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        struct SlowStore;

        #[async_trait::async_trait]
        impl FeatureStore for SlowStore {
            async fn get_feature(&self, _id: &FeatureId) -> Result<Option<Feature>> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
            async fn create_feature(&self, _feature: NewFeature) -> Result<Feature> {
                unimplemented!("not exercised")
            }
            async fn update_feature(&self, _feature: Feature) -> Result<Feature> {
                unimplemented!("not exercised")
            }
            async fn bulk_set_enabled(&self, _ids: &[FeatureId], _enabled: bool) -> Result<()> {
                unimplemented!("not exercised")
            }
            async fn delete_feature(&self, _id: &FeatureId) -> Result<()> {
                unimplemented!("not exercised")
            }
            async fn list_features(&self) -> Result<Vec<Feature>> {
                Ok(vec![])
            }
        }

        let engine = GraphEngine::new(Arc::new(SlowStore), Arc::new(MockStorage::new()))
            .with_deadline(Duration::from_millis(50));

        let err = engine.status(&FeatureId::new("flag-a")).await.unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded(d) if d == Duration::from_millis(50)));
    }
}
