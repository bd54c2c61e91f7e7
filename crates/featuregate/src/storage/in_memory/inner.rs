//! Core in-memory storage data structures.

use super::graph;
use crate::domain::{DependencyEdge, DependencyId, Feature, FeatureId, NewFeature};
use crate::error::{Error, Result, StorageError};
use crate::id_generation::{IdGenerator, IdGeneratorConfig};
use chrono::Utc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::HashMap;

/// Prefix for dependency edge IDs.
pub(crate) const EDGE_ID_PREFIX: &str = "dep";

/// Inner storage structure (not thread-safe on its own).
///
/// Invariant: every key of `features` has an entry in `node_map`, and every
/// node in `graph` belongs to a key of `features`.
pub(crate) struct InMemoryStorageInner {
    /// Features indexed by ID
    pub(super) features: HashMap<FeatureId, Feature>,

    /// Dependency graph. Edge direction: parent -> child.
    pub(super) graph: StableDiGraph<FeatureId, DependencyEdge>,

    /// Mapping from FeatureId to graph node
    pub(super) node_map: HashMap<FeatureId, NodeIndex>,

    /// Generator for feature IDs
    feature_ids: IdGenerator,

    /// Generator for edge IDs
    edge_ids: IdGenerator,
}

impl InMemoryStorageInner {
    /// Create a new empty storage instance
    pub(crate) fn new(prefix: String) -> Self {
        Self {
            features: HashMap::new(),
            graph: StableDiGraph::new(),
            node_map: HashMap::new(),
            feature_ids: IdGenerator::new(IdGeneratorConfig {
                prefix,
                store_size: 0,
            }),
            edge_ids: IdGenerator::new(IdGeneratorConfig {
                prefix: EDGE_ID_PREFIX.to_string(),
                store_size: 0,
            }),
        }
    }

    /// Look up a feature's node or fail with `FeatureNotFound`
    pub(super) fn node(&self, id: &FeatureId) -> Result<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| Error::FeatureNotFound(id.clone()))
    }

    /// Insert a fully formed feature record (used by create and by loading)
    pub(super) fn insert_feature(&mut self, feature: Feature) {
        let node = self.graph.add_node(feature.id.clone());
        self.node_map.insert(feature.id.clone(), node);
        self.feature_ids.register_id(feature.id.as_str().to_string());
        self.features.insert(feature.id.clone(), feature);
    }

    /// Insert a fully formed edge record (used by add_edge and by loading).
    ///
    /// Both endpoints must already exist.
    pub(super) fn insert_edge(&mut self, edge: DependencyEdge) -> Result<()> {
        let parent = self.node(&edge.parent_id)?;
        let child = self.node(&edge.child_id)?;
        self.edge_ids.register_id(edge.id.as_str().to_string());
        self.graph.add_edge(parent, child, edge);
        Ok(())
    }

    /// Build a feature record with a fresh ID and timestamps
    pub(super) fn mint_feature(&mut self, new_feature: NewFeature) -> Result<Feature> {
        let size = self.features.len();
        regrow(&mut self.feature_ids, size, self.features.keys().map(FeatureId::as_str));

        let enabled = if new_feature.enabled { "on" } else { "off" };
        let type_name = new_feature.feature_type.to_string();
        let id = self
            .feature_ids
            .generate(&[new_feature.name.trim(), &type_name, enabled])
            .map_err(StorageError::from)?;

        let now = Utc::now();
        Ok(Feature {
            id: FeatureId::new(id),
            name: new_feature.name.trim().to_string(),
            feature_type: new_feature.feature_type,
            enabled: new_feature.enabled,
            created_at: now,
            updated_at: now,
        })
    }

    /// Build an edge record with a fresh ID and timestamps
    pub(super) fn mint_edge(&mut self, parent: &FeatureId, child: &FeatureId) -> Result<DependencyEdge> {
        let size = self.graph.edge_count();
        regrow(
            &mut self.edge_ids,
            size,
            graph::all_edges(&self.graph).map(|edge| edge.id.as_str()),
        );

        let id = self
            .edge_ids
            .generate(&[parent.as_str(), child.as_str()])
            .map_err(StorageError::from)?;

        let now = Utc::now();
        Ok(DependencyEdge {
            id: DependencyId::new(id),
            parent_id: parent.clone(),
            child_id: child.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Remove a feature that has no incident edges
    pub(super) fn remove_feature(&mut self, id: &FeatureId) -> Result<()> {
        let node = self.node(id)?;
        let count = graph::incident_edge_count(&self.graph, node);
        if count > 0 {
            return Err(Error::HasDependencies {
                id: id.clone(),
                count,
            });
        }

        self.graph.remove_node(node);
        self.node_map.remove(id);
        self.features.remove(id);
        self.feature_ids.release_id(id.as_str());
        Ok(())
    }
}

/// Recreate `generator` when the store crosses an ID length threshold.
///
/// Hash length changes at 500 and 1500 records, so the O(n) re-registration
/// only happens at those boundaries.
fn regrow<'a>(generator: &mut IdGenerator, size: usize, existing: impl Iterator<Item = &'a str>) {
    let needs_update = matches!(
        (generator.store_size(), size),
        (0..=500, 501..) | (0..=1500, 1501..) | (501.., 0..=500) | (1501.., 0..=1500)
    );
    if !needs_update {
        return;
    }

    let mut fresh = IdGenerator::new(IdGeneratorConfig {
        prefix: generator.prefix().to_string(),
        store_size: size,
    });
    for id in existing {
        fresh.register_id(id.to_string());
    }
    *generator = fresh;
}
