//! Storage trait implementations for in-memory storage.

use super::InMemoryStorage;
use super::graph::{all_edges, neighbours};
use crate::domain::{DependencyEdge, Feature, FeatureId, NewFeature};
use crate::error::{Error, Result};
use crate::storage::{DependencyStore, FeatureStore, Storage};
use async_trait::async_trait;
use chrono::Utc;
use petgraph::Direction;

#[async_trait]
impl FeatureStore for InMemoryStorage {
    async fn get_feature(&self, id: &FeatureId) -> Result<Option<Feature>> {
        let inner = self.lock().await;
        Ok(inner.features.get(id).cloned())
    }

    async fn create_feature(&self, new_feature: NewFeature) -> Result<Feature> {
        new_feature.validate().map_err(Error::InvalidFeature)?;

        let mut inner = self.lock().await;
        let feature = inner.mint_feature(new_feature)?;
        inner.insert_feature(feature.clone());

        Ok(feature)
    }

    async fn update_feature(&self, feature: Feature) -> Result<Feature> {
        let mut inner = self.lock().await;
        let stored = inner
            .features
            .get_mut(&feature.id)
            .ok_or_else(|| Error::FeatureNotFound(feature.id.clone()))?;

        // Identity and creation time are owned by the store. A loaded record
        // may be dated ahead of the local clock.
        let created_at = stored.created_at;
        let merged = Feature {
            created_at,
            updated_at: feature.updated_at.max(created_at),
            ..feature
        };
        merged.validate().map_err(Error::InvalidFeature)?;
        *stored = merged;

        Ok(stored.clone())
    }

    async fn bulk_set_enabled(&self, ids: &[FeatureId], enabled: bool) -> Result<()> {
        let mut inner = self.lock().await;

        if let Some(missing) = ids.iter().find(|id| !inner.features.contains_key(*id)) {
            return Err(Error::FeatureNotFound(missing.clone()));
        }

        let now = Utc::now();
        for id in ids {
            if let Some(feature) = inner.features.get_mut(id) {
                feature.enabled = enabled;
                feature.updated_at = now.max(feature.created_at);
            }
        }

        Ok(())
    }

    async fn delete_feature(&self, id: &FeatureId) -> Result<()> {
        let mut inner = self.lock().await;
        inner.remove_feature(id)
    }

    async fn list_features(&self) -> Result<Vec<Feature>> {
        let inner = self.lock().await;
        let mut features: Vec<Feature> = inner.features.values().cloned().collect();
        features.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(features)
    }
}

#[async_trait]
impl DependencyStore for InMemoryStorage {
    async fn add_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<DependencyEdge> {
        let mut inner = self.lock().await;

        let parent_node = inner.node(parent)?;
        let child_node = inner.node(child)?;

        if inner.graph.find_edge(parent_node, child_node).is_some() {
            return Err(Error::DuplicateEdge {
                parent: parent.clone(),
                child: child.clone(),
            });
        }

        let edge = inner.mint_edge(parent, child)?;
        inner.insert_edge(edge.clone())?;

        Ok(edge)
    }

    async fn edge_exists(&self, parent: &FeatureId, child: &FeatureId) -> Result<bool> {
        let inner = self.lock().await;

        let (Some(&parent_node), Some(&child_node)) =
            (inner.node_map.get(parent), inner.node_map.get(child))
        else {
            return Ok(false);
        };

        Ok(inner.graph.find_edge(parent_node, child_node).is_some())
    }

    async fn remove_edge(&self, parent: &FeatureId, child: &FeatureId) -> Result<()> {
        let mut inner = self.lock().await;

        let not_found = || Error::DependencyNotFound {
            parent: parent.clone(),
            child: child.clone(),
        };

        let parent_node = inner.node(parent).map_err(|_| not_found())?;
        let child_node = inner.node(child).map_err(|_| not_found())?;
        let edge = inner
            .graph
            .find_edge(parent_node, child_node)
            .ok_or_else(not_found)?;

        inner.graph.remove_edge(edge);
        Ok(())
    }

    async fn children_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>> {
        let inner = self.lock().await;
        Ok(inner
            .node_map
            .get(id)
            .map(|&node| neighbours(&inner.graph, node, Direction::Outgoing))
            .unwrap_or_default())
    }

    async fn parents_of(&self, id: &FeatureId) -> Result<Vec<FeatureId>> {
        let inner = self.lock().await;
        Ok(inner
            .node_map
            .get(id)
            .map(|&node| neighbours(&inner.graph, node, Direction::Incoming))
            .unwrap_or_default())
    }

    async fn list_edges(&self) -> Result<Vec<DependencyEdge>> {
        let inner = self.lock().await;
        let mut edges: Vec<DependencyEdge> = all_edges(&inner.graph).cloned().collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(edges)
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        // Nothing on disk to reload from
        Ok(())
    }
}
