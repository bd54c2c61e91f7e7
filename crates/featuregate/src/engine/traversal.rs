//! Graph walks shared by the engine operations.
//!
//! Both walks read the graph through the store traits on every step. Nothing
//! here caches edges between calls.

use crate::domain::{Feature, FeatureId};
use crate::error::{Error, Result};
use crate::storage::{DependencyStore, FeatureStore};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Fetch a feature or fail with `FeatureNotFound`.
pub(super) async fn require_feature(features: &dyn FeatureStore, id: &FeatureId) -> Result<Feature> {
    features
        .get_feature(id)
        .await?
        .ok_or_else(|| Error::FeatureNotFound(id.clone()))
}

/// Whether `target` is reachable from `start` by following child edges.
///
/// Depth-first with an explicit stack, so deep graphs cannot overflow the
/// call stack. The visited set bounds the walk to O(V + E) store calls and
/// returns as soon as `target` is seen.
pub(super) async fn reaches(
    dependencies: &dyn DependencyStore,
    start: &FeatureId,
    target: &FeatureId,
) -> Result<bool> {
    let mut stack = vec![start.clone()];
    let mut visited = HashSet::new();

    while let Some(current) = stack.pop() {
        if &current == target {
            return Ok(true);
        }
        if !visited.insert(current.clone()) {
            continue;
        }

        let children = dependencies.children_of(&current).await?;
        stack.extend(
            children
                .into_iter()
                .rev()
                .filter(|child| !visited.contains(child)),
        );
    }

    debug!(%start, %target, visited = visited.len(), "No path found");
    Ok(false)
}

/// Enabled features reachable from `start` (inclusive), in BFS order.
///
/// A feature that is already disabled is left out of the result, but its
/// children are still explored: a descendant may be enabled and reachable
/// only through it. Any lookup failure aborts the walk.
pub(super) async fn cascade_set(
    features: &dyn FeatureStore,
    dependencies: &dyn DependencyStore,
    start: &FeatureId,
) -> Result<Vec<Feature>> {
    let mut queue = VecDeque::from([start.clone()]);
    let mut visited = HashSet::new();
    let mut to_disable = Vec::new();

    while let Some(current) = queue.pop_front() {
        // The graph is acyclic, but fan-in nodes would otherwise be
        // fetched once per incoming path.
        if !visited.insert(current.clone()) {
            continue;
        }

        let feature = require_feature(features, &current).await?;
        if feature.enabled {
            to_disable.push(feature);
        } else {
            debug!(id = %current, "Already disabled, still exploring its children");
        }

        queue.extend(dependencies.children_of(&current).await?);
    }

    Ok(to_disable)
}
