//! Graph queries over the in-memory dependency graph.
//!
//! These are store-side helpers: neighbour lookups for the trait methods and
//! a reachability check used only while loading files from disk. The
//! engine's own cycle detection goes through the `DependencyStore` trait.

use crate::domain::{DependencyEdge, FeatureId};
use petgraph::Direction;
use petgraph::algo;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

type FeatureGraph = StableDiGraph<FeatureId, DependencyEdge>;

/// Neighbours of `node` in `direction`, ordered by edge creation time.
///
/// `Outgoing` yields children, `Incoming` yields parents.
pub(super) fn neighbours(graph: &FeatureGraph, node: NodeIndex, direction: Direction) -> Vec<FeatureId> {
    let mut edges: Vec<&DependencyEdge> = graph
        .edges_directed(node, direction)
        .map(|edge| edge.weight())
        .collect();
    edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    edges
        .into_iter()
        .map(|edge| match direction {
            Direction::Outgoing => edge.child_id.clone(),
            Direction::Incoming => edge.parent_id.clone(),
        })
        .collect()
}

/// Number of edges touching `node` in either direction
pub(super) fn incident_edge_count(graph: &FeatureGraph, node: NodeIndex) -> usize {
    graph.edges_directed(node, Direction::Outgoing).count()
        + graph.edges_directed(node, Direction::Incoming).count()
}

/// Whether a directed path `from -> ... -> to` already exists.
///
/// Adding the edge `to -> from` would then close a cycle.
pub(super) fn has_path(graph: &FeatureGraph, from: NodeIndex, to: NodeIndex) -> bool {
    algo::has_path_connecting(graph, from, to, None)
}

/// Iterate over every stored edge record
pub(super) fn all_edges(graph: &FeatureGraph) -> impl Iterator<Item = &DependencyEdge> {
    graph.edge_indices().filter_map(|index| graph.edge_weight(index))
}
