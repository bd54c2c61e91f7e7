//! JSONL persistence for in-memory storage.
//!
//! The data file holds one tagged record per line:
//!
//! ```text
//! {"record":"feature","id":"flag-a3f8","name":"search","type":"basic","enabled":true,...}
//! {"record":"dependency","id":"dep-k2p1","parent_id":"flag-a3f8","child_id":"flag-9z0q",...}
//! ```
//!
//! Features are always written before edges so a reader can resolve edge
//! endpoints in a single pass over the edges.

use super::InMemoryStorage;
use super::graph::has_path;
use super::inner::InMemoryStorageInner;
use crate::domain::{DependencyEdge, Feature, FeatureId};
use crate::error::{Error, Result, StorageError};
use crate::storage::{DependencyStore, FeatureStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// One line of the data file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Feature(Feature),
    Dependency(DependencyEdge),
}

/// Non-fatal problems found while loading a data file.
///
/// Loading continues past each of these; the offending line or edge is
/// skipped so the rest of the graph stays usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line is not a valid record and was skipped.
    MalformedJson {
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Feature record failed validation and was skipped.
    InvalidFeature {
        /// ID carried by the record
        feature_id: FeatureId,
        /// 1-based line number
        line_number: usize,
        /// Validation message
        error: String,
    },

    /// A second record reused an existing feature ID; the later one was skipped.
    DuplicateFeature {
        /// Reused ID
        feature_id: FeatureId,
        /// 1-based line number of the skipped record
        line_number: usize,
    },

    /// Edge references a feature that isn't in the file.
    OrphanedDependency {
        /// Parent endpoint
        parent: FeatureId,
        /// Child endpoint
        child: FeatureId,
    },

    /// The same (parent, child) pair appeared twice; the later one was skipped.
    DuplicateDependency {
        /// Parent endpoint
        parent: FeatureId,
        /// Child endpoint
        child: FeatureId,
    },

    /// Edge would close a cycle (including self edges) and was skipped.
    CircularDependency {
        /// Parent endpoint
        parent: FeatureId,
        /// Child endpoint
        child: FeatureId,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed record skipped ({error})")
            }
            Self::InvalidFeature {
                feature_id,
                line_number,
                error,
            } => write!(f, "line {line_number}: invalid feature {feature_id} skipped ({error})"),
            Self::DuplicateFeature {
                feature_id,
                line_number,
            } => write!(f, "line {line_number}: duplicate feature {feature_id} skipped"),
            Self::OrphanedDependency { parent, child } => {
                write!(f, "orphaned dependency {parent} -> {child} skipped")
            }
            Self::DuplicateDependency { parent, child } => {
                write!(f, "duplicate dependency {parent} -> {child} skipped")
            }
            Self::CircularDependency { parent, child } => {
                write!(f, "circular dependency {parent} -> {child} skipped")
            }
        }
    }
}

/// Load a store from a JSONL file.
///
/// # Error Handling
///
/// Bad lines and bad edges become [`LoadWarning`]s rather than errors. Only
/// I/O failures abort the load.
///
/// # Returns
///
/// The populated store and every warning encountered, in file order.
pub async fn load_from_jsonl(
    path: &Path,
    prefix: String,
) -> Result<(InMemoryStorage, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut warnings = Vec::new();
    let mut features = Vec::new();
    let mut edges = Vec::new();
    let mut line_number = 0;

    // First pass: parse every line
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Record>(&line) {
            Ok(Record::Feature(feature)) => features.push((line_number, feature)),
            Ok(Record::Dependency(edge)) => edges.push(edge),
            Err(e) => warnings.push(LoadWarning::MalformedJson {
                line_number,
                error: e.to_string(),
            }),
        }
    }

    let mut inner = InMemoryStorageInner::new(prefix);

    // Second pass: features
    for (line_number, feature) in features {
        if let Err(error) = feature.validate() {
            warnings.push(LoadWarning::InvalidFeature {
                feature_id: feature.id.clone(),
                line_number,
                error,
            });
            continue;
        }
        if inner.features.contains_key(&feature.id) {
            warnings.push(LoadWarning::DuplicateFeature {
                feature_id: feature.id.clone(),
                line_number,
            });
            continue;
        }
        inner.insert_feature(feature);
    }

    // Third pass: edges, keeping the graph acyclic
    let mut seen = HashSet::new();
    for edge in edges {
        let parent = edge.parent_id.clone();
        let child = edge.child_id.clone();

        let (Some(&parent_node), Some(&child_node)) =
            (inner.node_map.get(&parent), inner.node_map.get(&child))
        else {
            warnings.push(LoadWarning::OrphanedDependency { parent, child });
            continue;
        };

        if !seen.insert((parent.clone(), child.clone())) {
            warnings.push(LoadWarning::DuplicateDependency { parent, child });
            continue;
        }

        if has_path(&inner.graph, child_node, parent_node) {
            warnings.push(LoadWarning::CircularDependency { parent, child });
            continue;
        }

        inner.insert_edge(edge)?;
    }

    Ok((InMemoryStorage::from_inner(inner), warnings))
}

/// Save a store to a JSONL file with an atomic write.
///
/// Writes to `<path>.tmp` and renames it over `path`, so an interrupted save
/// leaves the previous file intact. Records are sorted by creation time so
/// repeated saves of the same state produce identical files.
pub async fn save_to_jsonl<S>(storage: &S, path: &Path) -> Result<()>
where
    S: FeatureStore + DependencyStore + ?Sized,
{
    let temp_path = path.with_extension("tmp");

    let features = storage.list_features().await?;
    let edges = storage.list_edges().await?;

    let file = File::create(&temp_path).await.map_err(Error::Io)?;
    let mut writer = BufWriter::new(file);

    let records = features
        .into_iter()
        .map(Record::Feature)
        .chain(edges.into_iter().map(Record::Dependency));

    for record in records {
        let json = serde_json::to_string(&record).map_err(StorageError::Serialization)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    tokio::fs::rename(&temp_path, path).await?;

    Ok(())
}
