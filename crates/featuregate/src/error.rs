//! Error types for featuregate operations.

use crate::domain::FeatureId;
use crate::id_generation::IdGenerationError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The error type for featuregate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A feature was asked to gate itself.
    #[error("Feature {0} cannot be its own child")]
    SelfReference(FeatureId),

    /// The child can already reach the parent, so the edge would close a loop.
    #[error("Cyclic dependency: {child} already gates {parent}, cannot add {parent} -> {child}")]
    CyclicDependency {
        /// Prospective parent
        parent: FeatureId,
        /// Prospective child
        child: FeatureId,
    },

    /// The (parent, child) edge is already stored.
    #[error("Dependency already exists: {parent} -> {child}")]
    DuplicateEdge {
        /// Parent of the existing edge
        parent: FeatureId,
        /// Child of the existing edge
        child: FeatureId,
    },

    /// A direct parent is disabled, so the feature may not be enabled.
    #[error("Cannot enable {feature}: parent feature {parent} is disabled")]
    ParentDisabled {
        /// Feature that was asked to be enabled
        feature: FeatureId,
        /// First disabled direct parent found
        parent: FeatureId,
    },

    /// Feature not found.
    #[error("Feature not found: {0}")]
    FeatureNotFound(FeatureId),

    /// Dependency edge not found.
    #[error("Dependency not found: {parent} -> {child}")]
    DependencyNotFound {
        /// Parent of the missing edge
        parent: FeatureId,
        /// Child of the missing edge
        child: FeatureId,
    },

    /// Cannot delete a feature that is still part of the dependency graph.
    #[error("Cannot delete {id}: {count} dependency edge(s) still reference it")]
    HasDependencies {
        /// Feature that was asked to be deleted
        id: FeatureId,
        /// Number of edges touching it
        count: usize,
    },

    /// Feature data failed validation.
    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    /// The operation did not finish within the configured deadline.
    #[error("Operation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Underlying store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The backend cannot be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// No unique identifier could be minted.
    #[error("ID generation failed: {0}")]
    IdGeneration(#[from] IdGenerationError),
}

/// Configuration and repository layout errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.featuregate/` directory was found.
    #[error("Not a featuregate repository (or any parent). Run 'featuregate init' first.")]
    NotInitialized,

    /// `init` was run where a repository already exists.
    #[error("Featuregate is already initialized. Found existing '{}'", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Invalid ID prefix.
    #[error("Invalid prefix: {0}")]
    InvalidPrefix(String),

    /// The config file could not be parsed or written.
    #[error("Configuration error: {0}")]
    Parse(String),

    /// Unrecognized storage backend name.
    #[error("Unknown storage backend '{0}'. Valid backends: memory, jsonl")]
    UnknownBackend(String),
}

/// Coarse category of an [`Error`].
///
/// Request layers translate these into their own response codes; the engine
/// itself never looks at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed (self reference, invalid data).
    InvalidRequest,
    /// The request conflicts with the current graph (cycle, duplicate, edges remain).
    Conflict,
    /// A referenced feature or edge does not exist.
    NotFound,
    /// A gating precondition is not met.
    Precondition,
    /// The store or deadline failed; the caller may retry.
    Unavailable,
    /// Anything else.
    Internal,
}

impl Error {
    /// Categorize this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SelfReference(_) | Self::InvalidFeature(_) | Self::Config(_) => {
                ErrorKind::InvalidRequest
            }
            Self::CyclicDependency { .. }
            | Self::DuplicateEdge { .. }
            | Self::HasDependencies { .. } => ErrorKind::Conflict,
            Self::FeatureNotFound(_) | Self::DependencyNotFound { .. } => ErrorKind::NotFound,
            Self::ParentDisabled { .. } => ErrorKind::Precondition,
            Self::DeadlineExceeded(_) | Self::Storage(StorageError::Unavailable(_)) => {
                ErrorKind::Unavailable
            }
            Self::Io(_) | Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

/// A specialized Result type for featuregate operations.
pub type Result<T> = std::result::Result<T, Error>;
