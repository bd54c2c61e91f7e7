//! Domain types for feature flags and their dependency edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a feature name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// Unique identifier for a feature.
///
/// Identifiers are opaque to the engine and are only ever minted by a
/// feature store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub String);

impl FeatureId {
    /// Create a new feature ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FeatureId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyId(pub String);

impl DependencyId {
    /// Create a new dependency ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commercial tier of a feature.
///
/// Carried as metadata only; the dependency engine never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    /// Available to every account
    Basic,

    /// Paid tier
    Premium,

    /// Enterprise contracts
    Enterprise,
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Premium => write!(f, "premium"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!(
                "Invalid feature type '{other}'. Valid types: basic, premium, enterprise"
            )),
        }
    }
}

/// A feature flag record as persisted by a feature store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique identifier, assigned at creation
    pub id: FeatureId,

    /// Display name (not required to be unique)
    pub name: String,

    /// Commercial tier
    #[serde(rename = "type")]
    pub feature_type: FeatureType,

    /// Whether the feature is currently on
    pub enabled: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    /// Validate a persisted record.
    ///
    /// Used when loading records from disk, where a hand-edited file may
    /// carry data the CLI would never have accepted.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("Feature ID cannot be empty".to_string());
        }
        validate_name(&self.name)?;
        if self.updated_at < self.created_at {
            return Err(format!(
                "updated_at ({}) is earlier than created_at ({})",
                self.updated_at, self.created_at
            ));
        }
        Ok(())
    }
}

/// Data for creating a new feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeature {
    /// Display name
    pub name: String,

    /// Commercial tier
    pub feature_type: FeatureType,

    /// Initial state
    pub enabled: bool,
}

impl NewFeature {
    /// Convenience constructor
    pub fn new(name: impl Into<String>, feature_type: FeatureType, enabled: bool) -> Self {
        Self {
            name: name.into(),
            feature_type,
            enabled,
        }
    }

    /// Validate the data before it reaches a store.
    ///
    /// Stores **must** call this from `create` so every backend applies the
    /// same rules.
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Feature name cannot be empty".to_string());
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(format!(
            "Feature name cannot exceed {MAX_NAME_LENGTH} characters (got {len})"
        ));
    }
    Ok(())
}

/// A directed "parent gates child" edge.
///
/// The child may only be enabled while the parent is enabled, and disabling
/// the parent disables the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Unique identifier of the edge
    pub id: DependencyId,

    /// The gating feature
    pub parent_id: FeatureId,

    /// The gated feature
    pub child_id: FeatureId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp (edges are never mutated, so equal to `created_at`)
    pub updated_at: DateTime<Utc>,
}
