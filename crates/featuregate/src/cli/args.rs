//! CLI argument structs for all commands.

use clap::Parser;

use super::types::FeatureTypeArg;
use super::validators::{validate_feature_id, validate_name, validate_prefix};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Feature ID prefix (e.g., "flag" for "flag-a3f8")
    ///
    /// Must be 2-20 alphanumeric characters.
    #[arg(short, long, value_parser = validate_prefix)]
    pub prefix: Option<String>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `create` command
#[derive(Parser, Debug, Clone)]
pub struct CreateArgs {
    /// Feature name (at most 200 characters)
    #[arg(short, long, value_parser = validate_name)]
    pub name: String,

    /// Commercial tier
    #[arg(short = 't', long = "type", value_enum, default_value = "basic")]
    pub feature_type: FeatureTypeArg,

    /// Create the feature enabled (features start disabled otherwise)
    #[arg(short, long)]
    pub enabled: bool,
}

/// Arguments for commands that act on one feature
#[derive(Parser, Debug, Clone)]
pub struct FeatureArgs {
    /// Feature ID (e.g., flag-a3f8)
    #[arg(value_parser = validate_feature_id)]
    pub id: String,
}

/// Arguments for commands that act on one dependency edge
#[derive(Parser, Debug, Clone)]
pub struct EdgeArgs {
    /// Gating feature
    #[arg(value_parser = validate_feature_id)]
    pub parent: String,

    /// Gated feature
    #[arg(value_parser = validate_feature_id)]
    pub child: String,
}

/// Arguments for the `list` command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Only show enabled features
    #[arg(long, conflicts_with = "disabled")]
    pub enabled: bool,

    /// Only show disabled features
    #[arg(long)]
    pub disabled: bool,
}

impl ListArgs {
    /// The state filter requested, if any
    pub fn state_filter(&self) -> Option<bool> {
        match (self.enabled, self.disabled) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
