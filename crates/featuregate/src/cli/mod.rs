//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new featuregate repository
//! - `create`: Create a feature
//! - `show` / `list`: Inspect features
//! - `enable` / `disable`: Change state (disable cascades to gated features)
//! - `add-child` / `remove-child`: Edit the dependency graph
//! - `children` / `parents`: Inspect direct neighbours
//! - `delete`: Remove a feature with no remaining edges
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! featuregate create --name checkout --type basic --enabled
//! featuregate add-child flag-a3f8 flag-9z0q
//! featuregate disable flag-a3f8
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{CreateArgs, EdgeArgs, FeatureArgs, InitArgs, ListArgs};
pub use types::FeatureTypeArg;
pub use validators::{validate_feature_id, validate_name, validate_prefix};

/// Featuregate - feature flags with parent/child gating
///
/// Features live in `.featuregate/features.jsonl`. A parent feature gates its
/// children: disabling it disables them, and they can't be enabled while it
/// is off.
#[derive(Parser, Debug)]
#[command(name = "featuregate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new featuregate repository
    ///
    /// Creates `.featuregate/` with a config file and an empty data file.
    Init(InitArgs),

    /// Create a new feature
    Create(CreateArgs),

    /// Show one feature
    Show(FeatureArgs),

    /// List features
    List(ListArgs),

    /// Enable a feature
    ///
    /// Fails if any direct parent is disabled. Children are not touched.
    Enable(FeatureArgs),

    /// Disable a feature and everything it gates
    Disable(FeatureArgs),

    /// Make CHILD depend on PARENT
    ///
    /// Rejected if it would create a cycle.
    AddChild(EdgeArgs),

    /// Remove the PARENT -> CHILD dependency
    RemoveChild(EdgeArgs),

    /// List the features directly gated by a feature
    Children(FeatureArgs),

    /// List the features directly gating a feature
    Parents(FeatureArgs),

    /// Delete a feature
    ///
    /// Remove its dependencies first.
    Delete(FeatureArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Featuregate feature flag manager");
            println!("Use --help for more information");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(args, output_mode).await;
        }

        let app = App::from_directory(&std::env::current_dir()?).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Create(args) => execute::execute_create(&app, args, output_mode).await,
            Commands::Show(args) => execute::execute_show(&app, args, output_mode).await,
            Commands::List(args) => execute::execute_list(&app, args, output_mode).await,
            Commands::Enable(args) => execute::execute_enable(&app, args, output_mode).await,
            Commands::Disable(args) => execute::execute_disable(&app, args, output_mode).await,
            Commands::AddChild(args) => execute::execute_add_child(&app, args, output_mode).await,
            Commands::RemoveChild(args) => {
                execute::execute_remove_child(&app, args, output_mode).await
            }
            Commands::Children(args) => execute::execute_children(&app, args, output_mode).await,
            Commands::Parents(args) => execute::execute_parents(&app, args, output_mode).await,
            Commands::Delete(args) => execute::execute_delete(&app, args, output_mode).await,
        }
    }
}
