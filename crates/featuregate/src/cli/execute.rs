//! Command execution logic.
//!
//! Each function runs one subcommand against an opened [`App`]. Commands that
//! change state call [`App::save`] before printing.

use anyhow::Result;

use super::args::{CreateArgs, EdgeArgs, FeatureArgs, InitArgs, ListArgs};
use crate::app::App;
use crate::domain::{FeatureId, NewFeature};
use crate::output::{self, OutputConfig, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.prefix.as_deref()).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "featuregate_dir": result.featuregate_dir.display().to_string(),
            "config_file": result.config_file.display().to_string(),
            "features_file": result.features_file.display().to_string(),
            "prefix": result.prefix,
        }))?,
        OutputMode::Text if !args.quiet => {
            println!("Initialized featuregate in {}", result.featuregate_dir.display());
            println!("  Config:    {}", result.config_file.display());
            println!("  Features:  {}", result.features_file.display());
            println!("  ID prefix: {}", result.prefix);
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// Execute the create command
pub async fn execute_create(app: &App, args: &CreateArgs, output_mode: OutputMode) -> Result<()> {
    let new_feature = NewFeature::new(args.name.clone(), args.feature_type.into(), args.enabled);
    let feature = app.engine().create_feature(new_feature).await?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&feature)?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!(
                "{} {} ({})",
                output::success("Created feature", config),
                feature.id,
                feature.name
            );
        }
    }
    Ok(())
}

/// Execute the show command
pub async fn execute_show(app: &App, args: &FeatureArgs, output_mode: OutputMode) -> Result<()> {
    let feature = app.engine().status(&FeatureId::new(args.id.clone())).await?;
    output::print_feature(&feature, output_mode)?;
    Ok(())
}

/// Execute the list command
pub async fn execute_list(app: &App, args: &ListArgs, output_mode: OutputMode) -> Result<()> {
    let mut features = app.engine().list_features().await?;
    if let Some(enabled) = args.state_filter() {
        features.retain(|f| f.enabled == enabled);
    }
    output::print_features(&features, output_mode)?;
    Ok(())
}

/// Execute the enable command
pub async fn execute_enable(app: &App, args: &FeatureArgs, output_mode: OutputMode) -> Result<()> {
    let feature = app.engine().enable(&FeatureId::new(args.id.clone())).await?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&feature)?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!("{} {}", output::success("Enabled", config), feature.id);
        }
    }
    Ok(())
}

/// Execute the disable command
pub async fn execute_disable(app: &App, args: &FeatureArgs, output_mode: OutputMode) -> Result<()> {
    let report = app.engine().disable(&FeatureId::new(args.id.clone())).await?;
    if !report.is_noop() {
        app.save().await?;
    }
    output::print_cascade_report(&report, output_mode)?;
    Ok(())
}

/// Execute the add-child command
pub async fn execute_add_child(app: &App, args: &EdgeArgs, output_mode: OutputMode) -> Result<()> {
    let parent = FeatureId::new(args.parent.clone());
    let child = FeatureId::new(args.child.clone());

    let edge = app.engine().add_child(&parent, &child).await?;
    app.save().await?;

    output::print_edge(&edge, output_mode)?;
    Ok(())
}

/// Execute the remove-child command
pub async fn execute_remove_child(
    app: &App,
    args: &EdgeArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let parent = FeatureId::new(args.parent.clone());
    let child = FeatureId::new(args.child.clone());

    app.engine().remove_child(&parent, &child).await?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "removed": { "parent_id": parent, "child_id": child }
        }))?,
        OutputMode::Text => println!("Removed dependency {parent} -> {child}"),
    }
    Ok(())
}

/// Execute the children command
pub async fn execute_children(app: &App, args: &FeatureArgs, output_mode: OutputMode) -> Result<()> {
    let children = app.engine().children(&FeatureId::new(args.id.clone())).await?;
    output::print_features(&children, output_mode)?;
    Ok(())
}

/// Execute the parents command
pub async fn execute_parents(app: &App, args: &FeatureArgs, output_mode: OutputMode) -> Result<()> {
    let parents = app.engine().parents(&FeatureId::new(args.id.clone())).await?;
    output::print_features(&parents, output_mode)?;
    Ok(())
}

/// Execute the delete command
pub async fn execute_delete(app: &App, args: &FeatureArgs, output_mode: OutputMode) -> Result<()> {
    let id = FeatureId::new(args.id.clone());
    app.engine().delete_feature(&id).await?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({ "deleted": id }))?,
        OutputMode::Text => println!("Deleted feature {id}"),
    }
    Ok(())
}
