//! Output formatting for CLI commands.
//!
//! Every printer takes an [`OutputMode`]: human-readable colored text, or
//! pretty JSON for scripts.
//!
//! Colors honour `NO_COLOR` and `FEATUREGATE_COLOR=0`.

use crate::domain::{DependencyEdge, Feature, FeatureType};
use crate::engine::CascadeReport;
use colored::Colorize;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

/// Output format selected by the global `--json` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Settings that control text rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Read color preferences from the environment.
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("FEATUREGATE_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }

    /// Plain text, no escapes. Used by tests and piped output.
    pub fn plain() -> Self {
        Self { use_colors: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

fn paint(text: &str, config: OutputConfig, style: fn(&str) -> colored::ColoredString) -> String {
    if config.use_colors {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn colorize_id(id: &str, config: OutputConfig) -> String {
    paint(id, config, |s| s.cyan())
}

fn colorize_state(enabled: bool, config: OutputConfig) -> String {
    if enabled {
        paint("enabled", config, |s| s.green())
    } else {
        paint("disabled", config, |s| s.red())
    }
}

fn colorize_type(feature_type: FeatureType, config: OutputConfig) -> String {
    let text = feature_type.to_string();
    match feature_type {
        FeatureType::Basic => text,
        FeatureType::Premium => paint(&text, config, |s| s.yellow()),
        FeatureType::Enterprise => paint(&text, config, |s| s.magenta()),
    }
}

fn dimmed(text: &str, config: OutputConfig) -> String {
    paint(text, config, |s| s.dimmed())
}

/// Apply the semantic "success" color (green).
pub fn success(text: &str, config: OutputConfig) -> String {
    paint(text, config, |s| s.green())
}

/// Apply the semantic "warning" color (yellow).
pub fn warning(text: &str, config: OutputConfig) -> String {
    paint(text, config, |s| s.yellow())
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

/// Print a single feature with all fields.
pub fn print_feature(feature: &Feature, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_feature_details(&mut handle, feature, OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, feature),
    }
}

/// Print features one per line.
pub fn print_features(features: &[Feature], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_feature_lines(&mut handle, features, OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, &features),
    }
}

/// Print the result of a cascading disable.
pub fn print_cascade_report(report: &CascadeReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_cascade_report(&mut handle, report, OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, report),
    }
}

/// Print a newly added dependency edge.
pub fn print_edge(edge: &DependencyEdge, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            writeln!(
                handle,
                "{} {} {} {}",
                success("Added dependency", config),
                colorize_id(edge.parent_id.as_str(), config),
                dimmed("->", config),
                colorize_id(edge.child_id.as_str(), config),
            )
        }
        OutputMode::Json => write_json(&mut handle, edge),
    }
}

fn write_feature_line<W: Write>(
    w: &mut W,
    feature: &Feature,
    config: OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} [{}] {} {}",
        colorize_id(feature.id.as_str(), config),
        colorize_state(feature.enabled, config),
        colorize_type(feature.feature_type, config),
        feature.name,
    )
}

fn write_feature_lines<W: Write>(
    w: &mut W,
    features: &[Feature],
    config: OutputConfig,
) -> io::Result<()> {
    if features.is_empty() {
        return writeln!(w, "{}", dimmed("No features found.", config));
    }
    for feature in features {
        write_feature_line(w, feature, config)?;
    }
    Ok(())
}

fn write_feature_details<W: Write>(
    w: &mut W,
    feature: &Feature,
    config: OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{}: {}",
        colorize_id(feature.id.as_str(), config),
        paint(&feature.name, config, |s| s.bold())
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Type:   ", config),
        colorize_type(feature.feature_type, config)
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("State:  ", config),
        colorize_state(feature.enabled, config)
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Created:", config),
        feature.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Updated:", config),
        feature.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn write_cascade_report<W: Write>(
    w: &mut W,
    report: &CascadeReport,
    config: OutputConfig,
) -> io::Result<()> {
    if report.is_noop() {
        return writeln!(
            w,
            "{} {}",
            colorize_id(report.root.as_str(), config),
            dimmed("and everything it gates were already disabled", config)
        );
    }

    writeln!(
        w,
        "{} {} feature(s):",
        warning("Disabled", config),
        report.disabled.len()
    )?;
    for feature in &report.disabled {
        writeln!(w, "  {} {}", colorize_id(feature.id.as_str(), config), feature.name)?;
    }
    Ok(())
}
