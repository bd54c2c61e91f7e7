//! Featuregate CLI binary.

use anyhow::Result;
use featuregate::app::configured_log_filter;
use featuregate::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the featuregate CLI.
///
/// A current_thread runtime is enough: every command is a short sequence of
/// file reads and writes.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // RUST_LOG wins; otherwise use the repository's configured filter
    let fallback = configured_log_filter(&std::env::current_dir()?).await;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting featuregate CLI");
    cli.execute().await?;
    tracing::debug!("Featuregate CLI completed successfully");

    Ok(())
}
