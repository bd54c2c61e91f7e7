//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use featuregate::domain::{FeatureId, FeatureType, NewFeature};
use featuregate::engine::GraphEngine;
use featuregate::storage::{StorageBackend, create_storage};
use std::path::Path;
use std::process::{Command, Output};

/// Run the featuregate binary in `dir` with colors off.
pub fn run_featuregate_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_featuregate"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute featuregate binary")
}

/// Stdout of a successful run, panicking with stderr otherwise.
pub fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// An engine over a fresh in-memory store.
pub async fn in_memory_engine() -> GraphEngine {
    let storage = create_storage(StorageBackend::InMemory, "flag".to_string())
        .await
        .expect("in-memory storage");
    GraphEngine::from_storage(storage)
}

/// Create a basic feature and return its ID.
pub async fn feature(engine: &GraphEngine, name: &str, enabled: bool) -> FeatureId {
    engine
        .create_feature(NewFeature::new(name, FeatureType::Basic, enabled))
        .await
        .expect("create feature")
        .id
}

/// Current enabled state of `id`.
pub async fn is_enabled(engine: &GraphEngine, id: &FeatureId) -> bool {
    engine.status(id).await.expect("status").enabled
}
