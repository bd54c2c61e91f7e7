//! Featuregate - feature flags with a parent-gates-child dependency graph.
//!
//! A feature may gate other features. Disabling a feature disables everything
//! it transitively gates; enabling a feature requires every direct parent to
//! be enabled; edges are only accepted while the graph stays acyclic.
//!
//! The crate is split into:
//!
//! - [`domain`]: features, dependency edges and their identifiers
//! - [`storage`]: the `FeatureStore` / `DependencyStore` traits plus the
//!   in-memory and JSONL-backed implementations
//! - [`engine`]: the dependency graph engine operating over the stores
//! - [`cli`]: the command-line request layer used by the binary

#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod domain;
pub mod engine;
pub mod error;
pub mod id_generation;
pub mod output;
pub mod storage;
