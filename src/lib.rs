//! depgen: dependency generation and validation for modular products.
//!
//! A large product is assembled from hundreds of modules grouped into nested
//! module sets. Each module (or plugin) declares in an XML descriptor which
//! other modules it needs at runtime. Keeping these lists by hand breaks
//! silently when a *transitive* dependency is not bundled. depgen
//!
//! - computes each descriptor's dependency list from the build graph,
//! - rewrites the descriptors,
//! - validates that every product bundles everything its modules and
//!   plugins reach, however indirectly.
//!
//! # Layout
//!
//! - [`build_graph`] - `module.toml` discovery and the [`build_graph::ModuleOutputProvider`] trait
//! - [`descriptor`] - reading and rewriting descriptor dependency blocks
//! - [`dependency`] - caches, generators and validation rules
//! - [`config`] - `depgen.toml`
//! - [`cli`] - the `depgen` command
//!
//! # Example
//!
//! ```rust,no_run
//! use depgen_cli::build_graph::BuildGraph;
//! use depgen_cli::config::ProjectConfig;
//! use depgen_cli::dependency::{GenerationContext, GenerationScope, WriteStrategy, generate};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let root = Path::new(".");
//! let config = ProjectConfig::load_from(&root.join("depgen.toml")).await?;
//! let graph = BuildGraph::load(root).await?;
//! let ctx = GenerationContext::new(Arc::new(graph), Arc::new(config), WriteStrategy::DryRun)?;
//!
//! let report = generate(Arc::new(ctx), GenerationScope::All).await?;
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod dependency;

// Collaborators of the pipeline
pub mod build_graph;
pub mod descriptor;

// Supporting modules
pub mod models;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
