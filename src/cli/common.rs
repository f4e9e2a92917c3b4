//! Helpers shared by the subcommands.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::build_graph::BuildGraph;
use crate::config::ProjectConfig;
use crate::dependency::{GenerationContext, GenerationReport, WriteStrategy};

/// Report output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Coloured text grouped by category
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Where the project lives.
#[derive(Debug, Clone)]
pub struct ProjectOptions {
    /// Project root
    pub project: PathBuf,
    /// Explicit configuration file
    pub config: Option<PathBuf>,
}

impl ProjectOptions {
    /// Load configuration and build graph into a run context.
    pub async fn load_context(&self, strategy: WriteStrategy) -> Result<Arc<GenerationContext>> {
        let config_path = ProjectConfig::resolve_path(&self.project, self.config.as_deref());
        let config = ProjectConfig::load_from(&config_path).await?;
        let graph = BuildGraph::load(&self.project)
            .await
            .with_context(|| format!("Failed to load build graph from {}", self.project.display()))?;

        let ctx = GenerationContext::new(Arc::new(graph), Arc::new(config), strategy)
            .context("Failed to index module sets")?;
        Ok(Arc::new(ctx))
    }
}

/// Print a report and turn an unsuccessful run into an error.
pub fn finish(report: &GenerationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json().context("Failed to serialize report")?),
    }

    if report.is_success() {
        return Ok(());
    }
    anyhow::bail!(
        "Dependency validation failed: {} errors, {} failed jobs",
        report.errors.len(),
        report.failures.len()
    )
}
