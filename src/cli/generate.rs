//! `depgen generate`

use anyhow::Result;
use clap::Args;

use super::common::{OutputFormat, ProjectOptions, finish};
use crate::dependency::{GenerationScope, WriteStrategy, generate};

/// Regenerate descriptor dependencies and run all validations.
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Report changes without writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Only module-set modules (and the validation rules)
    #[arg(long, conflicts_with = "plugins")]
    pub products: bool,

    /// Only plugins and their content modules
    #[arg(long)]
    pub plugins: bool,
}

impl GenerateCommand {
    fn scope(&self) -> GenerationScope {
        if self.products {
            GenerationScope::Products
        } else if self.plugins {
            GenerationScope::Plugins
        } else {
            GenerationScope::All
        }
    }

    /// Run the command.
    pub async fn execute(self, options: &ProjectOptions) -> Result<()> {
        let strategy = if self.dry_run {
            WriteStrategy::DryRun
        } else {
            WriteStrategy::Apply
        };
        let ctx = options.load_context(strategy).await?;
        let report = generate(ctx, self.scope()).await?;
        finish(&report, self.format)
    }
}
