//! `depgen validate`: a dry-run generation that fails on any error.

use anyhow::Result;
use clap::Args;

use super::common::{OutputFormat, ProjectOptions, finish};
use crate::dependency::{GenerationScope, WriteStrategy, generate};

/// Validate without writing anything.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl ValidateCommand {
    /// Run the command.
    pub async fn execute(self, options: &ProjectOptions) -> Result<()> {
        let ctx = options.load_context(WriteStrategy::DryRun).await?;
        let report = generate(ctx, GenerationScope::All).await?;
        finish(&report, self.format)
    }
}
