//! Command-line interface for depgen.
//!
//! ```bash
//! depgen generate               # rewrite descriptors and validate
//! depgen generate --dry-run     # report what would change
//! depgen validate --format json # CI check, exit code 1 on errors
//! depgen --project ../ultimate --verbose generate --plugins
//! ```
//!
//! Global options select the project and log verbosity; `RUST_LOG` overrides
//! the log filter entirely.

mod common;
mod generate;
mod validate;


pub use common::OutputFormat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Generates and validates module descriptor dependencies.
#[derive(Parser, Debug)]
#[command(
    name = "depgen",
    about = "Generate and validate module descriptor dependencies",
    version,
    long_about = "depgen computes the runtime dependencies of modules and plugins from the build graph, \
                  rewrites their descriptors and checks that every product bundles what its modules need."
)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Path to depgen.toml (defaults to `<project>/depgen.toml`, or `DEPGEN_CONFIG`)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Regenerate descriptor dependencies and run all validations
    Generate(generate::GenerateCommand),

    /// Validate without writing anything
    Validate(validate::ValidateCommand),
}

impl Cli {
    /// Log filter derived from the verbosity flags.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_filter()));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).try_init();
    }

    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let project = match self.project {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let options = common::ProjectOptions {
            project,
            config: self.config,
        };

        match self.command {
            Commands::Generate(cmd) => cmd.execute(&options).await,
            Commands::Validate(cmd) => cmd.execute(&options).await,
        }
    }
}
