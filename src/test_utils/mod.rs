//! Test utilities for depgen
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`init_test_logging`] - one-time tracing setup with a test writer
//! - [`ProjectFixture`] - a temporary project with build files, descriptors
//!   and a `depgen.toml`
//!
//! # Example
//!
//! ```rust,no_run
//! use depgen_cli::test_utils::ProjectFixture;
//!
//! let project = ProjectFixture::new().unwrap();
//! project.module("intellij.core", &["intellij.util"]).unwrap();
//! project.descriptor("intellij.core", ProjectFixture::EMPTY_DESCRIPTOR).unwrap();
//! ```

pub mod fixtures;

pub use fixtures::ProjectFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `None`, logging is enabled only
/// when `RUST_LOG` is set.
///
/// ```bash
/// RUST_LOG=dependency=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
