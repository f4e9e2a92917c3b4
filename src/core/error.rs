//! Error handling for depgen
//!
//! Two layers, mirroring how the CLI reports failures:
//! - [`DepgenError`] - strongly-typed failures raised by the pipeline
//! - [`ErrorContext`] - a wrapper adding user-facing details and suggestions
//!
//! Errors are split into *fatal* ones, which abort a generation run (a cycle in
//! the module-set graph, a module the build graph does not know), and
//! everything else, which is collected into the run report without cancelling
//! sibling jobs. See [`DepgenError::is_fatal`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use depgen_cli::core::{DepgenError, ErrorContext};
//!
//! let context = ErrorContext::new(DepgenError::ModuleNotFound {
//!     name: "intellij.platform.core".to_string(),
//! })
//! .with_suggestion("Check that the module has a module.toml under the project root");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The main error type for depgen operations.
#[derive(Error, Debug)]
pub enum DepgenError {
    /// A module set (transitively) includes itself.
    ///
    /// # Fields
    /// - `chain`: The module-set chain closing the cycle, e.g. `a → b → a`
    #[error("Circular module set inclusion detected: {chain}")]
    ModuleSetCycle {
        /// String representation of the cycle
        chain: String,
    },

    /// A module set references a child set that is not defined.
    #[error("Module set '{parent}' includes undefined module set '{name}'")]
    UnknownModuleSet {
        /// The set holding the dangling reference
        parent: String,
        /// The undefined set name
        name: String,
    },

    /// The build graph has no module with this name.
    ///
    /// Raised when a module set, plugin or product references a module that
    /// no `module.toml` declares. Generation cannot compute dependencies for
    /// it, so the run is aborted.
    #[error("Module '{name}' is not part of the build graph")]
    ModuleNotFound {
        /// Name of the missing module
        name: String,
    },

    /// Two build files declare the same module name.
    #[error("Module '{name}' is declared twice: {first} and {second}")]
    DuplicateModule {
        /// Module name declared twice
        name: String,
        /// First declaring file
        first: String,
        /// Second declaring file
        second: String,
    },

    /// Project configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was probed
        path: String,
    },

    /// Project configuration could not be parsed or is inconsistent
    #[error("Invalid configuration in {file}: {reason}")]
    ConfigParseError {
        /// Configuration file
        file: String,
        /// What is wrong with it
        reason: String,
    },

    /// A module build file could not be parsed
    #[error("Invalid build file {file}: {reason}")]
    BuildFileParseError {
        /// Path to the `module.toml`
        file: String,
        /// Parser message
        reason: String,
    },

    /// A descriptor's dependency block could not be placed.
    #[error("Cannot rewrite descriptor dependencies: {reason}")]
    DescriptorRewriteError {
        /// What is missing from the descriptor
        reason: String,
    },

    /// File system error
    #[error("File system error: {operation} ({path})")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the error occurred
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Format-preserving TOML parsing error
    #[error("TOML document error: {0}")]
    TomlEditError(#[from] toml_edit::TomlError),

    /// A failure memoized by an [`AsyncCache`](crate::dependency::AsyncCache)
    /// and observed by another caller.
    #[error(transparent)]
    Cached(#[from] Arc<DepgenError>),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl DepgenError {
    /// Whether this failure aborts the whole generation run.
    ///
    /// Cached failures are classified by the error they wrap.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ModuleSetCycle {
                ..
            }
            | Self::UnknownModuleSet {
                ..
            }
            | Self::ModuleNotFound {
                ..
            }
            | Self::DuplicateModule {
                ..
            }
            | Self::ConfigNotFound {
                ..
            }
            | Self::ConfigParseError {
                ..
            } => true,
            Self::Cached(inner) => inner.is_fatal(),
            _ => false,
        }
    }

    /// Shorthand for [`DepgenError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Error wrapper carrying user-facing details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error, rendered as text
    pub error: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`DepgenError`]
    #[must_use]
    pub fn new(error: DepgenError) -> Self {
        Self {
            error: error.to_string(),
            suggestion: None,
            details: None,
        }
    }

    /// Create a context from an arbitrary message
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

fn create_error_context(error: &DepgenError) -> ErrorContext {
    match error {
        DepgenError::ModuleSetCycle {
            ..
        } => ErrorContext::from_message(error.to_string())
            .with_suggestion("Remove one of the nested module-set references forming the cycle")
            .with_details("Module sets must form an acyclic graph rooted at product entry points"),
        DepgenError::UnknownModuleSet {
            ..
        } => ErrorContext::from_message(error.to_string())
            .with_suggestion("Define the module set in depgen.toml or fix the reference"),
        DepgenError::ModuleNotFound {
            ..
        } => ErrorContext::from_message(error.to_string())
            .with_suggestion("Check that a module.toml declaring this module exists under the project root")
            .with_details("Every module referenced by a module set, plugin or product must be in the build graph"),
        DepgenError::DuplicateModule {
            ..
        } => ErrorContext::from_message(error.to_string())
            .with_suggestion("Rename or remove one of the module.toml files"),
        DepgenError::ConfigNotFound {
            ..
        } => ErrorContext::from_message(error.to_string())
            .with_suggestion("Run depgen from the project root or pass --project/--config")
            .with_details("depgen reads module sets, plugins and products from depgen.toml"),
        DepgenError::ConfigParseError {
            ..
        } => ErrorContext::from_message(error.to_string())
            .with_suggestion("Check depgen.toml for syntax errors and unknown keys"),
        DepgenError::Cached(inner) => create_error_context(inner),
        _ => ErrorContext::from_message(error.to_string()),
    }
}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// [`DepgenError`]s anywhere in the `anyhow` chain get tailored suggestions;
/// everything else is rendered with its full context chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(depgen_error) = cause.downcast_ref::<DepgenError>() {
            let mut ctx = create_error_context(depgen_error);
            if cause.to_string() != error.to_string() {
                ctx.error = format!("{error}: {}", ctx.error);
            }
            return ctx;
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::from_message(error.to_string())
            .with_suggestion("Check file ownership and permissions of the project tree");
    }

    ErrorContext::from_message(format!("{error:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(
            DepgenError::ModuleSetCycle {
                chain: "a → b → a".to_string()
            }
            .is_fatal()
        );
        assert!(
            DepgenError::ModuleNotFound {
                name: "m".to_string()
            }
            .is_fatal()
        );
        assert!(!DepgenError::other("boom").is_fatal());

        let cached = DepgenError::Cached(Arc::new(DepgenError::ModuleNotFound {
            name: "m".to_string(),
        }));
        assert!(cached.is_fatal());
    }

    #[test]
    fn test_cached_error_is_transparent() {
        let inner = Arc::new(DepgenError::ModuleNotFound {
            name: "intellij.core".to_string(),
        });
        let err: DepgenError = inner.into();
        assert_eq!(err.to_string(), "Module 'intellij.core' is not part of the build graph");
    }

    #[test]
    fn test_user_friendly_error_finds_nested_cause() {
        let err = anyhow::Error::new(DepgenError::UnknownModuleSet {
            parent: "core".to_string(),
            name: "missing".to_string(),
        })
        .context("Failed to build module-set index");

        let ctx = user_friendly_error(err);
        assert!(ctx.error.contains("undefined module set 'missing'"));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::from_message("broken")
            .with_details("why")
            .with_suggestion("fix it");
        assert_eq!(ctx.to_string(), "broken\nDetails: why\nSuggestion: fix it");
    }
}
