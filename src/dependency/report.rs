//! Run results: per-file outcomes, validation errors and proposed diffs.
//!
//! Validation errors carry a stable suppression key (`kind:context`). Keys
//! are matched against the configured suppression set when the report is
//! finalized, never during generation, so suppressing an error cannot change
//! what gets written.

use colored::Colorize;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Write as _};
use std::path::PathBuf;

use super::write::FileStatus;
use crate::build_graph::DependencyScope;

/// Validation error kinds, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationCategory {
    /// A self-contained module set leaks outside its closure
    SelfContained,
    /// A dependency is unavailable in the product or plugin layout
    MissingTransitiveDependency,
    /// A library module exports a library with the wrong scope
    LibraryScope,
    /// A descriptor the parser could not understand
    NonStandardDescriptorRoot,
}

impl ValidationCategory {
    /// Prefix of suppression keys.
    pub fn key(self) -> &'static str {
        match self {
            Self::SelfContained => "self-contained",
            Self::MissingTransitiveDependency => "missing-transitive-dependency",
            Self::LibraryScope => "library-scope",
            Self::NonStandardDescriptorRoot => "non-standard-descriptor-root",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::SelfContained => "Self-contained module sets",
            Self::MissingTransitiveDependency => "Missing transitive dependencies",
            Self::LibraryScope => "Library dependency scopes",
            Self::NonStandardDescriptorRoot => "Non-standard descriptor roots",
        }
    }
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A non-fatal finding of a validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A module inside a self-contained set depends on something outside it.
    SelfContainedViolation {
        /// The self-contained set
        set: String,
        /// Module of the set holding the dependency
        module: String,
        /// The external dependency
        dependency: String,
    },
    /// A dependency that nothing in the layout provides.
    MissingTransitiveDependency {
        /// Product or plugin being validated
        context: String,
        /// Module depending on the missing one
        dependent: String,
        /// The unavailable module
        missing: String,
        /// Dependency path from the layout to the missing module
        chain: Vec<String>,
    },
    /// A library module exports a library with a non-compile scope.
    LibraryScopeViolation {
        /// The library module
        module: String,
        /// The library
        library: String,
        /// Its current scope
        scope: DependencyScope,
    },
    /// A descriptor whose root is not understood, although it contains
    /// dependency markup.
    NonStandardDescriptorRoot {
        /// Module owning the descriptor
        module: String,
        /// Descriptor path
        path: PathBuf,
        /// Root element found instead
        root: String,
    },
}

impl ValidationError {
    /// Error kind.
    pub fn category(&self) -> ValidationCategory {
        match self {
            Self::SelfContainedViolation {
                ..
            } => ValidationCategory::SelfContained,
            Self::MissingTransitiveDependency {
                ..
            } => ValidationCategory::MissingTransitiveDependency,
            Self::LibraryScopeViolation {
                ..
            } => ValidationCategory::LibraryScope,
            Self::NonStandardDescriptorRoot {
                ..
            } => ValidationCategory::NonStandardDescriptorRoot,
        }
    }

    /// Set, product, plugin or module the error was found in.
    pub fn context(&self) -> &str {
        match self {
            Self::SelfContainedViolation {
                set, ..
            } => set,
            Self::MissingTransitiveDependency {
                context, ..
            } => context,
            Self::LibraryScopeViolation {
                module, ..
            }
            | Self::NonStandardDescriptorRoot {
                module, ..
            } => module,
        }
    }

    /// Stable key matched against the suppression set.
    pub fn suppression_key(&self) -> String {
        let subject = match self {
            Self::MissingTransitiveDependency {
                dependent, ..
            } => dependent.as_str(),
            _ => self.context(),
        };
        format!("{}:{subject}", self.category().key())
    }

    /// Human-readable description.
    pub fn message(&self) -> String {
        match self {
            Self::SelfContainedViolation {
                set,
                module,
                dependency,
            } => format!(
                "Module set '{set}' is self-contained but '{module}' depends on '{dependency}' outside of it"
            ),
            Self::MissingTransitiveDependency {
                context,
                missing,
                chain,
                ..
            } => format!(
                "'{missing}' is not available in '{context}' (required via {})",
                chain.join(" → ")
            ),
            Self::LibraryScopeViolation {
                module,
                library,
                scope,
            } => format!("Library module '{module}' exports '{library}' with scope '{scope}' instead of 'compile'"),
            Self::NonStandardDescriptorRoot {
                module,
                path,
                root,
            } => format!(
                "Descriptor of '{module}' ({}) has root <{root}>; its dependencies could not be read",
                path.display()
            ),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationError", 4)?;
        state.serialize_field("category", &self.category())?;
        state.serialize_field("context", self.context())?;
        state.serialize_field("suppression_key", &self.suppression_key())?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}

/// Suppression keys of accepted validation errors.
#[derive(Debug, Clone, Default)]
pub struct SuppressionSet {
    keys: HashSet<String>,
}

impl SuppressionSet {
    /// Build from configured keys.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the error is suppressed.
    pub fn contains(&self, error: &ValidationError) -> bool {
        self.keys.contains(&error.suppression_key())
    }
}

/// Outcome of generating one descriptor or build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyFileResult {
    /// Module owning the file
    pub module_name: String,
    /// File path
    pub path: PathBuf,
    /// Write outcome
    pub status: FileStatus,
    /// Number of generated entries
    pub count: usize,
}

/// Outcome of generating one plugin and its content modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDependencyFileResult {
    /// Main module of the plugin
    pub plugin_module: String,
    /// The plugin.xml result; `None` for skipped or synthetic plugins
    pub plugin: Option<DependencyFileResult>,
    /// Content module descriptors, production and test
    pub content_modules: Vec<DependencyFileResult>,
}

/// A build file change that is reported but never applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposedDiff {
    /// Module owning the build file
    pub module: String,
    /// Build file path
    pub path: PathBuf,
    /// `-`/`+` line diff
    pub diff: String,
}

/// A non-fatal failure of a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// Module, plugin or rule the job worked on
    pub context: String,
    /// Error message
    pub message: String,
}

/// Aggregated result of a generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Module descriptors and build files
    pub files: Vec<DependencyFileResult>,
    /// Plugins with their content modules
    pub plugins: Vec<PluginDependencyFileResult>,
    /// Unsuppressed validation errors
    pub errors: Vec<ValidationError>,
    /// Validation errors matched by the suppression set
    pub suppressed: Vec<ValidationError>,
    /// Unapplied build file changes
    pub proposed_diffs: Vec<ProposedDiff>,
    /// Failed jobs
    pub failures: Vec<JobFailure>,
}

impl GenerationReport {
    /// Append another report.
    pub fn merge(&mut self, other: Self) {
        self.files.extend(other.files);
        self.plugins.extend(other.plugins);
        self.errors.extend(other.errors);
        self.suppressed.extend(other.suppressed);
        self.proposed_diffs.extend(other.proposed_diffs);
        self.failures.extend(other.failures);
    }

    /// Record a failed job.
    pub fn fail(&mut self, context: impl Into<String>, error: impl fmt::Display) {
        let context = context.into();
        tracing::warn!(target: "dependency", "{context}: {error}");
        self.failures.push(JobFailure {
            context,
            message: error.to_string(),
        });
    }

    /// Apply suppressions, then sort and deduplicate everything.
    ///
    /// Safe to call repeatedly, e.g. after merging finalized reports.
    pub fn finalize(&mut self, suppressions: &SuppressionSet) {
        let (suppressed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.errors).into_iter().partition(|e| suppressions.contains(e));
        self.errors = kept;
        self.suppressed.extend(suppressed);

        sort_errors(&mut self.errors);
        sort_errors(&mut self.suppressed);

        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        self.files.dedup();
        self.plugins.sort_by(|a, b| a.plugin_module.cmp(&b.plugin_module));
        self.plugins.dedup();
        for plugin in &mut self.plugins {
            plugin.content_modules.sort_by(|a, b| a.path.cmp(&b.path));
            plugin.content_modules.dedup();
        }
        self.proposed_diffs.sort_by(|a, b| a.path.cmp(&b.path));
        self.proposed_diffs.dedup();
        self.failures.sort_by(|a, b| (&a.context, &a.message).cmp(&(&b.context, &b.message)));
        self.failures.dedup();
    }

    /// Whether the run has no unsuppressed errors and no failed jobs.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.failures.is_empty()
    }

    /// Unsuppressed errors grouped by category.
    pub fn errors_by_category(&self) -> BTreeMap<ValidationCategory, Vec<&ValidationError>> {
        let mut grouped: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for error in &self.errors {
            grouped.entry(error.category()).or_default().push(error);
        }
        grouped
    }

    /// Every file result, plugin and content-module results included.
    pub fn all_files(&self) -> impl Iterator<Item = &DependencyFileResult> {
        self.files.iter().chain(
            self.plugins.iter().flat_map(|p| p.plugin.iter().chain(p.content_modules.iter())),
        )
    }

    /// Number of files with the given status.
    pub fn count_status(&self, status: FileStatus) -> usize {
        let mut paths: Vec<&PathBuf> =
            self.all_files().filter(|f| f.status == status).map(|f| &f.path).collect();
        paths.sort();
        paths.dedup();
        paths.len()
    }

    /// JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Coloured text rendering.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let mut changed: Vec<&DependencyFileResult> =
            self.all_files().filter(|f| f.status.is_change()).collect();
        changed.sort_by(|a, b| a.path.cmp(&b.path));
        changed.dedup_by(|a, b| a.path == b.path);

        let _ = writeln!(
            out,
            "{} {} updated, {} pending, {} unchanged",
            "Files:".bold(),
            self.count_status(FileStatus::Updated),
            self.count_status(FileStatus::WouldUpdate),
            self.count_status(FileStatus::Unchanged)
        );
        for file in changed {
            let status = match file.status {
                FileStatus::Updated => file.status.to_string().green(),
                _ => file.status.to_string().yellow(),
            };
            let _ = writeln!(
                out,
                "  {status} {} ({} dependencies) {}",
                file.module_name,
                file.count,
                file.path.display().to_string().dimmed()
            );
        }

        for (category, errors) in self.errors_by_category() {
            let _ = writeln!(out, "\n{} ({})", category.title().red().bold(), errors.len());
            for error in errors {
                let _ = writeln!(out, "  - {}", error.message());
                let _ = writeln!(out, "    {}", format!("suppress with: {}", error.suppression_key()).dimmed());
            }
        }

        if !self.suppressed.is_empty() {
            let _ = writeln!(out, "\n{} {}", "Suppressed errors:".yellow(), self.suppressed.len());
        }

        if !self.proposed_diffs.is_empty() {
            let _ = writeln!(out, "\n{}", "Proposed changes (not applied):".cyan().bold());
            for diff in &self.proposed_diffs {
                let _ = writeln!(out, "  {} {}", diff.module, diff.path.display().to_string().dimmed());
                for line in diff.diff.lines() {
                    let line = if line.starts_with('-') { line.red() } else { line.green() };
                    let _ = writeln!(out, "    {line}");
                }
            }
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "\n{}", "Failed jobs:".red().bold());
            for failure in &self.failures {
                let _ = writeln!(out, "  {}: {}", failure.context, failure.message);
            }
        }

        out
    }
}

fn sort_errors(errors: &mut Vec<ValidationError>) {
    errors.sort_by_cached_key(|e| (e.category(), e.suppression_key(), e.message()));
    errors.dedup();
}
