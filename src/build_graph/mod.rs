//! Build graph: which modules exist, where their resources live, and what
//! they depend on.
//!
//! Every `module.toml` below the project root declares one module:
//!
//! ```toml
//! name = "intellij.platform.core"
//! resource-roots = ["resources"]
//! test-resource-roots = ["testResources"]
//!
//! [[dependencies]]
//! name = "intellij.platform.util"
//!
//! [[dependencies]]
//! name = "intellij.platform.testFramework"
//! scope = "test"
//!
//! [[libraries]]
//! name = "kotlinx-coroutines"
//! ```
//!
//! The pipeline only talks to the graph through [`ModuleOutputProvider`].

pub mod build_file;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::BUILD_FILE_NAME;
use crate::core::{DepgenError, DepgenResult};

/// Scope of a build-graph dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    /// Needed to compile and run
    #[default]
    Compile,
    /// Needed at runtime only
    Runtime,
    /// Provided by the environment
    Provided,
    /// Tests only
    Test,
}

impl DependencyScope {
    /// Whether the dependency is visible to production code.
    pub fn is_production(self) -> bool {
        self != Self::Test
    }

    /// Scope keyword used in build files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Provided => "provided",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency on a module or a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDependency {
    /// Module or library name
    pub name: String,
    /// Dependency scope
    #[serde(default)]
    pub scope: DependencyScope,
}

impl BuildDependency {
    /// Dependency with the given scope.
    pub fn new(name: impl Into<String>, scope: DependencyScope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }
}

fn default_resource_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("resources")]
}

fn default_test_resource_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("testResources")]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BuildFile {
    name: String,
    #[serde(default = "default_resource_roots")]
    resource_roots: Vec<PathBuf>,
    #[serde(default = "default_test_resource_roots")]
    test_resource_roots: Vec<PathBuf>,
    #[serde(default)]
    dependencies: Vec<BuildDependency>,
    #[serde(default)]
    libraries: Vec<BuildDependency>,
}

/// One module of the build graph, with absolute resource roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildModule {
    /// Module name
    pub name: String,
    /// The `module.toml` declaring the module
    pub build_file: PathBuf,
    /// Production resource roots
    pub resource_roots: Vec<PathBuf>,
    /// Test resource roots
    pub test_resource_roots: Vec<PathBuf>,
    /// Module dependencies
    pub dependencies: Vec<BuildDependency>,
    /// Library dependencies
    pub libraries: Vec<BuildDependency>,
}

impl BuildModule {
    /// Parse a build file, resolving roots against its directory.
    pub fn parse(path: &Path, content: &str) -> DepgenResult<Self> {
        let file: BuildFile = toml::from_str(content).map_err(|e| DepgenError::BuildFileParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        Ok(Self {
            name: file.name,
            build_file: path.to_path_buf(),
            resource_roots: file.resource_roots.iter().map(|r| base.join(r)).collect(),
            test_resource_roots: file.test_resource_roots.iter().map(|r| base.join(r)).collect(),
            dependencies: file.dependencies,
            libraries: file.libraries,
        })
    }

    /// Module dependency names, production only unless `with_tests`.
    pub fn dependency_names(&self, with_tests: bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .dependencies
            .iter()
            .filter(|d| with_tests || d.scope.is_production())
            .map(|d| d.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Source of build-graph facts for the dependency pipeline.
pub trait ModuleOutputProvider: Send + Sync {
    /// Look up a module.
    fn module(&self, name: &str) -> Option<&BuildModule>;

    /// All module names, sorted.
    fn module_names(&self) -> Vec<String>;

    /// Look up a module that must exist.
    fn require(&self, name: &str) -> DepgenResult<&BuildModule> {
        self.module(name).ok_or_else(|| DepgenError::ModuleNotFound {
            name: name.to_string(),
        })
    }

    /// Dependency names of a module that must exist.
    fn dependencies(&self, name: &str, with_tests: bool) -> DepgenResult<Vec<String>> {
        Ok(self.require(name)?.dependency_names(with_tests))
    }
}

/// In-memory build graph.
#[derive(Debug, Default)]
pub struct BuildGraph {
    modules: HashMap<String, BuildModule>,
}

impl BuildGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; names must be unique.
    pub fn insert(&mut self, module: BuildModule) -> DepgenResult<()> {
        if let Some(existing) = self.modules.get(&module.name) {
            return Err(DepgenError::DuplicateModule {
                name: module.name.clone(),
                first: existing.build_file.display().to_string(),
                second: module.build_file.display().to_string(),
            });
        }
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the graph has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Discover and parse every build file below `project_dir`.
    ///
    /// Hidden directories and `target` are skipped. Parsing happens on the
    /// blocking pool since the walk is synchronous.
    pub async fn load(project_dir: &Path) -> Result<Self> {
        let root = project_dir.to_path_buf();
        let graph = tokio::task::spawn_blocking(move || Self::load_blocking(&root))
            .await
            .context("Build graph loading task panicked")??;

        tracing::info!(
            target: "build_graph",
            "Loaded {} modules from {}",
            graph.len(),
            project_dir.display()
        );
        Ok(graph)
    }

    fn load_blocking(project_dir: &Path) -> Result<Self> {
        let mut graph = Self::new();
        let walker = WalkDir::new(project_dir).sort_by_file_name().into_iter().filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || !(name.starts_with('.') || name == "target")
        });

        for entry in walker {
            let entry = entry.with_context(|| {
                format!("Failed to walk project directory {}", project_dir.display())
            })?;
            if !entry.file_type().is_file() || entry.file_name() != BUILD_FILE_NAME {
                continue;
            }
            let path = entry.path();
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read build file {}", path.display()))?;
            let module = BuildModule::parse(path, &content)?;
            tracing::trace!(target: "build_graph", "Found module {} at {}", module.name, path.display());
            graph.insert(module)?;
        }

        Ok(graph)
    }
}

impl ModuleOutputProvider for BuildGraph {
    fn module(&self, name: &str) -> Option<&BuildModule> {
        self.modules.get(name)
    }

    fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_file() {
        let module = BuildModule::parse(
            Path::new("/project/core/module.toml"),
            r#"
name = "intellij.core"
test-resource-roots = ["tr"]

[[dependencies]]
name = "b"

[[dependencies]]
name = "a"
scope = "runtime"

[[dependencies]]
name = "t"
scope = "test"
"#,
        )
        .unwrap();

        assert_eq!(module.resource_roots, vec![PathBuf::from("/project/core/resources")]);
        assert_eq!(module.test_resource_roots, vec![PathBuf::from("/project/core/tr")]);
        assert_eq!(module.dependency_names(false), vec!["a", "b"]);
        assert_eq!(module.dependency_names(true), vec!["a", "b", "t"]);
    }

    #[test]
    fn test_missing_module_is_fatal() {
        let graph = BuildGraph::new();
        let err = graph.dependencies("nope", false).unwrap_err();
        assert!(matches!(err, DepgenError::ModuleNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_load_discovers_modules_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        for (sub, name) in [("a", "m.a"), ("b/nested", "m.b")] {
            let module_dir = dir.path().join(sub);
            std::fs::create_dir_all(&module_dir).unwrap();
            std::fs::write(module_dir.join("module.toml"), format!("name = \"{name}\"\n")).unwrap();
        }
        let hidden = dir.path().join(".git");
        std::fs::create_dir_all(&hidden).unwrap();
        std::fs::write(hidden.join("module.toml"), "name = \"m.a\"\n").unwrap();

        let graph = BuildGraph::load(dir.path()).await.unwrap();
        assert_eq!(graph.module_names(), vec!["m.a", "m.b"]);

        let dup = dir.path().join("c");
        std::fs::create_dir_all(&dup).unwrap();
        std::fs::write(dup.join("module.toml"), "name = \"m.a\"\n").unwrap();
        assert!(BuildGraph::load(dir.path()).await.is_err());
    }
}
