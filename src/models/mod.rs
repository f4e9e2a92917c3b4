//! Shared data models: module sets, plugins and products.
//!
//! These are the read-only inputs of a generation run. They are deserialized
//! from `depgen.toml` (see [`crate::config`]) and never mutated by the
//! pipeline.

use serde::{Deserialize, Serialize};

/// A module listed inside a module set.
///
/// Entries accept two TOML shapes:
///
/// ```toml
/// modules = [
///     "intellij.platform.util",
///     { name = "intellij.platform.core", include-dependencies = true },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawModuleEntry", into = "RawModuleEntry")]
pub struct ModuleEntry {
    /// Module name, unique across the build graph
    pub name: String,
    /// Whether the module's descriptor dependencies are generated
    pub include_dependencies: bool,
}

impl ModuleEntry {
    /// Entry without dependency generation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_dependencies: false,
        }
    }

    /// Entry whose descriptor dependencies are generated.
    pub fn with_dependencies(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_dependencies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawModuleEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, rename = "include-dependencies")]
        include_dependencies: bool,
    },
}

impl From<RawModuleEntry> for ModuleEntry {
    fn from(raw: RawModuleEntry) -> Self {
        match raw {
            RawModuleEntry::Name(name) => Self::new(name),
            RawModuleEntry::Detailed {
                name,
                include_dependencies,
            } => Self {
                name,
                include_dependencies,
            },
        }
    }
}

impl From<ModuleEntry> for RawModuleEntry {
    fn from(entry: ModuleEntry) -> Self {
        if entry.include_dependencies {
            Self::Detailed {
                name: entry.name,
                include_dependencies: true,
            }
        } else {
            Self::Name(entry.name)
        }
    }
}

/// Named, possibly nested grouping of modules.
///
/// Nested sets are referenced by name so that the same set can be shared by
/// several parents; the resulting graph must be acyclic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleSet {
    /// Set name, unique across the configuration
    pub name: String,
    /// Names of nested module sets, in declaration order
    #[serde(default)]
    pub module_sets: Vec<String>,
    /// Leaf modules, in declaration order
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
    /// Whether the set must not depend on anything outside its own closure
    #[serde(default)]
    pub self_contained: bool,
    /// Modules outside the closure a self-contained set may still depend on
    #[serde(default)]
    pub allowed_external: Vec<String>,
}

impl ModuleSet {
    /// Create an empty set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a leaf module.
    #[must_use]
    pub fn with_module(mut self, entry: ModuleEntry) -> Self {
        self.modules.push(entry);
        self
    }

    /// Add a nested set reference.
    #[must_use]
    pub fn with_nested(mut self, set: impl Into<String>) -> Self {
        self.module_sets.push(set.into());
        self
    }

    /// Mark the set as self-contained.
    #[must_use]
    pub fn self_contained(mut self) -> Self {
        self.self_contained = true;
        self
    }
}

/// A plugin bundled into products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginSpec {
    /// Name of the plugin's main module (the one holding `META-INF/plugin.xml`)
    pub module: String,
    /// Whether the plugin is only bundled into test runs
    #[serde(default)]
    pub test: bool,
    /// Dependencies allowed to be unavailable at runtime
    #[serde(default)]
    pub allowed_missing: Vec<String>,
}

impl PluginSpec {
    /// Production plugin without allowed-missing entries.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }
}

/// Synthetic plugin defined by test configuration instead of a plugin.xml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DslTestPluginSpec {
    /// Name of the plugin's main module
    pub module: String,
    /// Plugin id
    pub id: String,
    /// Content module names
    #[serde(default)]
    pub content: Vec<String>,
    /// Declared dependency module names
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A concrete product: the module sets and plugins bundled together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProductSpec {
    /// Product name
    pub name: String,
    /// Module sets the product is assembled from
    #[serde(default)]
    pub module_sets: Vec<String>,
    /// Main modules of the plugins bundled into the product
    #[serde(default)]
    pub plugins: Vec<String>,
}

impl ProductSpec {
    /// Create a product from module sets only.
    pub fn new(name: impl Into<String>, module_sets: &[&str]) -> Self {
        Self {
            name: name.into(),
            module_sets: module_sets.iter().map(ToString::to_string).collect(),
            plugins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(rename = "module-sets")]
        module_sets: Vec<ModuleSet>,
    }

    #[test]
    fn test_module_entry_shapes() {
        let parsed: Wrapper = toml::from_str(
            r#"
[[module-sets]]
name = "core"
module-sets = ["essential"]
modules = ["a", { name = "b", include-dependencies = true }, { name = "c" }]
"#,
        )
        .unwrap();

        let set = &parsed.module_sets[0];
        assert_eq!(set.module_sets, vec!["essential"]);
        assert_eq!(
            set.modules,
            vec![ModuleEntry::new("a"), ModuleEntry::with_dependencies("b"), ModuleEntry::new("c")]
        );
        assert!(!set.self_contained);
    }
}
