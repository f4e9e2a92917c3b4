//! Project configuration (`depgen.toml`).
//!
//! The configuration carries both the generation settings and the product
//! model: module sets, bundled plugins, synthetic test plugins and products.
//!
//! # Location
//!
//! 1. `--config <path>` on the command line
//! 2. `DEPGEN_CONFIG` environment variable
//! 3. `<project>/depgen.toml`
//!
//! # Example
//!
//! ```toml
//! [generation]
//! library-module-prefix = "intellij.libraries."
//! test-framework-modules = ["intellij.platform.testFramework"]
//! suppressions = ["self-contained:core"]
//!
//! [[module-sets]]
//! name = "core"
//! modules = [{ name = "intellij.core", include-dependencies = true }]
//!
//! [[products]]
//! name = "IDEA"
//! module-sets = ["core"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_LIBRARY_MODULE_PREFIX};
use crate::core::DepgenError;
use crate::models::{DslTestPluginSpec, ModuleSet, PluginSpec, ProductSpec};

/// Settings steering dependency generation and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GenerationSettings {
    /// Name prefix of library wrapper modules
    pub library_module_prefix: String,
    /// Module name prefixes whose descriptors are always generated
    pub generated_prefixes: Vec<String>,
    /// Modules marking a plugin as a test plugin when part of its content
    pub test_framework_modules: Vec<String>,
    /// Libraries that must only be used with `test` scope by production modules
    pub test_framework_libraries: Vec<String>,
    /// Dependencies never written into generated descriptors
    pub excluded_dependencies: Vec<String>,
    /// Suppression keys (`kind:context`) of accepted validation errors
    pub suppressions: Vec<String>,
    /// Maximum number of concurrent per-module jobs
    pub max_parallel: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            library_module_prefix: DEFAULT_LIBRARY_MODULE_PREFIX.to_string(),
            generated_prefixes: vec![DEFAULT_LIBRARY_MODULE_PREFIX.to_string()],
            test_framework_modules: Vec::new(),
            test_framework_libraries: Vec::new(),
            excluded_dependencies: Vec::new(),
            suppressions: Vec::new(),
            max_parallel: crate::constants::default_max_parallel(),
        }
    }
}

/// Parsed `depgen.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Generation settings
    #[serde(default)]
    pub generation: GenerationSettings,
    /// All module sets, in declaration order
    #[serde(default)]
    pub module_sets: Vec<ModuleSet>,
    /// Bundled plugins
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
    /// Synthetic plugins defined in configuration only
    #[serde(default)]
    pub dsl_test_plugins: Vec<DslTestPluginSpec>,
    /// Products
    #[serde(default)]
    pub products: Vec<ProductSpec>,
}

impl ProjectConfig {
    /// Resolve the configuration path for a project.
    pub fn resolve_path(project_dir: &Path, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }
        project_dir.join(CONFIG_FILE_NAME)
    }

    /// Load and validate a configuration file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Err(DepgenError::ConfigNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let config = Self::parse(&content).map_err(|reason| DepgenError::ConfigParseError {
            file: path.display().to_string(),
            reason,
        })?;

        tracing::debug!(
            target: "config",
            "Loaded {} module sets, {} plugins, {} products from {}",
            config.module_sets.len(),
            config.plugins.len(),
            config.products.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for set in &self.module_sets {
            if !seen.insert(set.name.as_str()) {
                return Err(format!("module set '{}' is defined twice", set.name));
            }
        }

        let mut plugins = HashSet::new();
        for plugin in &self.plugins {
            if !plugins.insert(plugin.module.as_str()) {
                return Err(format!("plugin '{}' is listed twice", plugin.module));
            }
        }
        for plugin in &self.dsl_test_plugins {
            if !plugins.insert(plugin.module.as_str()) {
                return Err(format!("plugin '{}' is listed twice", plugin.module));
            }
        }

        for product in &self.products {
            if let Some(missing) = product.module_sets.iter().find(|s| !seen.contains(s.as_str())) {
                return Err(format!(
                    "product '{}' references undefined module set '{missing}'",
                    product.name
                ));
            }
        }

        if self.generation.max_parallel == 0 {
            return Err("generation.max-parallel must be at least 1".to_string());
        }
        Ok(())
    }

    /// Look up a bundled plugin by main module name.
    pub fn plugin(&self, module: &str) -> Option<&PluginSpec> {
        self.plugins.iter().find(|p| p.module == module)
    }
}
