//! Temporary project layouts.
//!
//! Every module lives in a directory named after it:
//!
//! ```text
//! <root>/depgen.toml
//! <root>/<module>/module.toml
//! <root>/<module>/resources/<module>.xml
//! <root>/<module>/resources/META-INF/plugin.xml
//! <root>/<module>/testResources/<module>._test.xml
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::build_graph::BuildGraph;
use crate::config::ProjectConfig;
use crate::constants::{BUILD_FILE_NAME, CONFIG_FILE_NAME, PLUGIN_DESCRIPTOR_PATH};
use crate::dependency::{GenerationContext, WriteStrategy};

/// A project in a temporary directory, removed on drop.
pub struct ProjectFixture {
    temp: TempDir,
}

impl ProjectFixture {
    /// Descriptor without dependencies.
    pub const EMPTY_DESCRIPTOR: &'static str = "<idea-plugin>\n</idea-plugin>\n";

    /// Create an empty project.
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: TempDir::new().context("Failed to create temp dir")?,
        })
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write a file relative to the root, creating parents.
    pub fn write(&self, relative: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write: {}", path.display()))?;
        Ok(path)
    }

    /// Read a file relative to the root.
    pub fn read(&self, relative: impl AsRef<Path>) -> Result<String> {
        let path = self.path().join(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read: {}", path.display()))
    }

    /// Declare a module with compile-scope module dependencies.
    pub fn module(&self, name: &str, dependencies: &[&str]) -> Result<PathBuf> {
        let mut body = String::new();
        for dep in dependencies {
            body.push_str(&format!("\n[[dependencies]]\nname = \"{dep}\"\n"));
        }
        self.module_toml(name, &body)
    }

    /// Declare a module with a raw build file body (after `name = ...`).
    pub fn module_toml(&self, name: &str, body: &str) -> Result<PathBuf> {
        self.write(Path::new(name).join(BUILD_FILE_NAME), &format!("name = \"{name}\"\n{body}"))
    }

    /// Write `<module>.xml` into the module's production resources.
    pub fn descriptor(&self, module: &str, content: &str) -> Result<PathBuf> {
        self.write(Self::descriptor_path(module), content)
    }

    /// Relative path of a module's production descriptor.
    pub fn descriptor_path(module: &str) -> PathBuf {
        Path::new(module).join("resources").join(format!("{module}.xml"))
    }

    /// Write `<module>._test.xml` into the module's test resources.
    pub fn test_descriptor(&self, module: &str, content: &str) -> Result<PathBuf> {
        self.write(Self::test_descriptor_path(module), content)
    }

    /// Relative path of a module's test descriptor.
    pub fn test_descriptor_path(module: &str) -> PathBuf {
        Path::new(module).join("testResources").join(format!("{module}._test.xml"))
    }

    /// Write a plugin.xml declaring `content` modules.
    pub fn plugin(&self, module: &str, content: &[&str]) -> Result<PathBuf> {
        let mut xml = format!("<idea-plugin>\n  <id>{module}</id>\n");
        if !content.is_empty() {
            xml.push_str("  <content>\n");
            for cm in content {
                xml.push_str(&format!("    <module name=\"{cm}\"/>\n"));
            }
            xml.push_str("  </content>\n");
        }
        xml.push_str("</idea-plugin>\n");
        self.write(Self::plugin_path(module), &xml)
    }

    /// Relative path of a plugin's plugin.xml.
    pub fn plugin_path(module: &str) -> PathBuf {
        Path::new(module).join("resources").join(PLUGIN_DESCRIPTOR_PATH)
    }

    /// Write `depgen.toml`.
    pub fn config(&self, content: &str) -> Result<PathBuf> {
        self.write(CONFIG_FILE_NAME, content)
    }

    /// Load the project into a run context.
    pub async fn context(&self, strategy: WriteStrategy) -> Result<Arc<GenerationContext>> {
        let graph = BuildGraph::load(self.path()).await?;
        let config = ProjectConfig::load_from(&self.path().join(CONFIG_FILE_NAME)).await?;
        Ok(Arc::new(GenerationContext::new(Arc::new(graph), Arc::new(config), strategy)?))
    }
}
