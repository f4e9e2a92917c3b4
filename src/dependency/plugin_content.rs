//! Per-plugin content extraction.
//!
//! A plugin is a module with `META-INF/plugin.xml` in a production resource
//! root. Its content modules are loaded together with it, so they are never
//! dependencies of the plugin itself.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::async_cache::AsyncCache;
use super::descriptor_cache::load_descriptor;
use crate::build_graph::ModuleOutputProvider;
use crate::constants::PLUGIN_DESCRIPTOR_PATH;
use crate::core::{DepgenError, DepgenResult};
use crate::descriptor::has_skip_marker;
use crate::models::DslTestPluginSpec;

/// How a plugin entered the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentProvenance {
    /// Configured production plugin
    Bundled,
    /// Configured test plugin
    Test,
    /// Synthetic plugin defined in configuration
    DslTest,
    /// Found on demand while following dependencies
    Discovered,
}

/// Extracted plugin layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginContentInfo {
    /// Main module name
    pub plugin_module: String,
    /// Plugin id, when declared
    pub plugin_id: Option<String>,
    /// plugin.xml path; `None` for synthetic plugins
    pub path: Option<PathBuf>,
    /// plugin.xml text; empty for synthetic plugins
    pub content: String,
    /// Whether plugin.xml carries the skip marker
    pub skip_generation: bool,
    /// Declared content modules
    pub content_modules: Vec<String>,
    /// Module references of the existing `<dependencies>` block
    pub module_references: Vec<String>,
    /// Production build-graph dependencies of the main module
    pub build_dependencies: Vec<String>,
    /// Provenance tag
    pub provenance: ContentProvenance,
}

impl PluginContentInfo {
    /// Whether `module` is declared as content of this plugin.
    pub fn has_content(&self, module: &str) -> bool {
        self.content_modules.iter().any(|m| m == module)
    }
}

/// Memoized plugin extraction for one run.
pub struct PluginContentCache {
    provider: Arc<dyn ModuleOutputProvider>,
    entries: AsyncCache<String, Option<Arc<PluginContentInfo>>>,
}

impl PluginContentCache {
    /// Create an empty cache over a build graph.
    pub fn new(provider: Arc<dyn ModuleOutputProvider>) -> Self {
        Self {
            provider,
            entries: AsyncCache::new(),
        }
    }

    /// Pre-warm a configured plugin.
    ///
    /// The plugin module must exist in the build graph and have a plugin.xml.
    pub async fn extract(&self, plugin: &str, is_test: bool) -> DepgenResult<Arc<PluginContentInfo>> {
        let provenance = if is_test {
            ContentProvenance::Test
        } else {
            ContentProvenance::Bundled
        };
        let info = self
            .entries
            .get_or_put(plugin.to_string(), || self.load(plugin, provenance, true))
            .await?;

        info.ok_or_else(|| {
            DepgenError::other(format!("Plugin module '{plugin}' has no {PLUGIN_DESCRIPTOR_PATH}"))
        })
    }

    /// Extract a plugin on demand; `None` if the module is not a plugin.
    pub async fn get_or_extract(&self, plugin: &str) -> DepgenResult<Option<Arc<PluginContentInfo>>> {
        Ok(self
            .entries
            .get_or_put(plugin.to_string(), || self.load(plugin, ContentProvenance::Discovered, false))
            .await?)
    }

    /// Register a synthetic plugin. An existing entry wins.
    pub fn add_dsl_test_plugin(&self, spec: &DslTestPluginSpec) -> bool {
        let mut dependencies = spec.dependencies.clone();
        dependencies.sort();
        dependencies.dedup();

        self.entries.insert_if_absent(
            spec.module.clone(),
            Some(Arc::new(PluginContentInfo {
                plugin_module: spec.module.clone(),
                plugin_id: Some(spec.id.clone()),
                path: None,
                content: String::new(),
                skip_generation: true,
                content_modules: spec.content.clone(),
                module_references: dependencies.clone(),
                build_dependencies: dependencies,
                provenance: ContentProvenance::DslTest,
            })),
        )
    }

    async fn load(
        &self,
        plugin: &str,
        provenance: ContentProvenance,
        required: bool,
    ) -> DepgenResult<Option<Arc<PluginContentInfo>>> {
        let module = if required {
            self.provider.require(plugin)?
        } else {
            match self.provider.module(plugin) {
                Some(module) => module,
                None => return Ok(None),
            }
        };
        let roots = module.resource_roots.clone();
        let build_dependencies = module.dependency_names(false);

        for root in &roots {
            let path = root.join(PLUGIN_DESCRIPTOR_PATH);
            let Some((content, parsed)) = load_descriptor(&path, &roots).await? else {
                continue;
            };
            tracing::debug!(
                target: "dependency",
                "Extracted plugin {plugin} ({provenance:?}) with {} content modules",
                parsed.content_modules.len()
            );
            return Ok(Some(Arc::new(PluginContentInfo {
                plugin_module: plugin.to_string(),
                plugin_id: parsed.plugin_id,
                path: Some(path),
                skip_generation: has_skip_marker(&content),
                content,
                content_modules: parsed.content_modules,
                module_references: parsed.module_dependencies,
                build_dependencies,
                provenance,
            })));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_graph::{BuildGraph, BuildModule};
    use std::path::Path;

    fn graph(dir: &Path) -> Arc<BuildGraph> {
        let mut graph = BuildGraph::new();
        for (name, body) in [
            ("plugin", "[[dependencies]]\nname = \"lib\"\n[[dependencies]]\nname = \"t\"\nscope = \"test\"\n"),
            ("lib", ""),
        ] {
            let file = dir.join(name).join("module.toml");
            graph.insert(BuildModule::parse(&file, &format!("name = \"{name}\"\n{body}")).unwrap()).unwrap();
        }
        Arc::new(graph)
    }

    #[tokio::test]
    async fn test_extract_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        let xml = dir.path().join("plugin/resources/META-INF/plugin.xml");
        std::fs::create_dir_all(xml.parent().unwrap()).unwrap();
        std::fs::write(
            &xml,
            r#"<idea-plugin>
  <id>com.example.plugin</id>
  <content>
    <module name="plugin.content"/>
  </content>
</idea-plugin>"#,
        )
        .unwrap();

        let cache = PluginContentCache::new(graph(dir.path()));
        let info = cache.extract("plugin", false).await.unwrap();
        assert_eq!(info.provenance, ContentProvenance::Bundled);
        assert_eq!(info.plugin_id.as_deref(), Some("com.example.plugin"));
        assert!(info.has_content("plugin.content"));
        assert_eq!(info.build_dependencies, vec!["lib"]);

        // later lookups see the pre-warmed entry
        let again = cache.get_or_extract("plugin").await.unwrap().unwrap();
        assert_eq!(again.provenance, ContentProvenance::Bundled);

        assert!(cache.get_or_extract("lib").await.unwrap().is_none());
        assert!(cache.get_or_extract("unknown").await.unwrap().is_none());
        assert!(cache.extract("lib", false).await.is_err());

        let missing = cache.extract("ghost", false).await.unwrap_err();
        assert!(missing.is_fatal());
    }

    #[tokio::test]
    async fn test_dsl_test_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PluginContentCache::new(graph(dir.path()));

        let spec = DslTestPluginSpec {
            module: "dsl".to_string(),
            id: "com.example.dsl".to_string(),
            content: vec!["dsl.content".to_string()],
            dependencies: vec!["b".to_string(), "a".to_string()],
        };
        assert!(cache.add_dsl_test_plugin(&spec));
        assert!(!cache.add_dsl_test_plugin(&spec));

        let info = cache.get_or_extract("dsl").await.unwrap().unwrap();
        assert_eq!(info.provenance, ContentProvenance::DslTest);
        assert_eq!(info.module_references, vec!["a", "b"]);
        assert!(info.path.is_none());
    }
}
