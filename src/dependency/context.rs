//! Per-run state shared by generators and validation rules.

use futures::future::join_all;
use std::sync::Arc;

use super::async_cache::AsyncCache;
use super::descriptor_cache::ModuleDescriptorCache;
use super::plugin_content::{PluginContentCache, PluginContentInfo};
use super::report::DependencyFileResult;
use super::traversal::ModuleSetTraversalCache;
use super::write::WriteStrategy;
use crate::build_graph::ModuleOutputProvider;
use crate::config::{GenerationSettings, ProjectConfig};
use crate::constants::{TEST_MODULE_SUFFIX, is_test_module_name};
use crate::core::{DepgenError, DepgenResult};
use crate::descriptor::update_dependencies;

/// Decides whether `dep` may be written into the descriptor of `module`.
/// The flag tells whether test-scope dependencies are being generated.
pub type DependencyFilter = Arc<dyn Fn(&str, &str, bool) -> bool + Send + Sync>;

/// Decides which library modules the library scope rule looks at.
pub type LibraryModuleFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Everything one generation run shares.
///
/// Caches live exactly as long as the context; nothing is global.
pub struct GenerationContext {
    /// Build graph
    pub provider: Arc<dyn ModuleOutputProvider>,
    /// Project configuration
    pub config: Arc<ProjectConfig>,
    /// Module-set reachability index
    pub traversal: Arc<ModuleSetTraversalCache>,
    /// Descriptor snapshots
    pub descriptors: Arc<ModuleDescriptorCache>,
    /// Plugin layouts
    pub plugins: Arc<PluginContentCache>,
    /// Apply or dry-run
    pub strategy: WriteStrategy,
    dependency_filter: DependencyFilter,
    library_module_filter: LibraryModuleFilter,
    edges: AsyncCache<String, Arc<Vec<String>>>,
    generated: AsyncCache<String, Option<DependencyFileResult>>,
}

impl GenerationContext {
    /// Create a context, indexing the module sets and registering the
    /// synthetic test plugins.
    ///
    /// Fails fatally on a module-set cycle or an undefined nested set.
    pub fn new(
        provider: Arc<dyn ModuleOutputProvider>,
        config: Arc<ProjectConfig>,
        strategy: WriteStrategy,
    ) -> DepgenResult<Self> {
        let traversal = Arc::new(ModuleSetTraversalCache::build(&config.module_sets)?);

        // registered before any job can cache a lookup of the same module
        let plugins = Arc::new(PluginContentCache::new(provider.clone()));
        for spec in &config.dsl_test_plugins {
            if !plugins.add_dsl_test_plugin(spec) {
                tracing::warn!(target: "dependency", "Test plugin '{}' is defined twice", spec.module);
            }
        }

        Ok(Self {
            descriptors: Arc::new(ModuleDescriptorCache::new(provider.clone())),
            plugins,
            provider,
            config,
            traversal,
            strategy,
            dependency_filter: Arc::new(|_, _, _| true),
            library_module_filter: Arc::new(|_| true),
            edges: AsyncCache::new(),
            generated: AsyncCache::new(),
        })
    }

    /// Replace the dependency filter.
    #[must_use]
    pub fn with_dependency_filter(mut self, filter: DependencyFilter) -> Self {
        self.dependency_filter = filter;
        self
    }

    /// Replace the library module filter.
    #[must_use]
    pub fn with_library_module_filter(mut self, filter: LibraryModuleFilter) -> Self {
        self.library_module_filter = filter;
        self
    }

    /// Generation settings.
    pub fn settings(&self) -> &GenerationSettings {
        &self.config.generation
    }

    /// Whether `dep` may appear in `module`'s generated dependencies.
    pub fn accepts_dependency(&self, module: &str, dep: &str, is_test: bool) -> bool {
        !self.settings().excluded_dependencies.iter().any(|d| d == dep) && (self.dependency_filter)(module, dep, is_test)
    }

    /// Whether the library scope rule checks `module`.
    pub fn accepts_library_module(&self, module: &str) -> bool {
        module.starts_with(&self.settings().library_module_prefix) && (self.library_module_filter)(module)
    }

    /// Whether an existing module reference survives a rewrite.
    ///
    /// References the build graph knows nothing about cannot be regenerated,
    /// so they are kept as written.
    pub fn preserve_existing_module(&self, module: &str) -> bool {
        let owner = module.strip_suffix(TEST_MODULE_SUFFIX).unwrap_or(module);
        self.provider.module(module).is_none() && self.provider.module(owner).is_none()
    }

    /// Filtered build-graph dependencies of `module` that have a descriptor,
    /// sorted. `module` must exist in the build graph.
    pub async fn compute_dependencies(&self, module: &str, with_tests: bool) -> DepgenResult<Vec<String>> {
        let candidates: Vec<String> = self
            .provider
            .dependencies(module, with_tests)?
            .into_iter()
            .filter(|dep| dep != module && self.accepts_dependency(module, dep, with_tests))
            .collect();

        let checks = join_all(candidates.iter().map(|dep| self.descriptors.has_descriptor(dep))).await;
        let mut deps = Vec::with_capacity(candidates.len());
        for (dep, has) in candidates.into_iter().zip(checks) {
            if has? {
                deps.push(dep);
            }
        }
        deps.sort();
        deps.dedup();
        Ok(deps)
    }

    /// Build module whose dependencies feed a descriptor.
    ///
    /// `<owner>._test` descriptors take the owner's dependencies unless the
    /// build graph declares the test module on its own.
    pub fn build_module_for<'a>(&self, descriptor_module: &'a str) -> &'a str {
        if self.provider.module(descriptor_module).is_some() {
            return descriptor_module;
        }
        descriptor_module.strip_suffix(TEST_MODULE_SUFFIX).unwrap_or(descriptor_module)
    }

    /// Generate one descriptor, at most once per run.
    ///
    /// Returns `None` when the module has no descriptor or opted out with
    /// the skip marker. A module missing from the build graph is fatal.
    pub async fn generate_descriptor(&self, descriptor_module: &str) -> DepgenResult<Option<DependencyFileResult>> {
        self.generated
            .get_or_put(descriptor_module.to_string(), || self.write_descriptor(descriptor_module))
            .await
            .map_err(DepgenError::from)
    }

    async fn write_descriptor(&self, descriptor_module: &str) -> DepgenResult<Option<DependencyFileResult>> {
        let build_module = self.build_module_for(descriptor_module);
        self.provider.require(build_module)?;

        let Some(info) = self.descriptors.get_or_analyze(descriptor_module).await? else {
            tracing::trace!(target: "dependency", "No descriptor for {descriptor_module}");
            return Ok(None);
        };
        if info.skip_generation {
            tracing::debug!(target: "dependency", "Skipping {} (skip marker)", info.path.display());
            return Ok(None);
        }

        let with_tests = is_test_module_name(descriptor_module);
        let deps = self.compute_dependencies(build_module, with_tests).await?;
        let deps: Vec<String> = deps.into_iter().filter(|d| d != descriptor_module).collect();

        let updated = update_dependencies(&info.content, &deps, |m| self.preserve_existing_module(m))?;
        let status = self.strategy.update(&info.path, &info.content, &updated).await?;

        Ok(Some(DependencyFileResult {
            module_name: descriptor_module.to_string(),
            path: info.path.clone(),
            status,
            count: deps.len(),
        }))
    }

    /// Plugin layout of `module`, or `None` when it is not a plugin.
    ///
    /// Configured plugins are extracted with their own provenance and must
    /// have a plugin.xml.
    pub async fn plugin_info(&self, module: &str) -> DepgenResult<Option<Arc<PluginContentInfo>>> {
        match self.config.plugin(module) {
            Some(spec) => self.plugins.extract(module, spec.test).await.map(Some),
            None => self.plugins.get_or_extract(module).await,
        }
    }

    /// Dependencies written into plugin.xml: production build-graph deps
    /// minus own content, filtered, with a descriptor. Sorted.
    pub async fn plugin_dependencies(&self, info: &PluginContentInfo) -> DepgenResult<Vec<String>> {
        let mut deps = Vec::new();
        for dep in &info.build_dependencies {
            if info.has_content(dep) || dep == &info.plugin_module || !self.accepts_dependency(&info.plugin_module, dep, false)
            {
                continue;
            }
            if self.descriptors.has_descriptor(dep).await? {
                deps.push(dep.clone());
            }
        }
        deps.sort();
        deps.dedup();
        Ok(deps)
    }

    /// Outgoing edges of a plugin's main module: existing references of
    /// plugin.xml plus its generated dependencies, without own content.
    pub async fn plugin_edges(&self, info: &PluginContentInfo) -> DepgenResult<Vec<String>> {
        let mut edges = info.module_references.clone();
        if info.path.is_some() {
            edges.extend(self.plugin_dependencies(info).await?);
        }
        edges.retain(|m| m != &info.plugin_module && !info.has_content(m));
        edges.sort();
        edges.dedup();
        Ok(edges)
    }

    /// Outgoing edges of `module` in the declared + generated graph.
    ///
    /// Existing references of its descriptor, plus what generation would
    /// produce unless the descriptor opted out. A module without a module
    /// descriptor takes its plugin.xml edges when it is a plugin, and has
    /// no edges otherwise.
    pub async fn edges(&self, module: &str) -> DepgenResult<Arc<Vec<String>>> {
        self.edges
            .get_or_put(module.to_string(), || self.compute_edges(module))
            .await
            .map_err(DepgenError::from)
    }

    async fn compute_edges(&self, module: &str) -> DepgenResult<Arc<Vec<String>>> {
        let Some(info) = self.descriptors.get_or_analyze(module).await? else {
            let edges = match self.plugin_info(module).await? {
                Some(plugin) => self.plugin_edges(&plugin).await?,
                None => Vec::new(),
            };
            return Ok(Arc::new(edges));
        };

        let mut edges = info.module_references.clone();
        if !info.skip_generation && self.provider.module(module).is_some() {
            edges.extend(self.compute_dependencies(module, false).await?);
        }
        edges.retain(|m| m != module);
        edges.sort();
        edges.dedup();
        Ok(Arc::new(edges))
    }

    /// Every descriptor result generated so far.
    pub fn generated_results(&self) -> Vec<DependencyFileResult> {
        self.generated.values().into_iter().flatten().collect()
    }
}
