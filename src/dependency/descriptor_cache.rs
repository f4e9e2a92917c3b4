//! Per-module descriptor snapshots.
//!
//! A module's descriptor is `<module>.xml` in one of its resource roots:
//! production roots first, then test roots. Test content modules
//! (`<owner>._test`) keep theirs in the owner's test roots.
//!
//! Most modules have no descriptor at all; those analyze to `None` and are
//! silently excluded from generation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::async_cache::AsyncCache;
use super::report::ValidationError;
use crate::build_graph::ModuleOutputProvider;
use crate::constants::TEST_MODULE_SUFFIX;
use crate::core::{DepgenError, DepgenResult};
use crate::descriptor::{
    ParsedDescriptor, has_skip_marker, looks_like_dependency_markup, parse_descriptor, root_element,
};
use crate::utils::read_optional;

/// Immutable snapshot of one module descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorInfo {
    /// Module (or test content module) the descriptor belongs to
    pub module_name: String,
    /// Descriptor path
    pub path: PathBuf,
    /// Raw text as read
    pub content: String,
    /// Whether the skip marker is present
    pub skip_generation: bool,
    /// Module references of the existing `<dependencies>` block
    pub module_references: Vec<String>,
    /// Plugin references of the existing `<dependencies>` block
    pub plugin_references: Vec<String>,
    /// Declared aliases
    pub aliases: Vec<String>,
    /// Declared content modules
    pub content_modules: Vec<String>,
    /// Parser anomaly found while reading
    pub anomaly: Option<ValidationError>,
}

/// Read a descriptor and merge everything its `xi:include`s pull in.
///
/// Include targets resolve against `roots`; a leading `/` is relative to
/// the root. Targets that do not exist are ignored.
pub(crate) async fn load_descriptor(path: &Path, roots: &[PathBuf]) -> DepgenResult<Option<(String, ParsedDescriptor)>> {
    let Some(text) = read_optional(path).await? else {
        return Ok(None);
    };

    let mut parsed = parse_descriptor(&text);
    let mut pending: Vec<String> = std::mem::take(&mut parsed.includes);
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(href) = pending.pop() {
        if !visited.insert(href.clone()) {
            continue;
        }
        let relative = href.trim_start_matches('/');
        let mut found = false;
        for root in roots {
            if let Some(fragment) = read_optional(&root.join(relative)).await? {
                let mut included = parse_descriptor(&fragment);
                pending.extend(std::mem::take(&mut included.includes));
                parsed.merge(included);
                found = true;
                break;
            }
        }
        if !found {
            tracing::debug!(
                target: "descriptor",
                "Include {href} of {} not found in module roots",
                path.display()
            );
        }
    }

    Ok(Some((text, parsed)))
}

/// Memoized descriptor lookups for one run.
pub struct ModuleDescriptorCache {
    provider: Arc<dyn ModuleOutputProvider>,
    locations: AsyncCache<String, Option<PathBuf>>,
    descriptors: AsyncCache<String, Option<Arc<DescriptorInfo>>>,
}

impl ModuleDescriptorCache {
    /// Create an empty cache over a build graph.
    pub fn new(provider: Arc<dyn ModuleOutputProvider>) -> Self {
        Self {
            provider,
            locations: AsyncCache::new(),
            descriptors: AsyncCache::new(),
        }
    }

    /// Roots searched for a module's descriptor, in priority order.
    fn search_roots(&self, module: &str) -> Vec<PathBuf> {
        if let Some(build) = self.provider.module(module) {
            return build.resource_roots.iter().chain(&build.test_resource_roots).cloned().collect();
        }
        module
            .strip_suffix(TEST_MODULE_SUFFIX)
            .and_then(|owner| self.provider.module(owner))
            .map(|owner| owner.test_resource_roots.clone())
            .unwrap_or_default()
    }

    async fn locate(&self, module: &str) -> DepgenResult<Option<PathBuf>> {
        let file_name = format!("{module}.xml");
        for root in self.search_roots(module) {
            let candidate = root.join(&file_name);
            let exists = tokio::fs::try_exists(&candidate).await.map_err(|e| DepgenError::FileSystemError {
                operation: format!("stat failed: {e}"),
                path: candidate.display().to_string(),
            })?;
            if exists {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Path of the module's descriptor, if it has one.
    pub async fn descriptor_path(&self, module: &str) -> DepgenResult<Option<PathBuf>> {
        self.locations
            .get_or_put(module.to_string(), || self.locate(module))
            .await
            .map_err(DepgenError::from)
    }

    /// Whether the module has a descriptor to be referenced by.
    pub async fn has_descriptor(&self, module: &str) -> DepgenResult<bool> {
        Ok(self.descriptor_path(module).await?.is_some())
    }

    /// Snapshot of the module's descriptor, analyzed once per run.
    pub async fn get_or_analyze(&self, module: &str) -> DepgenResult<Option<Arc<DescriptorInfo>>> {
        self.descriptors
            .get_or_put(module.to_string(), || self.analyze(module))
            .await
            .map_err(DepgenError::from)
    }

    async fn analyze(&self, module: &str) -> DepgenResult<Option<Arc<DescriptorInfo>>> {
        let Some(path) = self.descriptor_path(module).await? else {
            return Ok(None);
        };
        let roots = self.search_roots(module);
        let Some((content, parsed)) = load_descriptor(&path, &roots).await? else {
            return Ok(None);
        };

        let anomaly = (parsed.has_no_dependency_facts() && looks_like_dependency_markup(&content)).then(|| {
            ValidationError::NonStandardDescriptorRoot {
                module: module.to_string(),
                path: path.clone(),
                root: root_element(&content).unwrap_or_default(),
            }
        });
        if anomaly.is_some() {
            tracing::warn!(
                target: "descriptor",
                "Descriptor {} has a non-standard root; its dependencies are ignored",
                path.display()
            );
        }

        let skip_generation = has_skip_marker(&content);
        tracing::trace!(
            target: "descriptor",
            "Analyzed {module}: {} module refs, skip={skip_generation}",
            parsed.module_dependencies.len()
        );

        Ok(Some(Arc::new(DescriptorInfo {
            module_name: module.to_string(),
            path,
            content,
            skip_generation,
            module_references: parsed.module_dependencies,
            plugin_references: parsed.plugin_dependencies,
            aliases: parsed.aliases,
            content_modules: parsed.content_modules,
            anomaly,
        })))
    }

    /// Every parser anomaly recorded so far, sorted by module.
    pub fn anomalies(&self) -> Vec<ValidationError> {
        let mut found: Vec<(String, ValidationError)> = self
            .descriptors
            .values()
            .into_iter()
            .flatten()
            .filter_map(|info| info.anomaly.clone().map(|a| (info.module_name.clone(), a)))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found.into_iter().map(|(_, anomaly)| anomaly).collect()
    }
}
