//! Plugin generation and validation.
//!
//! For every configured plugin: regenerate plugin.xml from the main module's
//! build-graph dependencies (without its own content), regenerate each
//! content module's production and test descriptors, then check that every
//! dependency of the plugin is available at runtime.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use super::context::GenerationContext;
use super::plugin_content::PluginContentInfo;
use super::report::{
    DependencyFileResult, GenerationReport, PluginDependencyFileResult, SuppressionSet, ValidationError,
};
use super::validation::absorb;
use crate::constants::{TEST_MODULE_SUFFIX, is_test_module_name};
use crate::core::DepgenResult;
use crate::descriptor::update_dependencies;
use crate::models::PluginSpec;

/// Generator for bundled plugins and their content modules.
pub struct PluginDependencyGenerator {
    ctx: Arc<GenerationContext>,
}

impl PluginDependencyGenerator {
    /// Create a generator over a run context.
    pub fn new(ctx: Arc<GenerationContext>) -> Self {
        Self {
            ctx,
        }
    }

    /// Generate every configured plugin, then validate all plugins.
    pub async fn generate(&self) -> DepgenResult<GenerationReport> {
        let mut report = GenerationReport::default();
        let config = self.ctx.config.clone();

        let extracted: Vec<_> = stream::iter(config.plugins.iter().cloned())
            .map(|spec| {
                let ctx = self.ctx.clone();
                async move {
                    let result = ctx.plugins.extract(&spec.module, spec.test).await;
                    (spec, result)
                }
            })
            .buffer_unordered(self.ctx.settings().max_parallel)
            .collect()
            .await;

        let mut plugins: Vec<(PluginSpec, Arc<PluginContentInfo>)> = Vec::new();
        for (spec, result) in extracted {
            if let Some(info) = absorb(result.map(Some), &spec.module, &mut report)? {
                plugins.push((spec, info));
            }
        }
        plugins.sort_by(|a, b| a.0.module.cmp(&b.0.module));
        tracing::info!(target: "dependency", "Generating {} plugins", plugins.len());

        let generated: Vec<_> = stream::iter(plugins.iter().map(|(_, info)| info.clone()))
            .map(|info| {
                let ctx = self.ctx.clone();
                async move {
                    let result = generate_plugin(&ctx, &info).await;
                    (info.plugin_module.clone(), result)
                }
            })
            .buffer_unordered(self.ctx.settings().max_parallel)
            .collect()
            .await;

        for (plugin, result) in generated {
            if let Some(result) = absorb(result.map(Some), &plugin, &mut report)? {
                report.plugins.push(result);
            }
        }

        self.validate(&plugins, &mut report).await?;
        report.errors.extend(self.ctx.descriptors.anomalies());
        report.finalize(&SuppressionSet::new(self.ctx.settings().suppressions.iter().cloned()));

        tracing::info!(
            target: "dependency",
            "Plugin generation finished: {} plugins, {} errors",
            report.plugins.len(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Plugins to validate: the configured ones, the synthetic test plugins
    /// and every plugin a product bundles. Sorted by module.
    async fn validated_plugins(
        &self,
        configured: &[(PluginSpec, Arc<PluginContentInfo>)],
        report: &mut GenerationReport,
    ) -> DepgenResult<Vec<Arc<PluginContentInfo>>> {
        let ctx = &self.ctx;
        let mut plugins: BTreeMap<String, Arc<PluginContentInfo>> =
            configured.iter().map(|(spec, info)| (spec.module.clone(), info.clone())).collect();

        let others = ctx
            .config
            .dsl_test_plugins
            .iter()
            .map(|spec| &spec.module)
            .chain(ctx.config.products.iter().flat_map(|p| p.plugins.iter()))
            .filter(|module| ctx.config.plugin(module).is_none());
        for module in others {
            if plugins.contains_key(module) {
                continue;
            }
            if let Some(info) = absorb(ctx.plugin_info(module).await, module, report)? {
                plugins.insert(module.clone(), info);
            }
        }
        Ok(plugins.into_values().collect())
    }

    /// Check every plugin's dependencies against what products bundle.
    async fn validate(
        &self,
        configured: &[(PluginSpec, Arc<PluginContentInfo>)],
        report: &mut GenerationReport,
    ) -> DepgenResult<()> {
        let ctx = &self.ctx;
        let settings = ctx.settings();
        let all_plugins = self.validated_plugins(configured, report).await?;

        let is_test_plugin =
            |info: &PluginContentInfo| info.content_modules.iter().any(|m| settings.test_framework_modules.contains(m));

        let mut available: HashSet<String> =
            ctx.traversal.modules_of_all(ctx.config.products.iter().flat_map(|p| p.module_sets.iter()));
        for info in all_plugins.iter().filter(|info| !is_test_plugin(info)) {
            available.insert(info.plugin_module.clone());
            available.extend(info.content_modules.iter().cloned());
        }

        for info in &all_plugins {
            let allowed_missing: &[String] =
                ctx.config.plugin(&info.plugin_module).map(|p| p.allowed_missing.as_slice()).unwrap_or_default();
            let required = absorb(plugin_requirements(ctx, info).await, &info.plugin_module, report)?;

            for (dependent, dep) in required {
                if available.contains(&dep) || allowed_missing.contains(&dep) {
                    continue;
                }
                let mut chain = vec![info.plugin_module.clone()];
                if dependent != info.plugin_module {
                    chain.push(dependent.clone());
                }
                chain.push(dep.clone());
                report.errors.push(ValidationError::MissingTransitiveDependency {
                    context: info.plugin_module.clone(),
                    dependent,
                    missing: dep,
                    chain,
                });
            }
        }
        Ok(())
    }
}

/// Every `(dependent, dependency)` pair the plugin needs at runtime: its own
/// generated and existing dependencies plus those of its production content
/// modules, minus its own content. Sorted.
async fn plugin_requirements(ctx: &GenerationContext, info: &PluginContentInfo) -> DepgenResult<BTreeSet<(String, String)>> {
    let mut required: BTreeSet<(String, String)> = ctx
        .plugin_edges(info)
        .await?
        .into_iter()
        .map(|dep| (info.plugin_module.clone(), dep))
        .collect();
    for module in info.content_modules.iter().filter(|m| !is_test_module_name(m)) {
        for dep in ctx.edges(module).await?.iter() {
            required.insert((module.clone(), dep.clone()));
        }
    }

    required.retain(|(_, dep)| !info.has_content(dep) && dep != &info.plugin_module);
    Ok(required)
}

async fn generate_plugin(ctx: &GenerationContext, info: &PluginContentInfo) -> DepgenResult<PluginDependencyFileResult> {
    let plugin = match &info.path {
        Some(path) if !info.skip_generation => {
            let deps = ctx.plugin_dependencies(info).await?;
            let updated = update_dependencies(&info.content, &deps, |m| ctx.preserve_existing_module(m))?;
            let status = ctx.strategy.update(path, &info.content, &updated).await?;
            Some(DependencyFileResult {
                module_name: info.plugin_module.clone(),
                path: path.clone(),
                status,
                count: deps.len(),
            })
        }
        _ => None,
    };

    let mut content_modules = Vec::new();
    for module in &info.content_modules {
        if let Some(result) = ctx.generate_descriptor(module).await? {
            content_modules.push(result);
        }
        if !is_test_module_name(module)
            && let Some(result) = ctx.generate_descriptor(&format!("{module}{TEST_MODULE_SUFFIX}")).await?
        {
            content_modules.push(result);
        }
    }

    Ok(PluginDependencyFileResult {
        plugin_module: info.plugin_module.clone(),
        plugin,
        content_modules,
    })
}
