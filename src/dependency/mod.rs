//! Dependency generation and validation pipeline.
//!
//! A run goes collect → analyze → validate → write → aggregate:
//!
//! 1. [`GenerationContext::new`] indexes the module sets once
//!    ([`ModuleSetTraversalCache`]); a cycle aborts the run here.
//! 2. The generators ([`ProductModuleGenerator`], [`PluginDependencyGenerator`])
//!    collect the modules and plugins to process.
//! 3. Descriptors and plugin layouts are analyzed on demand through
//!    single-flight caches ([`AsyncCache`]), so concurrent jobs asking for the
//!    same module share one read.
//! 4. The validation rules run as independent tasks next to generation.
//! 5. Everything is merged into one [`GenerationReport`], sorted and with
//!    suppressions applied.
//!
//! Output never depends on scheduling order: dependency lists and
//! diagnostics are sorted and deduplicated before they are written or
//! reported.

pub mod async_cache;
pub mod context;
pub mod descriptor_cache;
pub mod plugin_content;
pub mod plugin_generator;
pub mod product_generator;
pub mod report;
pub mod traversal;
pub mod validation;
pub mod write;

pub use async_cache::AsyncCache;
pub use context::{DependencyFilter, GenerationContext, LibraryModuleFilter};
pub use descriptor_cache::{DescriptorInfo, ModuleDescriptorCache};
pub use plugin_content::{ContentProvenance, PluginContentCache, PluginContentInfo};
pub use plugin_generator::PluginDependencyGenerator;
pub use product_generator::ProductModuleGenerator;
pub use report::{
    DependencyFileResult, GenerationReport, JobFailure, PluginDependencyFileResult, ProposedDiff,
    SuppressionSet, ValidationCategory, ValidationError,
};
pub use traversal::ModuleSetTraversalCache;
pub use validation::ValidationRule;
pub use write::{FileStatus, WriteStrategy};

use std::sync::Arc;

/// Which generators a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationScope {
    /// Module-set modules and plugins
    #[default]
    All,
    /// Module-set modules and the validation rules only
    Products,
    /// Plugins only
    Plugins,
}

/// Run the selected generators concurrently and merge their reports.
pub async fn generate(ctx: Arc<GenerationContext>, scope: GenerationScope) -> crate::core::DepgenResult<GenerationReport> {
    let products = ProductModuleGenerator::new(ctx.clone());
    let plugins = PluginDependencyGenerator::new(ctx.clone());

    let mut report = match scope {
        GenerationScope::Products => products.generate().await?,
        GenerationScope::Plugins => plugins.generate().await?,
        GenerationScope::All => {
            let (mut products, plugins) = tokio::try_join!(products.generate(), plugins.generate())?;
            products.merge(plugins);
            products
        }
    };

    report.finalize(&SuppressionSet::new(ctx.settings().suppressions.iter().cloned()));
    Ok(report)
}
