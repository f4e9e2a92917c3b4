//! Transitive reachability: everything a product's modules need, however
//! indirectly, must be bundled into the product.
//!
//! The walk starts from every bundled module and continues through missing
//! ones, so `A → B → C` with both `B` and `C` absent reports both, each once.
//! A bundled plugin's main module is walked through its plugin.xml edges.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::absorb;
use crate::core::DepgenResult;
use crate::dependency::context::GenerationContext;
use crate::dependency::report::{GenerationReport, ValidationError};
use crate::models::ProductSpec;

pub(super) async fn validate(ctx: Arc<GenerationContext>) -> DepgenResult<GenerationReport> {
    let mut report = GenerationReport::default();
    for product in &ctx.config.products {
        validate_product(&ctx, product, &mut report).await?;
    }
    Ok(report)
}

/// What a product bundles.
#[derive(Default)]
struct ProductLayout {
    /// Module-set closures plus bundled plugins and their content
    modules: BTreeSet<String>,
    /// Plugin-declared `allowed-missing`, by plugin and content module
    allowed_missing: HashMap<String, Vec<String>>,
}

async fn layout(
    ctx: &GenerationContext,
    product: &ProductSpec,
    report: &mut GenerationReport,
) -> DepgenResult<ProductLayout> {
    let mut layout = ProductLayout {
        modules: ctx.traversal.modules_of_all(&product.module_sets).into_iter().collect(),
        ..ProductLayout::default()
    };
    for plugin in &product.plugins {
        let info = absorb(ctx.plugin_info(plugin).await, plugin, report)?;
        layout.modules.insert(plugin.clone());
        let Some(info) = info else {
            continue;
        };
        layout.modules.extend(info.content_modules.iter().cloned());

        let allowed = ctx.config.plugin(plugin).map(|spec| spec.allowed_missing.clone()).unwrap_or_default();
        if !allowed.is_empty() {
            for module in std::iter::once(plugin).chain(info.content_modules.iter()) {
                layout.allowed_missing.entry(module.clone()).or_default().extend(allowed.iter().cloned());
            }
        }
    }
    Ok(layout)
}

async fn validate_product(
    ctx: &GenerationContext,
    product: &ProductSpec,
    report: &mut GenerationReport,
) -> DepgenResult<()> {
    let layout = layout(ctx, product, report).await?;

    let mut visited: HashSet<String> = layout.modules.iter().cloned().collect();
    let mut parent: HashMap<String, String> = HashMap::new();
    let mut queue: VecDeque<String> = layout.modules.iter().cloned().collect();
    let mut missing = 0usize;

    while let Some(module) = queue.pop_front() {
        let edges = absorb(ctx.edges(&module).await.map(|e| e.to_vec()), &module, report)?;
        let allowed = layout.allowed_missing.get(&module);
        for dep in edges {
            if allowed.is_some_and(|allowed| allowed.contains(&dep)) || !visited.insert(dep.clone()) {
                continue;
            }
            parent.insert(dep.clone(), module.clone());

            // layout modules are all pre-visited, so `dep` is not bundled
            missing += 1;
            report.errors.push(ValidationError::MissingTransitiveDependency {
                context: product.name.clone(),
                dependent: module.clone(),
                chain: chain_to(&parent, &dep),
                missing: dep.clone(),
            });
            queue.push_back(dep);
        }
    }

    tracing::debug!(
        target: "validation",
        "Product {}: {} modules, {} unreachable dependencies",
        product.name,
        layout.modules.len(),
        missing
    );
    Ok(())
}

/// Walk parent links back from `node` to a start module.
fn chain_to(parent: &HashMap<String, String>, node: &str) -> Vec<String> {
    let mut chain = vec![node.to_string()];
    let mut current = node;
    while let Some(prev) = parent.get(current) {
        chain.push(prev.clone());
        current = prev;
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_to() {
        let parent: HashMap<String, String> =
            [("b", "a"), ("c", "b")].into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        assert_eq!(chain_to(&parent, "c"), vec!["a", "b", "c"]);
        assert_eq!(chain_to(&parent, "a"), vec!["a"]);
    }
}
