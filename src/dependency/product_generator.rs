//! Product-module generation.
//!
//! Regenerates the descriptors of module-set modules flagged
//! `include-dependencies` (or matching a generated name prefix) and runs the
//! validation rules alongside.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

use super::context::GenerationContext;
use super::report::{GenerationReport, SuppressionSet};
use super::validation;
use crate::core::{DepgenError, DepgenResult};

/// Generator for module-set modules.
pub struct ProductModuleGenerator {
    ctx: Arc<GenerationContext>,
}

impl ProductModuleGenerator {
    /// Create a generator over a run context.
    pub fn new(ctx: Arc<GenerationContext>) -> Self {
        Self {
            ctx,
        }
    }

    /// Modules whose descriptors are generated, in traversal order.
    pub fn targets(&self) -> Vec<String> {
        let prefixes = &self.ctx.settings().generated_prefixes;
        let mut seen = HashSet::new();
        self.ctx
            .traversal
            .entries()
            .iter()
            .filter(|entry| entry.include_dependencies || prefixes.iter().any(|p| entry.name.starts_with(p.as_str())))
            .filter(|entry| seen.insert(entry.name.clone()))
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Generate every target descriptor and validate.
    ///
    /// Fatal errors abort; any other failure of a single module is recorded
    /// and the remaining modules are still generated.
    pub async fn generate(&self) -> DepgenResult<GenerationReport> {
        let targets = self.targets();
        tracing::info!(target: "dependency", "Generating {} module descriptors", targets.len());

        let validations = tokio::spawn(validation::run_all(self.ctx.clone()));

        let results: Vec<_> = stream::iter(targets)
            .map(|module| {
                let ctx = self.ctx.clone();
                async move {
                    let result = ctx.generate_descriptor(&module).await;
                    (module, result)
                }
            })
            .buffer_unordered(self.ctx.settings().max_parallel)
            .collect()
            .await;

        let mut report = GenerationReport::default();
        for (module, result) in results {
            match result {
                Ok(Some(file)) => report.files.push(file),
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    validations.abort();
                    return Err(e);
                }
                Err(e) => report.fail(module, e),
            }
        }

        let validated = validations
            .await
            .map_err(|e| DepgenError::other(format!("validation task panicked: {e}")))??;
        report.merge(validated);
        report.errors.extend(self.ctx.descriptors.anomalies());
        report.finalize(&SuppressionSet::new(self.ctx.settings().suppressions.iter().cloned()));

        tracing::info!(
            target: "dependency",
            "Module generation finished: {} files, {} errors, {} suppressed",
            report.files.len(),
            report.errors.len(),
            report.suppressed.len()
        );
        Ok(report)
    }
}
