//! Validation rules.
//!
//! Each rule runs as its own task against the shared [`GenerationContext`]
//! and returns a partial report. A fatal error aborts the run; anything else
//! a rule trips over is recorded as a failed job of that rule.

mod library_scope;
mod product_module_sets;
mod self_contained;
mod test_library_scope;

use futures::future::join_all;
use std::sync::Arc;

use super::context::GenerationContext;
use super::report::GenerationReport;
use crate::core::{DepgenError, DepgenResult};

/// The validation rules, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// Self-contained module sets stay inside their closure
    SelfContained,
    /// Everything a product reaches is bundled into it
    ProductModuleSets,
    /// Library modules export their libraries with `compile` scope
    LibraryScope,
    /// Production modules use test libraries with `test` scope only
    TestLibraryScope,
}

impl ValidationRule {
    /// Every rule.
    pub const ALL: [Self; 4] = [Self::SelfContained, Self::ProductModuleSets, Self::LibraryScope, Self::TestLibraryScope];

    /// Rule name used in logs and failures.
    pub fn name(self) -> &'static str {
        match self {
            Self::SelfContained => "self-contained",
            Self::ProductModuleSets => "product-module-sets",
            Self::LibraryScope => "library-scope",
            Self::TestLibraryScope => "test-library-scope",
        }
    }

    /// Run the rule.
    pub async fn run(self, ctx: Arc<GenerationContext>) -> DepgenResult<GenerationReport> {
        tracing::debug!(target: "validation", "Running {} validation", self.name());
        match self {
            Self::SelfContained => self_contained::validate(ctx).await,
            Self::ProductModuleSets => product_module_sets::validate(ctx).await,
            Self::LibraryScope => library_scope::validate(ctx).await,
            Self::TestLibraryScope => test_library_scope::validate(ctx).await,
        }
    }
}

/// Run every rule concurrently and merge their reports.
pub async fn run_all(ctx: Arc<GenerationContext>) -> DepgenResult<GenerationReport> {
    let tasks = ValidationRule::ALL.map(|rule| (rule, tokio::spawn(rule.run(ctx.clone()))));

    let mut report = GenerationReport::default();
    let (rules, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
    for (rule, joined) in rules.into_iter().zip(join_all(handles).await) {
        match joined {
            Ok(Ok(partial)) => report.merge(partial),
            Ok(Err(e)) if e.is_fatal() => return Err(e),
            Ok(Err(e)) => report.fail(rule.name(), e),
            Err(e) => report.fail(rule.name(), DepgenError::other(format!("validation task panicked: {e}"))),
        }
    }

    tracing::info!(
        target: "validation",
        "Validation finished with {} errors",
        report.errors.len()
    );
    Ok(report)
}

/// Keep going after a non-fatal error, recording it against `context`.
pub(crate) fn absorb<T: Default>(
    result: DepgenResult<T>,
    context: &str,
    report: &mut GenerationReport,
) -> DepgenResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            report.fail(context, e);
            Ok(T::default())
        }
    }
}
