//! Library modules must export their libraries with `compile` scope.
//!
//! Wrong scopes are fixed in place through the write strategy. In dry-run
//! mode the pending fix is also reported as an error, since the build file
//! stays wrong until the next applied run.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use super::absorb;
use crate::build_graph::DependencyScope;
use crate::build_graph::build_file::{DependencyKind, ScopeChange, set_dependency_scopes};
use crate::core::{DepgenError, DepgenResult};
use crate::dependency::context::GenerationContext;
use crate::dependency::report::{DependencyFileResult, GenerationReport, ValidationError};
use crate::dependency::write::FileStatus;
use crate::utils::read_optional;

pub(super) async fn validate(ctx: Arc<GenerationContext>) -> DepgenResult<GenerationReport> {
    let modules: Vec<String> =
        ctx.provider.module_names().into_iter().filter(|m| ctx.accepts_library_module(m)).collect();

    let results: Vec<(String, DepgenResult<GenerationReport>)> = stream::iter(modules)
        .map(|module| {
            let ctx = ctx.clone();
            async move {
                let result = fix_module(&ctx, &module).await;
                (module, result)
            }
        })
        .buffer_unordered(ctx.settings().max_parallel)
        .collect()
        .await;

    let mut report = GenerationReport::default();
    for (module, result) in results {
        let partial = absorb(result, &module, &mut report)?;
        report.merge(partial);
    }
    Ok(report)
}

async fn fix_module(ctx: &GenerationContext, module: &str) -> DepgenResult<GenerationReport> {
    let build = ctx.provider.require(module)?;
    let path = build.build_file.clone();
    let wrong: Vec<(String, DependencyScope)> = build
        .libraries
        .iter()
        .filter(|lib| lib.scope != DependencyScope::Compile)
        .map(|lib| (lib.name.clone(), lib.scope))
        .collect();

    let mut report = GenerationReport::default();
    if wrong.is_empty() {
        return Ok(report);
    }

    let changes: Vec<ScopeChange> = wrong
        .iter()
        .map(|(name, _)| ScopeChange {
            kind: DependencyKind::Library,
            name: name.clone(),
            scope: DependencyScope::Compile,
        })
        .collect();

    let old = read_optional(&path).await?.ok_or_else(|| DepgenError::FileSystemError {
        operation: "build file disappeared".to_string(),
        path: path.display().to_string(),
    })?;
    let new = set_dependency_scopes(&old, &changes)?;
    let status = ctx.strategy.update(&path, &old, &new).await?;

    tracing::debug!(
        target: "validation",
        "{module}: {} library scopes corrected ({status})",
        changes.len()
    );

    if status == FileStatus::WouldUpdate {
        report.errors.extend(wrong.into_iter().map(|(library, scope)| ValidationError::LibraryScopeViolation {
            module: module.to_string(),
            library,
            scope,
        }));
    }
    report.files.push(DependencyFileResult {
        module_name: module.to_string(),
        path,
        status,
        count: changes.len(),
    });
    Ok(report)
}
