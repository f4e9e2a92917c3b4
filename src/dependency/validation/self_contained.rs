//! Self-contained module sets must not depend on anything outside their
//! own closure, except the set's explicit allow-list.
//!
//! Any path leaving the closure has a first edge from a closure module to an
//! outside one, so checking the edges of every closure module is enough.

use std::collections::HashSet;
use std::sync::Arc;

use super::absorb;
use crate::core::DepgenResult;
use crate::dependency::context::GenerationContext;
use crate::dependency::report::{GenerationReport, ValidationError};

pub(super) async fn validate(ctx: Arc<GenerationContext>) -> DepgenResult<GenerationReport> {
    let mut report = GenerationReport::default();

    for set in ctx.config.module_sets.iter().filter(|s| s.self_contained) {
        let Some(closure) = ctx.traversal.modules_of(&set.name) else {
            continue;
        };
        let members: HashSet<&str> = closure.iter().map(String::as_str).collect();
        let mut reported = HashSet::new();

        for module in closure {
            let edges = absorb(ctx.edges(module).await.map(|e| e.to_vec()), module, &mut report)?;
            for dep in edges {
                if members.contains(dep.as_str()) || set.allowed_external.contains(&dep) {
                    continue;
                }
                if reported.insert(dep.clone()) {
                    report.errors.push(ValidationError::SelfContainedViolation {
                        set: set.name.clone(),
                        module: module.clone(),
                        dependency: dep,
                    });
                }
            }
        }
    }

    Ok(report)
}
