//! Production modules must use test-framework libraries with `test` scope.
//!
//! Violations become proposed diffs of the build file and are never applied.

use std::sync::Arc;

use super::absorb;
use crate::build_graph::build_file::{DependencyKind, ScopeChange, line_diff, set_dependency_scopes};
use crate::build_graph::{BuildModule, DependencyScope};
use crate::constants::is_test_module_name;
use crate::core::DepgenResult;
use crate::dependency::context::GenerationContext;
use crate::dependency::report::{GenerationReport, ProposedDiff};
use crate::utils::read_optional;

pub(super) async fn validate(ctx: Arc<GenerationContext>) -> DepgenResult<GenerationReport> {
    let mut report = GenerationReport::default();
    let settings = ctx.settings();
    if settings.test_framework_libraries.is_empty() {
        return Ok(report);
    }

    for name in ctx.provider.module_names() {
        if is_test_module_name(&name)
            || settings.test_framework_modules.contains(&name)
            || name.starts_with(&settings.library_module_prefix)
        {
            continue;
        }
        let Some(build) = ctx.provider.module(&name) else {
            continue;
        };
        let changes = scope_changes(build, &settings.test_framework_libraries, &settings.library_module_prefix);
        if changes.is_empty() {
            continue;
        }

        let path = build.build_file.clone();
        let Some(old) = absorb(read_optional(&path).await, &name, &mut report)? else {
            continue;
        };
        let new = absorb(set_dependency_scopes(&old, &changes).map(Some), &name, &mut report)?;
        if let Some(new) = new {
            report.proposed_diffs.push(ProposedDiff {
                module: name.clone(),
                path,
                diff: line_diff(&old, &new),
            });
        }
    }

    tracing::debug!(
        target: "validation",
        "{} modules use test libraries in production scope",
        report.proposed_diffs.len()
    );
    Ok(report)
}

fn scope_changes(build: &BuildModule, libraries: &[String], library_prefix: &str) -> Vec<ScopeChange> {
    let mut changes = Vec::new();
    for lib in build.libraries.iter().filter(|l| l.scope.is_production()) {
        if libraries.contains(&lib.name) {
            changes.push(ScopeChange {
                kind: DependencyKind::Library,
                name: lib.name.clone(),
                scope: DependencyScope::Test,
            });
        }
    }
    for dep in build.dependencies.iter().filter(|d| d.scope.is_production()) {
        let wraps_test_library = dep
            .name
            .strip_prefix(library_prefix)
            .is_some_and(|lib| libraries.iter().any(|l| l == lib));
        if wraps_test_library {
            changes.push(ScopeChange {
                kind: DependencyKind::Module,
                name: dep.name.clone(),
                scope: DependencyScope::Test,
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_scope_changes() {
        let build = BuildModule::parse(
            Path::new("/p/m/module.toml"),
            r#"
name = "m"

[[dependencies]]
name = "intellij.libraries.junit4"

[[dependencies]]
name = "intellij.libraries.guava"

[[libraries]]
name = "junit5"
scope = "runtime"

[[libraries]]
name = "junit4"
scope = "test"
"#,
        )
        .unwrap();

        let libraries = vec!["junit4".to_string(), "junit5".to_string()];
        let changes = scope_changes(&build, &libraries, "intellij.libraries.");
        let names: Vec<(&str, DependencyKind)> = changes.iter().map(|c| (c.name.as_str(), c.kind)).collect();
        assert_eq!(
            names,
            vec![("junit5", DependencyKind::Library), ("intellij.libraries.junit4", DependencyKind::Module)]
        );
        assert!(changes.iter().all(|c| c.scope == DependencyScope::Test));
    }
}
