use depgen_cli::dependency::{FileStatus, GenerationReport, GenerationScope, ValidationError, WriteStrategy, generate};
use depgen_cli::test_utils::ProjectFixture;

const EMPTY: &str = ProjectFixture::EMPTY_DESCRIPTOR;

async fn run(project: &ProjectFixture, scope: GenerationScope, strategy: WriteStrategy) -> GenerationReport {
    let ctx = project.context(strategy).await.unwrap();
    generate(ctx, scope).await.unwrap()
}

fn missing(report: &GenerationReport) -> Vec<(&str, &str)> {
    report
        .errors
        .iter()
        .filter_map(|e| match e {
            ValidationError::MissingTransitiveDependency {
                context,
                missing,
                ..
            } => Some((context.as_str(), missing.as_str())),
            _ => None,
        })
        .collect()
}

/// `base` needs `ext`; only the `full` product bundles it through a nested set.
/// Plugin `p` ships content module `p.ui`, which needs the platform module `ui`.
fn product_line() -> ProjectFixture {
    let project = ProjectFixture::new().unwrap();
    project.module("base", &["ext"]).unwrap();
    project.module("ext", &[]).unwrap();
    project.module("ui", &[]).unwrap();
    project.module("p", &["base"]).unwrap();
    project.module("p.ui", &["ui"]).unwrap();
    for m in ["base", "ext", "ui", "p.ui"] {
        project.descriptor(m, EMPTY).unwrap();
    }
    project.plugin("p", &["p.ui"]).unwrap();
    project
        .config(
            r#"
[[module-sets]]
name = "core"
modules = [{ name = "base", include-dependencies = true }, "ui"]

[[module-sets]]
name = "extras"
modules = ["ext"]

[[module-sets]]
name = "full"
module-sets = ["core", "extras"]

[[plugins]]
module = "p"

[[products]]
name = "Lite"
module-sets = ["core"]

[[products]]
name = "Ultimate"
module-sets = ["full"]
plugins = ["p"]
"#,
        )
        .unwrap();
    project
}

#[tokio::test]
async fn test_each_product_is_validated_against_its_own_layout() {
    let project = product_line();
    let report = run(&project, GenerationScope::All, WriteStrategy::DryRun).await;

    assert_eq!(missing(&report), vec![("Lite", "ext")]);
    assert_eq!(report.errors.len(), 1, "{}", report.render_text());
}

#[tokio::test]
async fn test_products_scope_leaves_plugins_alone() {
    let project = product_line();
    let plugin_xml = project.read(ProjectFixture::plugin_path("p")).unwrap();

    let report = run(&project, GenerationScope::Products, WriteStrategy::Apply).await;

    assert!(report.plugins.is_empty());
    assert_eq!(project.read(ProjectFixture::plugin_path("p")).unwrap(), plugin_xml);
    assert_eq!(project.read(ProjectFixture::descriptor_path("p.ui")).unwrap(), EMPTY);
    assert!(project.read(ProjectFixture::descriptor_path("base")).unwrap().contains("<module name=\"ext\"/>"));
}

#[tokio::test]
async fn test_plugins_scope_leaves_module_sets_alone() {
    let project = product_line();

    let report = run(&project, GenerationScope::Plugins, WriteStrategy::Apply).await;

    assert!(report.errors.is_empty(), "{}", report.render_text());
    assert_eq!(report.plugins.len(), 1);
    assert_eq!(project.read(ProjectFixture::descriptor_path("base")).unwrap(), EMPTY);

    let plugin_xml = project.read(ProjectFixture::plugin_path("p")).unwrap();
    assert!(plugin_xml.contains("<module name=\"base\"/>"));
    assert!(project.read(ProjectFixture::descriptor_path("p.ui")).unwrap().contains("<module name=\"ui\"/>"));
}

#[tokio::test]
async fn test_apply_then_validate_is_clean_for_bundled_layout() {
    let project = product_line();
    run(&project, GenerationScope::All, WriteStrategy::Apply).await;

    let report = run(&project, GenerationScope::All, WriteStrategy::DryRun).await;
    assert_eq!(report.count_status(FileStatus::WouldUpdate), 0, "{}", report.render_text());
}
