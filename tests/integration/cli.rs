use assert_cmd::Command;
use depgen_cli::test_utils::ProjectFixture;
use predicates::prelude::*;

const EMPTY: &str = ProjectFixture::EMPTY_DESCRIPTOR;

/// m1 depends on m2; m2 is only bundled when `ext` is part of the product.
fn project(product_sets: &str) -> ProjectFixture {
    let project = ProjectFixture::new().unwrap();
    project.module("m1", &["m2"]).unwrap();
    project.module("m2", &[]).unwrap();
    project.descriptor("m1", EMPTY).unwrap();
    project.descriptor("m2", EMPTY).unwrap();
    project
        .config(&format!(
            r#"
[[module-sets]]
name = "core"
modules = [{{ name = "m1", include-dependencies = true }}]

[[module-sets]]
name = "ext"
modules = ["m2"]

[[products]]
name = "IDEA"
module-sets = {product_sets}
"#
        ))
        .unwrap();
    project
}

fn depgen(project: &ProjectFixture) -> Command {
    let mut cmd = Command::cargo_bin("depgen").unwrap();
    cmd.current_dir(project.path()).env("NO_COLOR", "1").env_remove("DEPGEN_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_validate_fails_on_missing_dependency() {
    let project = project(r#"["core"]"#);

    depgen(&project)
        .arg("validate")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Missing transitive dependencies (1)"))
        .stdout(predicate::str::contains("suppress with: missing-transitive-dependency:m1"))
        .stderr(predicate::str::contains("Dependency validation failed: 1 errors"));

    // validate never writes
    assert_eq!(project.read(ProjectFixture::descriptor_path("m1")).unwrap(), EMPTY);
}

#[test]
fn test_generate_writes_descriptors() {
    let project = project(r#"["core", "ext"]"#);

    depgen(&project)
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files: 1 updated"));

    let written = project.read(ProjectFixture::descriptor_path("m1")).unwrap();
    assert!(written.contains("<module name=\"m2\"/>"), "{written}");

    // Second run has nothing left to do
    depgen(&project)
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files: 0 updated, 0 pending"));
}

#[test]
fn test_generate_dry_run_reports_pending() {
    let project = project(r#"["core", "ext"]"#);

    depgen(&project)
        .args(["generate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 pending"));

    assert_eq!(project.read(ProjectFixture::descriptor_path("m1")).unwrap(), EMPTY);
}

#[test]
fn test_json_output() {
    let project = project(r#"["core"]"#);

    let output = depgen(&project).args(["validate", "--format", "json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let errors = report["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["category"], "missing-transitive-dependency");
    assert_eq!(errors[0]["context"], "IDEA");
    assert_eq!(errors[0]["suppression_key"], "missing-transitive-dependency:m1");
}

#[test]
fn test_suppression_makes_validation_pass() {
    let project = project(r#"["core"]"#);
    let config = project.read("depgen.toml").unwrap();
    project
        .config(&format!(
            "[generation]\nsuppressions = [\"missing-transitive-dependency:m1\"]\n{config}"
        ))
        .unwrap();

    depgen(&project)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Suppressed errors: 1"));
}

#[test]
fn test_missing_configuration() {
    let project = ProjectFixture::new().unwrap();
    project.module("m1", &[]).unwrap();

    depgen(&project)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("--project/--config"));
}

#[test]
fn test_explicit_project_and_config() {
    let project = project(r#"["core", "ext"]"#);
    let moved = project.path().join("conf").join("products.toml");
    std::fs::create_dir_all(moved.parent().unwrap()).unwrap();
    std::fs::rename(project.path().join("depgen.toml"), &moved).unwrap();

    let elsewhere = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("depgen").unwrap();
    cmd.current_dir(elsewhere.path())
        .env("NO_COLOR", "1")
        .env_remove("DEPGEN_CONFIG")
        .arg("--project")
        .arg(project.path())
        .arg("--config")
        .arg(&moved)
        .args(["--quiet", "validate"])
        .assert()
        .success();
}

#[test]
fn test_cycle_is_fatal() {
    let project = ProjectFixture::new().unwrap();
    project.module("m1", &[]).unwrap();
    project
        .config(
            r#"
[[module-sets]]
name = "a"
module-sets = ["b"]

[[module-sets]]
name = "b"
module-sets = ["a"]
"#,
        )
        .unwrap();

    depgen(&project).arg("validate").assert().failure().stderr(predicate::str::contains("a → b → a"));
}
