use crate::common::TestProject;
use predicates::prelude::*;

#[test]
fn missing_config_file_is_reported() {
    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["validate", "-f", "/nonexistent/nhost/config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn config_is_discovered_from_a_subdirectory() {
    let project = TestProject::new(
        r#"
        [project]
        name = "discovered"

        [hasura]
        endpoint = "http://localhost:8080"
    "#,
    );
    let nested = project.dir.path().join("functions/src");
    std::fs::create_dir_all(&nested).unwrap();

    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .arg("validate")
        .current_dir(&nested)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 services"));
}

#[test]
fn commands_refuse_an_invalid_config() {
    let project = TestProject::new(
        r#"
        [project]
        name = "broken"

        [services.hasura]
        image = ""
    "#,
    );
    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["down", "-f", project.config_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration errors"));
}
