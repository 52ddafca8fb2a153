use crate::common::TestProject;
use predicates::prelude::*;

const VALID: &str = r#"
[project]
name = "test"

[services.postgres]
image = "nhost/postgres"
port = 5432

[services.hasura]
image = "hasura/graphql-engine"
port = 9695
container_port = 8080
handle = "/v1/graphql"
proxy = true
"#;

fn validate(project: &TestProject) -> bool {
    let (config, source) =
        devhost::config::load_config_with_source(&project.config_path).unwrap();
    devhost::config::validate::validate(&config, &source, "config.toml").is_ok()
}

#[test]
fn validate_valid_config() {
    let project = TestProject::new(VALID);
    assert!(validate(&project));
}

#[test]
fn validate_catches_duplicate_ports() {
    let project = TestProject::new(
        r#"
        [project]
        name = "test"

        [services.hasura]
        image = "hasura/graphql-engine"
        port = 8080

        [services.auth]
        image = "nhost/hasura-auth"
        port = 8080
    "#,
    );
    assert!(!validate(&project));
}

#[test]
fn validate_catches_undeclared_hasura_service() {
    let project = TestProject::new(
        r#"
        [project]
        name = "test"

        [services.postgres]
        image = "nhost/postgres"
        port = 5432
    "#,
    );
    assert!(!validate(&project));
}

#[test]
fn validate_command_reports_service_count() {
    let project = TestProject::new(VALID);
    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["validate", "-f", project.config_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 services"));
}

#[test]
fn validate_command_fails_on_bad_handle() {
    let project = TestProject::new(
        r#"
        [project]
        name = "test"

        [services.hasura]
        image = "hasura/graphql-engine"
        port = 8080
        handle = "v1/graphql"
        proxy = true
    "#,
    );
    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["validate", "-f", project.config_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with `/`"));
}
