use crate::common::*;
use predicates::prelude::*;
use std::net::TcpListener;

#[test]
fn dev_refuses_to_start_when_a_port_is_held() {
    let prefix = unique_prefix("ports");
    let _guard = scopeguard::guard(prefix.clone(), |p| docker_cleanup(&p));
    let held = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = held.local_addr().unwrap().port();

    let project = TestProject::new(&format!(
        r#"
[project]
name = "collision"
prefix = "{prefix}"
proxy_port = {proxy}

[hasura]
endpoint = "http://127.0.0.1:9"

[services.web]
image = "nginx"
version = "alpine"
port = {port}
container_port = 80
"#,
        proxy = free_port(),
    ));

    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["dev", "-f", project.config_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!("Port {port} required by 'web'")));

    assert!(docker_containers(&prefix, true).is_empty());
    drop(held);
}
