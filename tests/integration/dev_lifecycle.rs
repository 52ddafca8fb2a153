use crate::common::*;
use predicates::prelude::*;
use std::time::Duration;
use tokio::process::Command;

fn nginx_project(prefix: &str, proxy_port: u16, web_port: u16) -> TestProject {
    TestProject::new(&format!(
        r#"
[project]
name = "lifecycle"
prefix = "{prefix}"
proxy_port = {proxy_port}

[hasura]
cli = "true"
endpoint = "http://127.0.0.1:9"

[services.web]
image = "nginx"
version = "alpine"
port = {web_port}
container_port = 80
handle = "/web"
proxy = true
health_endpoint = "/"
"#
    ))
}

#[tokio::test]
async fn dev_proxies_then_down_and_purge_clean_up() {
    let prefix = unique_prefix("life");
    let _guard = scopeguard::guard(prefix.clone(), |p| docker_cleanup(&p));
    let ports = free_ports(2);
    let (proxy_port, web_port) = (ports[0], ports[1]);
    let project = nginx_project(&prefix, proxy_port, web_port);

    let mut child = Command::new(env!("CARGO_BIN_EXE_devhost"))
        .args(["dev", "-f", project.config_arg()])
        .kill_on_drop(true)
        .spawn()
        .expect("failed to start devhost");

    assert!(
        wait_for_port(proxy_port, Duration::from_secs(120)).await,
        "proxy did not come up on port {proxy_port}"
    );

    let client = reqwest::Client::new();
    let routed = client
        .get(format!("http://127.0.0.1:{proxy_port}/web/index.html"))
        .send()
        .await
        .unwrap();
    let server = routed
        .headers()
        .get("server")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(server.contains("nginx"), "request was not forwarded to nginx");

    let unrouted = client
        .get(format!("http://127.0.0.1:{proxy_port}/nowhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(unrouted.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(unrouted.text().await.unwrap(), "no route");

    let container = format!("{prefix}_web");
    assert!(docker_containers(&prefix, false).contains(&container));
    assert!(docker_network_exists(&prefix));

    #[cfg(unix)]
    {
        let pid = child.id().unwrap();
        nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGINT,
        )
        .ok();
    }

    let status = tokio::time::timeout(Duration::from_secs(60), child.wait())
        .await
        .expect("devhost did not exit in time")
        .expect("failed to wait on devhost");
    assert!(status.success());

    assert!(
        wait_for_port_release(proxy_port, Duration::from_secs(5)).await,
        "proxy port {proxy_port} was not released"
    );
    // Stopped, not removed.
    assert!(docker_containers(&prefix, false).is_empty());
    assert!(docker_containers(&prefix, true).contains(&container));

    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["down", "-f", project.config_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing is running"));

    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["purge", "-f", project.config_arg()])
        .assert()
        .success();
    assert!(docker_containers(&prefix, true).is_empty());
    assert!(!docker_network_exists(&prefix));
}

#[tokio::test]
async fn exec_and_logs_reach_a_running_container() {
    let prefix = unique_prefix("exec");
    let _guard = scopeguard::guard(prefix.clone(), |p| docker_cleanup(&p));
    let web_port = free_port();

    let status = std::process::Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            &format!("{prefix}_web"),
            "-p",
            &format!("127.0.0.1:{web_port}:80"),
            "nginx:alpine",
        ])
        .status()
        .unwrap();
    assert!(status.success());

    let project = nginx_project(&prefix, free_port(), web_port);

    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["execute", "-f", project.config_arg(), "web", "--", "echo", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));

    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["execute", "-f", project.config_arg(), "web", "--", "sh", "-c", "exit 3"])
        .assert()
        .code(3);

    let out = project.dir.path().join("web.log");
    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["logs", "-f", project.config_arg(), "web", "-o", out.to_str().unwrap()])
        .assert()
        .success();
    assert!(out.is_file());

    assert_cmd::Command::cargo_bin("devhost")
        .unwrap()
        .args(["logs", "-f", project.config_arg(), "wbe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did you mean `web`"));
}
