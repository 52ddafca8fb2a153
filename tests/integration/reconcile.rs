use crate::common::*;
use devhost::docker::DockerClient;
use devhost::environment::{Environment, Service};
use std::collections::BTreeMap;

#[tokio::test]
async fn running_container_is_adopted_and_purged() {
    let prefix = unique_prefix("adopt");
    let _guard = scopeguard::guard(prefix.clone(), |p| docker_cleanup(&p));
    let port = free_port();

    let status = std::process::Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            &format!("{prefix}_web"),
            "-p",
            &format!("127.0.0.1:{port}:80"),
            "nginx:alpine",
        ])
        .status()
        .unwrap();
    assert!(status.success());

    let mut services = BTreeMap::new();
    services.insert("web".to_string(), Service::blank("web"));

    let docker = DockerClient::connect().await.unwrap();
    let mut env = Environment::new(docker, &prefix, services);
    env.init().await.unwrap();

    assert!(env.active);
    let web = &env.services["web"];
    assert!(web.id.is_some());
    assert_eq!(web.port, port);

    let report = env.shutdown(true).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.removed, vec!["web".to_string()]);
    assert!(docker_containers(&prefix, true).is_empty());
    assert!(!env.active);
    assert!(env.services.is_empty());
}
