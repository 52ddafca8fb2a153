use bollard::models::{ContainerCreateBody, ContainerSummaryStateEnum, HostConfig, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, ListContainersOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::Docker;
use std::collections::HashMap;

use crate::docker::{DockerError, DockerResult, ObservedContainer, ObservedPort};

/// Port mapping: (container_port, host_port).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMap {
    pub container_port: u16,
    pub host_port: u16,
}

/// Everything needed to create one service container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSpec {
    /// Full image reference, `repo:tag`.
    pub image: String,
    pub env: Vec<(String, String)>,
    pub port_maps: Vec<PortMap>,
    /// Bind mounts in `host:container[:mode]` form.
    pub binds: Vec<String>,
    pub cmd: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub labels: HashMap<String, String>,
}

pub(crate) fn create_body(spec: &ContainerSpec, network: &str) -> ContainerCreateBody {
    let env: Vec<String> = spec
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
    let mut exposed_ports: Vec<String> = Vec::new();
    for pm in &spec.port_maps {
        let container_port_key = format!("{}/tcp", pm.container_port);
        port_bindings.insert(
            container_port_key.clone(),
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(pm.host_port.to_string()),
            }]),
        );
        exposed_ports.push(container_port_key);
    }

    let host_config = HostConfig {
        port_bindings: Some(port_bindings),
        binds: Some(spec.binds.clone()),
        network_mode: Some(network.to_string()),
        ..Default::default()
    };

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        env: Some(env),
        exposed_ports: Some(exposed_ports),
        host_config: Some(host_config),
        labels: Some(spec.labels.clone()),
        cmd: spec.cmd.clone(),
        entrypoint: spec.entrypoint.clone(),
        ..Default::default()
    }
}

/// Create a container attached to `network`, replacing any stale container
/// of the same name.
pub async fn create_container(
    docker: &Docker,
    name: &str,
    spec: &ContainerSpec,
    network: &str,
) -> DockerResult<String> {
    // A leftover stopped container would make the create conflict.
    match remove_container(docker, name).await {
        Ok(()) => tracing::debug!(container = %name, "removed stale container"),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let options = CreateContainerOptions {
        name: Some(name.to_string()),
        ..Default::default()
    };

    let response = docker
        .create_container(Some(options), create_body(spec, network))
        .await
        .map_err(|e| DockerError::from_api(e, "image", &spec.image, format!("creating container {name}")))?;

    tracing::debug!(
        container = %name,
        id = %response.id,
        "container created"
    );

    Ok(response.id)
}

/// Start a container by ID.
pub async fn start_container(docker: &Docker, container_id: &str) -> DockerResult<()> {
    docker
        .start_container(container_id, None::<StartContainerOptions>)
        .await
        .map_err(|e| {
            DockerError::from_api(e, "container", container_id, format!("starting container {container_id}"))
        })
}

/// Stop a container with the daemon's default grace period.
/// A container that is already stopped counts as success.
pub async fn stop_container(docker: &Docker, container_id: &str) -> DockerResult<()> {
    match docker
        .stop_container(container_id, None::<StopContainerOptions>)
        .await
    {
        Ok(()) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        }) => Ok(()),
        Err(e) => Err(DockerError::from_api(
            e,
            "container",
            container_id,
            format!("stopping container {container_id}"),
        )),
    }
}

/// Force-remove a container by name or ID.
pub async fn remove_container(docker: &Docker, container_id: &str) -> DockerResult<()> {
    let options = RemoveContainerOptions {
        force: true,
        ..Default::default()
    };
    docker
        .remove_container(container_id, Some(options))
        .await
        .map_err(|e| {
            DockerError::from_api(e, "container", container_id, format!("removing container {container_id}"))
        })
}

/// List every container, stopped ones included, whose name carries `<prefix>_`.
pub async fn list_prefixed_containers(
    docker: &Docker,
    prefix: &str,
) -> DockerResult<Vec<ObservedContainer>> {
    let filters = HashMap::from([("name".to_string(), vec![format!("{}_", prefix)])]);
    let options = ListContainersOptions {
        all: true,
        filters: Some(filters),
        ..Default::default()
    };
    let summaries = docker
        .list_containers(Some(options))
        .await
        .map_err(|source| DockerError::Api {
            context: "listing project containers".to_string(),
            source,
        })?;

    Ok(summaries
        .into_iter()
        .filter_map(|s| {
            let ports = s
                .ports
                .unwrap_or_default()
                .into_iter()
                .map(|p| ObservedPort {
                    ip: p.ip,
                    public_port: p.public_port,
                })
                .collect();
            let running = s.state == Some(ContainerSummaryStateEnum::RUNNING);
            Some(ObservedContainer {
                id: s.id?,
                names: s.names.unwrap_or_default(),
                ports,
                running,
            })
        })
        .collect())
}
