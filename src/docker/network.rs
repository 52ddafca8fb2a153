use bollard::models::NetworkCreateRequest;
use bollard::query_parameters::{ListNetworksOptions, PruneNetworksOptions};
use bollard::Docker;
use std::collections::HashMap;

use crate::docker::{DockerError, DockerResult};

pub const PROJECT_LABEL: &str = "devhost.project";

/// Look up a network by exact name. The daemon's name filter matches
/// substrings, so results are checked again here.
pub async fn find_network(docker: &Docker, name: &str) -> DockerResult<Option<String>> {
    let filters = HashMap::from([("name".to_string(), vec![name.to_string()])]);
    let networks = docker
        .list_networks(Some(ListNetworksOptions {
            filters: Some(filters),
            ..Default::default()
        }))
        .await
        .map_err(|source| DockerError::Api {
            context: "listing networks".to_string(),
            source,
        })?;

    Ok(networks
        .into_iter()
        .find(|n| n.name.as_deref() == Some(name))
        .and_then(|n| n.id))
}

/// Create a project-scoped bridge network and return its id.
pub async fn create_network(
    docker: &Docker,
    name: &str,
    labels: HashMap<String, String>,
) -> DockerResult<String> {
    let config = NetworkCreateRequest {
        name: name.to_string(),
        driver: Some("bridge".to_string()),
        labels: Some(labels),
        ..Default::default()
    };
    let response = docker
        .create_network(config)
        .await
        .map_err(|source| DockerError::Api {
            context: format!("creating network {name}"),
            source,
        })?;
    Ok(response.id)
}

/// Remove a network; a missing network is reported as `NotFound`.
pub async fn remove_network(docker: &Docker, id: &str) -> DockerResult<()> {
    docker
        .remove_network(id)
        .await
        .map_err(|e| DockerError::from_api(e, "network", id, format!("removing network {id}")))
}

/// Remove unused networks labelled with the project prefix.
pub async fn prune_networks(docker: &Docker, prefix: &str) -> DockerResult<()> {
    let filters = HashMap::from([(
        "label".to_string(),
        vec![format!("{}={}", PROJECT_LABEL, prefix)],
    )]);
    let response = docker
        .prune_networks(Some(PruneNetworksOptions {
            filters: Some(filters),
            ..Default::default()
        }))
        .await
        .map_err(|source| DockerError::Api {
            context: "pruning networks".to_string(),
            source,
        })?;
    tracing::debug!(removed = ?response.networks_deleted, "pruned networks");
    Ok(())
}

/// Build the standard set of labels for a Docker resource.
pub fn resource_labels(prefix: &str, service: &str) -> HashMap<String, String> {
    HashMap::from([
        (PROJECT_LABEL.to_string(), prefix.to_string()),
        ("devhost.service".to_string(), service.to_string()),
        ("devhost.managed-by".to_string(), "devhost".to_string()),
    ])
}
