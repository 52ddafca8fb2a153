use std::collections::BTreeMap;

use crate::config::backends::BackendEnv;
use crate::config::model::{DevhostConfig, ServiceConfig};
use crate::docker::network::resource_labels;
use crate::docker::{ContainerSpec, PortMap};
use crate::layout::ProjectLayout;

/// Where a service's container is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainerPhase {
    #[default]
    Absent,
    Creating,
    Running,
    Stopping,
    Stopped,
    Removed,
}

/// One logical backend service.
///
/// A service with an `id` is presumed running. A service without a `spec`
/// is reachable (proxy, health) but not container-managed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Service {
    pub name: String,
    pub id: Option<String>,
    pub image: Option<String>,
    pub version: String,
    /// Host port; 0 when unknown.
    pub port: u16,
    pub host: String,
    pub handle: Option<String>,
    pub proxy: bool,
    pub health_endpoint: Option<String>,
    pub admin_secret: Option<String>,
    /// Reconciliation adopts this port instead of inspecting the container.
    pub pinned_port: Option<u16>,
    pub spec: Option<ContainerSpec>,
    pub phase: ContainerPhase,
}

impl Service {
    /// A service known only by name, as recovered from a running container.
    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: "localhost".to_string(),
            ..Default::default()
        }
    }

    /// Whether the service's container was started or adopted while running.
    pub fn is_running(&self) -> bool {
        self.id.is_some() && self.phase == ContainerPhase::Running
    }

    /// `host:port`, or `None` until a port is known.
    pub fn address(&self) -> Option<String> {
        (self.port != 0 && !self.host.is_empty()).then(|| format!("{}:{}", self.host, self.port))
    }

    pub fn image_ref(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(|image| format!("{}:{}", image, self.version))
    }

    /// Absolute URL to poll, resolving a bare path against the address.
    pub fn health_url(&self) -> Option<String> {
        let endpoint = self.health_endpoint.as_deref().filter(|e| !e.is_empty())?;
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Some(endpoint.to_string());
        }
        let address = self.address()?;
        let path = endpoint.strip_prefix('/').unwrap_or(endpoint);
        Some(format!("http://{}/{}", address, path))
    }

    pub fn container_name(&self, prefix: &str) -> String {
        container_name(prefix, &self.name)
    }
}

pub fn container_name(prefix: &str, service: &str) -> String {
    format!("{}_{}", prefix, service)
}

/// Build the service map from config.
pub fn declared_services(config: &DevhostConfig, layout: &ProjectLayout) -> BTreeMap<String, Service> {
    config
        .services
        .iter()
        .map(|(name, svc)| {
            let spec = svc
                .image
                .as_ref()
                .map(|image| container_spec(config, layout, name, image, svc));
            let service = Service {
                name: name.clone(),
                id: None,
                image: svc.image.clone(),
                version: svc.version.clone(),
                port: svc.port.unwrap_or(0),
                host: svc.host.clone(),
                handle: svc.handle.clone(),
                proxy: svc.proxy,
                health_endpoint: svc.health_endpoint.clone(),
                admin_secret: svc.admin_secret.clone(),
                pinned_port: svc.pinned_port,
                spec,
                phase: ContainerPhase::Absent,
            };
            (name.clone(), service)
        })
        .collect()
}

fn container_spec(
    config: &DevhostConfig,
    layout: &ProjectLayout,
    name: &str,
    image: &str,
    svc: &ServiceConfig,
) -> ContainerSpec {
    // Service env overrides the global env; backends come last.
    let mut env: BTreeMap<String, String> = config.env.clone();
    env.extend(svc.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(storage) = &svc.storage {
        env.extend(storage.container_env());
    }
    if let Some(antivirus) = &svc.antivirus {
        env.extend(antivirus.container_env());
    }

    let port_maps = svc
        .port
        .map(|host_port| PortMap {
            container_port: svc.container_port.unwrap_or(host_port),
            host_port,
        })
        .into_iter()
        .collect();

    ContainerSpec {
        image: format!("{}:{}", image, svc.version),
        env: env.into_iter().collect(),
        port_maps,
        binds: svc.volumes.iter().map(|v| layout.expand(v)).collect(),
        cmd: svc.command.clone().map(|c| c.into_vec()),
        entrypoint: svc.entrypoint.clone().map(|e| e.into_vec()),
        labels: resource_labels(&config.project.prefix, name),
    }
}
