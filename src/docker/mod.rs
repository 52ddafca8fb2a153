pub mod container;
pub mod exec;
pub mod image;
pub mod logs;
pub mod network;

#[cfg(test)]
pub(crate) mod fake;

use std::collections::{HashMap, HashSet};
use std::future::Future;

use bollard::Docker;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use container::{ContainerSpec, PortMap};
pub use exec::ExecOutput;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("cannot connect to Docker daemon. Is Docker running?")]
    Unavailable(#[source] bollard::errors::Error),

    #[error("{context}")]
    Api {
        context: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("{0}")]
    Failed(String),
}

impl DockerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DockerError::NotFound { .. })
    }

    /// Map a bollard error, turning 404 into [`DockerError::NotFound`].
    pub(crate) fn from_api(
        err: bollard::errors::Error,
        kind: &'static str,
        name: &str,
        context: impl Into<String>,
    ) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => DockerError::NotFound {
                kind,
                name: name.to_string(),
            },
            source => DockerError::Api {
                context: context.into(),
                source,
            },
        }
    }
}

pub type DockerResult<T> = Result<T, DockerError>;

/// A project container as seen by the daemon, running or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedContainer {
    pub id: String,
    pub names: Vec<String>,
    pub ports: Vec<ObservedPort>,
    pub running: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedPort {
    pub ip: Option<String>,
    pub public_port: Option<u16>,
}

/// The subset of the Docker Engine API the environment drives.
///
/// [`DockerClient`] talks to the daemon; tests use an in-memory fake.
pub trait DockerApi: Send + Sync {
    fn ping(&self) -> impl Future<Output = DockerResult<()>> + Send;

    /// Containers, running or stopped, whose name starts with `<prefix>_`.
    fn list_prefixed_containers(
        &self,
        prefix: &str,
    ) -> impl Future<Output = DockerResult<Vec<ObservedContainer>>> + Send;

    fn find_network(&self, name: &str) -> impl Future<Output = DockerResult<Option<String>>> + Send;

    fn create_network(
        &self,
        name: &str,
        labels: HashMap<String, String>,
    ) -> impl Future<Output = DockerResult<String>> + Send;

    fn remove_network(&self, id: &str) -> impl Future<Output = DockerResult<()>> + Send;

    fn prune_networks(&self, prefix: &str) -> impl Future<Output = DockerResult<()>> + Send;

    /// Every `repo:tag` present locally.
    fn local_image_tags(&self) -> impl Future<Output = DockerResult<HashSet<String>>> + Send;

    fn pull_image(&self, image: &str) -> impl Future<Output = DockerResult<()>> + Send;

    fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
        network: &str,
    ) -> impl Future<Output = DockerResult<String>> + Send;

    fn start_container(&self, id: &str) -> impl Future<Output = DockerResult<()>> + Send;

    fn stop_container(&self, id: &str) -> impl Future<Output = DockerResult<()>> + Send;

    fn remove_container(&self, id: &str) -> impl Future<Output = DockerResult<()>> + Send;

    fn create_exec(
        &self,
        container_id: &str,
        cmd: Vec<String>,
    ) -> impl Future<Output = DockerResult<String>> + Send;

    /// Attach to an exec instance and collect its output until the stream
    /// closes or `cancel` fires.
    fn attach_exec(
        &self,
        exec_id: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = DockerResult<ExecOutput>> + Send;

    fn logs(&self, container_id: &str) -> impl Future<Output = DockerResult<Vec<u8>>> + Send;
}

/// Docker daemon connection backed by bollard.
#[derive(Clone)]
pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Connect with local defaults and negotiate the API version.
    pub async fn connect() -> DockerResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(DockerError::Unavailable)?;
        let docker = docker
            .negotiate_version()
            .await
            .map_err(DockerError::Unavailable)?;
        Ok(Self { docker })
    }

    pub fn inner(&self) -> &Docker {
        &self.docker
    }
}

impl DockerApi for DockerClient {
    async fn ping(&self) -> DockerResult<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(DockerError::Unavailable)
    }

    async fn list_prefixed_containers(&self, prefix: &str) -> DockerResult<Vec<ObservedContainer>> {
        container::list_prefixed_containers(&self.docker, prefix).await
    }

    async fn find_network(&self, name: &str) -> DockerResult<Option<String>> {
        network::find_network(&self.docker, name).await
    }

    async fn create_network(
        &self,
        name: &str,
        labels: HashMap<String, String>,
    ) -> DockerResult<String> {
        network::create_network(&self.docker, name, labels).await
    }

    async fn remove_network(&self, id: &str) -> DockerResult<()> {
        network::remove_network(&self.docker, id).await
    }

    async fn prune_networks(&self, prefix: &str) -> DockerResult<()> {
        network::prune_networks(&self.docker, prefix).await
    }

    async fn local_image_tags(&self) -> DockerResult<HashSet<String>> {
        image::local_image_tags(&self.docker).await
    }

    async fn pull_image(&self, image: &str) -> DockerResult<()> {
        image::pull_image(&self.docker, image).await
    }

    async fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
        network: &str,
    ) -> DockerResult<String> {
        container::create_container(&self.docker, name, spec, network).await
    }

    async fn start_container(&self, id: &str) -> DockerResult<()> {
        container::start_container(&self.docker, id).await
    }

    async fn stop_container(&self, id: &str) -> DockerResult<()> {
        container::stop_container(&self.docker, id).await
    }

    async fn remove_container(&self, id: &str) -> DockerResult<()> {
        container::remove_container(&self.docker, id).await
    }

    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> DockerResult<String> {
        exec::create_exec(&self.docker, container_id, cmd).await
    }

    async fn attach_exec(
        &self,
        exec_id: &str,
        cancel: &CancellationToken,
    ) -> DockerResult<ExecOutput> {
        exec::attach_exec(&self.docker, exec_id, cancel).await
    }

    async fn logs(&self, container_id: &str) -> DockerResult<Vec<u8>> {
        logs::read_logs(&self.docker, container_id).await
    }
}
