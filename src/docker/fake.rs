//! In-memory stand-in for the Docker daemon.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::docker::{
    ContainerSpec, DockerApi, DockerError, DockerResult, ExecOutput, ObservedContainer,
};

#[derive(Default)]
pub struct FakeState {
    pub running: Vec<ObservedContainer>,
    pub networks: BTreeMap<String, String>,
    pub network_creates: usize,
    pub network_removes: Vec<String>,
    pub prunes: usize,
    pub local_images: HashSet<String>,
    pub pulled: Vec<String>,
    pub failing_pulls: HashSet<String>,
    pub created: Vec<(String, ContainerSpec)>,
    pub started: Vec<String>,
    pub stopped: Vec<String>,
    pub removed: Vec<String>,
    pub failing_stops: HashSet<String>,
    pub missing_containers: HashSet<String>,
    pub exec_output: ExecOutput,
    pub logs: HashMap<String, Vec<u8>>,
    /// Runs on every container start, e.g. to create files a real
    /// container would.
    pub on_start: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

#[derive(Default)]
pub struct FakeDocker {
    pub state: Mutex<FakeState>,
}

impl FakeDocker {
    pub fn with_running(containers: Vec<ObservedContainer>) -> Self {
        let docker = Self::default();
        docker.state.lock().unwrap().running = containers;
        docker
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

impl DockerApi for FakeDocker {
    async fn ping(&self) -> DockerResult<()> {
        Ok(())
    }

    async fn list_prefixed_containers(&self, prefix: &str) -> DockerResult<Vec<ObservedContainer>> {
        let needle = format!("/{}_", prefix);
        Ok(self
            .lock()
            .running
            .iter()
            .filter(|c| c.names.iter().any(|n| n.starts_with(&needle)))
            .cloned()
            .collect())
    }

    async fn find_network(&self, name: &str) -> DockerResult<Option<String>> {
        Ok(self.lock().networks.get(name).cloned())
    }

    async fn create_network(
        &self,
        name: &str,
        _labels: HashMap<String, String>,
    ) -> DockerResult<String> {
        let mut state = self.lock();
        state.network_creates += 1;
        let id = format!("net-{}", state.network_creates);
        state.networks.insert(name.to_string(), id.clone());
        Ok(id)
    }

    async fn remove_network(&self, id: &str) -> DockerResult<()> {
        let mut state = self.lock();
        let before = state.networks.len();
        state.networks.retain(|_, v| v != id);
        if state.networks.len() == before {
            return Err(DockerError::NotFound {
                kind: "network",
                name: id.to_string(),
            });
        }
        state.network_removes.push(id.to_string());
        Ok(())
    }

    async fn prune_networks(&self, _prefix: &str) -> DockerResult<()> {
        self.lock().prunes += 1;
        Ok(())
    }

    async fn local_image_tags(&self) -> DockerResult<HashSet<String>> {
        Ok(self.lock().local_images.clone())
    }

    async fn pull_image(&self, image: &str) -> DockerResult<()> {
        let mut state = self.lock();
        if state.failing_pulls.contains(image) {
            return Err(DockerError::Failed(format!("manifest for {image} not found")));
        }
        state.pulled.push(image.to_string());
        state.local_images.insert(image.to_string());
        Ok(())
    }

    async fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
        _network: &str,
    ) -> DockerResult<String> {
        let mut state = self.lock();
        state.created.push((name.to_string(), spec.clone()));
        Ok(format!("id-{name}"))
    }

    async fn start_container(&self, id: &str) -> DockerResult<()> {
        let mut state = self.lock();
        state.started.push(id.to_string());
        if let Some(hook) = &state.on_start {
            hook(id);
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> DockerResult<()> {
        // Yield so concurrent stops genuinely interleave.
        tokio::task::yield_now().await;
        let mut state = self.lock();
        if state.missing_containers.contains(id) {
            return Err(DockerError::NotFound {
                kind: "container",
                name: id.to_string(),
            });
        }
        if state.failing_stops.contains(id) {
            return Err(DockerError::Failed(format!("cannot stop {id}")));
        }
        state.stopped.push(id.to_string());
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> DockerResult<()> {
        self.lock().removed.push(id.to_string());
        Ok(())
    }

    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> DockerResult<String> {
        Ok(format!("exec-{}-{}", container_id, cmd.join("_")))
    }

    async fn attach_exec(
        &self,
        _exec_id: &str,
        _cancel: &CancellationToken,
    ) -> DockerResult<ExecOutput> {
        Ok(self.lock().exec_output.clone())
    }

    async fn logs(&self, container_id: &str) -> DockerResult<Vec<u8>> {
        self.lock()
            .logs
            .get(container_id)
            .cloned()
            .ok_or_else(|| DockerError::NotFound {
                kind: "container",
                name: container_id.to_string(),
            })
    }
}
