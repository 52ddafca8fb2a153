use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::docker::{DockerApi, ExecOutput};
use crate::environment::{ContainerPhase, Environment};
use crate::error::EnvError;

impl<D: DockerApi> Environment<D> {
    /// Create and start the container of one service on the project network.
    pub async fn run_service(&mut self, name: &str) -> Result<()> {
        let network = self.prepare_network().await?;
        let prefix = self.prefix().to_string();

        let service = self
            .services
            .get_mut(name)
            .ok_or_else(|| anyhow!("unknown service `{name}`"))?;
        let spec = service
            .spec
            .clone()
            .ok_or_else(|| anyhow!("service `{name}` is not container-managed"))?;
        let container_name = service.container_name(&prefix);

        service.phase = ContainerPhase::Creating;
        let id = self
            .docker
            .create_container(&container_name, &spec, &network)
            .await
            .with_context(|| format!("creating container for {name}"))?;
        // Record the id before starting so a failed start is still cleaned up.
        service.id = Some(id.clone());
        self.active = true;

        self.docker
            .start_container(&id)
            .await
            .with_context(|| format!("starting container for {name}"))?;
        service.phase = ContainerPhase::Running;

        info!(service = %name, container = %container_name, "container started");
        Ok(())
    }

    /// Start every container-managed service that is not already running,
    /// one at a time in name order. A stopped leftover container is
    /// replaced by a fresh one.
    pub async fn run_all(&mut self) -> Result<()> {
        let pending: Vec<String> = self
            .services
            .values()
            .filter(|s| !s.is_running() && s.spec.is_some())
            .map(|s| s.name.clone())
            .collect();

        for name in pending {
            self.run_service(&name).await?;
        }
        Ok(())
    }

    /// Gracefully stop one service. A container that no longer exists is
    /// treated as stopped.
    pub async fn stop_service(&mut self, name: &str) -> Result<()> {
        let id = self.running_id(name)?;
        let service = self.services.get_mut(name).ok_or(EnvError::NotRunning)?;
        service.phase = ContainerPhase::Stopping;

        match self.docker.stop_container(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!(service = %name, "container already gone"),
            Err(e) => return Err(e).with_context(|| format!("stopping {name}")),
        }
        service.phase = ContainerPhase::Stopped;
        Ok(())
    }

    /// Force-remove one service's container.
    pub async fn remove_service(&mut self, name: &str) -> Result<()> {
        let id = self.running_id(name)?;
        match self.docker.remove_container(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!(service = %name, "container already gone"),
            Err(e) => return Err(e).with_context(|| format!("removing {name}")),
        }
        if let Some(service) = self.services.get_mut(name) {
            service.id = None;
            service.phase = ContainerPhase::Removed;
        }
        Ok(())
    }

    /// Create an exec instance in a running service and return its id.
    pub async fn exec(&self, name: &str, args: Vec<String>) -> Result<String> {
        let id = self.running_id(name)?;
        let exec_id = self
            .docker
            .create_exec(&id, args)
            .await
            .with_context(|| format!("creating exec in {name}"))?;
        Ok(exec_id)
    }

    /// Attach to an exec instance until it finishes or the environment is
    /// cancelled.
    pub async fn inspect_exec(&self, exec_id: &str) -> Result<ExecOutput> {
        let output = self
            .docker
            .attach_exec(exec_id, &self.cancel)
            .await
            .context("attaching to exec")?;
        Ok(output)
    }

    /// The full log of one service's container.
    pub async fn logs(&self, name: &str) -> Result<Vec<u8>> {
        let id = self.running_id(name)?;
        let logs = self
            .docker
            .logs(&id)
            .await
            .with_context(|| format!("reading logs of {name}"))?;
        Ok(logs)
    }

    /// Write one service's log to `path`.
    pub async fn save_logs(&self, name: &str, path: &Path) -> Result<()> {
        let logs = self.logs(name).await?;
        tokio::fs::write(path, logs)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    fn running_id(&self, name: &str) -> Result<String> {
        let service = self.service(name)?;
        let id = service.id.clone().ok_or(EnvError::NotRunning)?;
        Ok(id)
    }
}
