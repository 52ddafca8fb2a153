use std::collections::BTreeMap;

use anyhow::Result;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::docker::{DockerApi, DockerError};
use crate::environment::{ContainerPhase, Environment};

/// What happened to each container during shutdown.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub stopped: Vec<String>,
    pub removed: Vec<String>,
    /// Service name to error message, for containers that could not be
    /// stopped or removed.
    pub failed: BTreeMap<String, String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Teardown {
    Stopped { removed: bool },
    Failed(String),
}

async fn stop_one<D: DockerApi>(docker: &D, name: &str, id: &str, purge: bool) -> Teardown {
    match docker.stop_container(id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!(service = %name, "container already gone");
            return Teardown::Stopped { removed: purge };
        }
        Err(e) => return Teardown::Failed(describe(&e)),
    }
    if !purge {
        return Teardown::Stopped { removed: false };
    }
    match docker.remove_container(id).await {
        Ok(()) => Teardown::Stopped { removed: true },
        Err(e) if e.is_not_found() => Teardown::Stopped { removed: true },
        Err(e) => Teardown::Failed(describe(&e)),
    }
}

fn describe(err: &DockerError) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

impl<D: DockerApi> Environment<D> {
    /// Stop every tracked container concurrently; with `purge` also remove
    /// them, then the network. Individual failures are logged and reported,
    /// never fatal. The environment is reset afterwards either way.
    pub async fn shutdown(&mut self, purge: bool) -> Result<ShutdownReport> {
        let targets: Vec<(String, String)> = self
            .services
            .values()
            .filter_map(|s| s.id.clone().map(|id| (s.name.clone(), id)))
            .collect();

        let mut report = ShutdownReport::default();

        if !targets.is_empty() {
            info!(count = targets.len(), purge, "stopping containers");
            for (name, _) in &targets {
                if let Some(service) = self.services.get_mut(name) {
                    service.phase = ContainerPhase::Stopping;
                }
            }

            let docker = &self.docker;
            let results = join_all(targets.iter().map(|(name, id)| async move {
                (name.clone(), stop_one(docker, name, id, purge).await)
            }))
            .await;

            for (name, result) in results {
                let service = self.services.get_mut(&name);
                match result {
                    Teardown::Stopped { removed } => {
                        report.stopped.push(name.clone());
                        if removed {
                            report.removed.push(name.clone());
                        }
                        if let Some(service) = service {
                            service.phase = if removed {
                                ContainerPhase::Removed
                            } else {
                                ContainerPhase::Stopped
                            };
                        }
                    }
                    Teardown::Failed(message) => {
                        warn!(service = %name, error = %message, "failed to stop container");
                        report.failed.insert(name, message);
                    }
                }
            }
        }

        if purge {
            if let Err(e) = self.remove_network().await {
                warn!(error = %format!("{e:#}"), "failed to remove network");
            }
            if let Err(e) = self.prune_networks().await {
                warn!(error = %format!("{e:#}"), "failed to prune networks");
            }
        }

        self.reset();
        Ok(report)
    }
}
