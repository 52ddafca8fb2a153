//! The environment aggregate: the Docker handle, the cancellation token and
//! every service of the project.
//!
//! An [`Environment`] is built once per command. `dev` drives it through:
//!   1. `init`: ping the daemon, adopt running containers
//!   2. `prepare_images`: pull what is missing
//!   3. `prepare_network`: create or fetch the project network
//!   4. `run_all`: create and start containers
//!   5. `health::wait_healthy`: poll health endpoints
//!   6. `shutdown`: stop (and on purge remove) everything, then `reset`

pub mod health;
pub mod lifecycle;
pub mod reconcile;
pub mod service;
pub mod shutdown;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::docker::image::missing_images;
use crate::docker::network::resource_labels;
use crate::docker::{DockerApi, DockerClient};
use crate::error::EnvError;

pub use service::{ContainerPhase, Service};

pub struct Environment<D: DockerApi = DockerClient> {
    docker: D,
    cancel: CancellationToken,
    prefix: String,
    pub services: BTreeMap<String, Service>,
    pub network: Option<String>,
    /// True once a container has been started or adopted.
    pub active: bool,
}

impl<D: DockerApi> Environment<D> {
    pub fn new(docker: D, prefix: impl Into<String>, services: BTreeMap<String, Service>) -> Self {
        Self {
            docker,
            cancel: CancellationToken::new(),
            prefix: prefix.into(),
            services,
            network: None,
            active: false,
        }
    }

    /// Verify the daemon is reachable and adopt running project containers.
    pub async fn init(&mut self) -> Result<()> {
        self.docker.ping().await?;
        let containers = self
            .docker
            .list_prefixed_containers(&self.prefix)
            .await
            .context("listing running containers")?;
        let adopted =
            reconcile::wrap_containers_as_services(&mut self.services, &containers, &self.prefix);
        let running = self.services.values().filter(|s| s.is_running()).count();
        if adopted > 0 {
            info!(count = adopted, running, "adopted existing containers");
        }
        self.active = running > 0;
        Ok(())
    }

    /// Forget every service and the network so the same process can run
    /// another cycle.
    pub fn reset(&mut self) {
        self.services.clear();
        self.network = None;
        self.active = false;
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn docker(&self) -> &D {
        &self.docker
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Look up a service, suggesting a close name when it does not exist.
    pub fn service(&self, name: &str) -> Result<&Service, EnvError> {
        self.services.get(name).ok_or_else(|| EnvError::UnknownService {
            name: name.to_string(),
            suggestion: self
                .services
                .keys()
                .map(|k| (k, strsim::jaro_winkler(name, k)))
                .filter(|(_, score)| *score >= 0.8)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(k, _)| k.clone()),
        })
    }

    /// Return the project network id, creating the network when needed.
    /// Repeated calls return the same id without touching Docker.
    pub async fn prepare_network(&mut self) -> Result<String> {
        if let Some(id) = &self.network {
            return Ok(id.clone());
        }

        let id = match self.docker.find_network(&self.prefix).await? {
            Some(id) => {
                debug!(network = %self.prefix, id = %id, "using existing network");
                id
            }
            None => {
                let labels = resource_labels(&self.prefix, "network");
                let id = self
                    .docker
                    .create_network(&self.prefix, labels)
                    .await
                    .with_context(|| format!("creating network {}", self.prefix))?;
                info!(network = %self.prefix, "network created");
                id
            }
        };

        self.network = Some(id.clone());
        Ok(id)
    }

    /// Record the id of an existing project network without creating one.
    pub async fn lookup_network(&mut self) -> Result<Option<String>> {
        if self.network.is_none() {
            self.network = self
                .docker
                .find_network(&self.prefix)
                .await
                .context("looking up network")?;
        }
        Ok(self.network.clone())
    }

    /// Remove the project network. A network that is already gone is fine.
    pub async fn remove_network(&mut self) -> Result<()> {
        let Some(id) = self.network.take() else {
            return Ok(());
        };
        match self.docker.remove_network(&id).await {
            Ok(()) => {
                info!(network = %id, "network removed");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(network = %id, "network already removed");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("removing network {id}")),
        }
    }

    pub async fn prune_networks(&self) -> Result<()> {
        self.docker
            .prune_networks(&self.prefix)
            .await
            .context("pruning networks")
    }

    /// Pull every required image that is not present locally.
    ///
    /// Images of services that are already running are not required. Pull
    /// failures do not stop the remaining pulls; they are returned for the
    /// caller to judge.
    pub async fn prepare_images(&self) -> Result<Vec<EnvError>> {
        let required: Vec<String> = self
            .services
            .values()
            .filter(|s| !s.is_running())
            .filter_map(|s| s.spec.as_ref().map(|spec| spec.image.clone()))
            .collect();
        if required.is_empty() {
            return Ok(Vec::new());
        }

        let available = self
            .docker
            .local_image_tags()
            .await
            .context("listing local images")?;
        let required: Vec<&str> = required.iter().map(String::as_str).collect();

        let mut failures = Vec::new();
        for image in missing_images(&required, &available) {
            info!(image = %image, "pulling image");
            if let Err(e) = self.docker.pull_image(image).await {
                warn!(image = %image, error = %e, "image pull failed");
                failures.push(EnvError::ImagePull {
                    image: image.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::fake::FakeDocker;
    use crate::docker::{ContainerSpec, ObservedContainer};

    fn managed(name: &str, image: &str) -> Service {
        Service {
            spec: Some(ContainerSpec {
                image: image.to_string(),
                ..Default::default()
            }),
            ..Service::blank(name)
        }
    }

    #[tokio::test]
    async fn prepare_network_is_idempotent() {
        let mut env = Environment::new(FakeDocker::default(), "nhost", BTreeMap::new());

        let first = env.prepare_network().await.unwrap();
        let second = env.prepare_network().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(env.docker().lock().network_creates, 1);

        // A fresh environment finds the existing network instead of creating one.
        let docker = FakeDocker::default();
        docker.lock().networks.insert("nhost".into(), "net-existing".into());
        let mut env = Environment::new(docker, "nhost", BTreeMap::new());
        assert_eq!(env.prepare_network().await.unwrap(), "net-existing");
        assert_eq!(env.docker().lock().network_creates, 0);
    }

    #[tokio::test]
    async fn remove_network_swallows_not_found() {
        let mut env = Environment::new(FakeDocker::default(), "nhost", BTreeMap::new());
        env.network = Some("gone".into());
        env.remove_network().await.unwrap();
        assert!(env.network.is_none());
    }

    #[tokio::test]
    async fn init_adopts_running_containers() {
        let docker = FakeDocker::with_running(vec![ObservedContainer {
            id: "abc".into(),
            names: vec!["/nhost_hasura".into()],
            ports: vec![],
            running: true,
        }]);
        let mut env = Environment::new(docker, "nhost", BTreeMap::new());
        env.init().await.unwrap();
        assert!(env.active);
        assert_eq!(env.services["hasura"].id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn stopped_containers_are_adopted_but_not_active() {
        let docker = FakeDocker::with_running(vec![ObservedContainer {
            id: "old".into(),
            names: vec!["/nhost_web".into()],
            ports: vec![],
            running: false,
        }]);
        let mut env = Environment::new(docker, "nhost", BTreeMap::new());
        env.init().await.unwrap();

        assert!(!env.active);
        let web = &env.services["web"];
        assert_eq!(web.id.as_deref(), Some("old"));
        assert_eq!(web.phase, ContainerPhase::Stopped);

        let report = env.shutdown(true).await.unwrap();
        assert_eq!(report.removed, vec!["web".to_string()]);
        assert_eq!(env.docker().lock().removed, vec!["old"]);
    }

    #[tokio::test]
    async fn prepare_images_pulls_missing_and_reports_failures() {
        let docker = FakeDocker::default();
        {
            let mut state = docker.lock();
            state.local_images.insert("nhost/postgres:14.5".into());
            state.failing_pulls.insert("bad/image:1".into());
        }
        let mut running = managed("auth", "nhost/auth:0.1");
        running.id = Some("x".into());
        running.phase = ContainerPhase::Running;
        let services = BTreeMap::from([
            ("postgres".to_string(), managed("postgres", "nhost/postgres:14.5")),
            ("hasura".to_string(), managed("hasura", "hasura/graphql-engine:v2")),
            ("broken".to_string(), managed("broken", "bad/image:1")),
            ("auth".to_string(), running),
            ("functions".to_string(), Service::blank("functions")),
        ]);
        let env = Environment::new(docker, "nhost", services);

        let failures = env.prepare_images().await.unwrap();
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], EnvError::ImagePull { image, .. } if image == "bad/image:1"));
        assert_eq!(env.docker().lock().pulled, vec!["hasura/graphql-engine:v2"]);
    }

    #[test]
    fn unknown_service_suggests_close_name() {
        let services = BTreeMap::from([("hasura".to_string(), Service::blank("hasura"))]);
        let env = Environment::new(FakeDocker::default(), "nhost", services);
        match env.service("hasur") {
            Err(EnvError::UnknownService { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("hasura"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn reset_clears_state() {
        let services = BTreeMap::from([("db".to_string(), Service::blank("db"))]);
        let mut env = Environment::new(FakeDocker::default(), "nhost", services);
        env.network = Some("n".into());
        env.active = true;
        env.reset();
        assert!(env.services.is_empty());
        assert!(env.network.is_none());
        assert!(!env.active);
    }
}
