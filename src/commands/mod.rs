pub mod dev;
pub mod doctor;
pub mod down;
pub mod exec;
pub mod logs;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config;
use crate::config::model::DevhostConfig;
use crate::config::resolve::resolve_config;
use crate::config::validate::validate;
use crate::docker::DockerClient;
use crate::environment::service::declared_services;
use crate::environment::Environment;
use crate::layout::ProjectLayout;

/// A loaded and validated project.
pub struct Project {
    pub config: DevhostConfig,
    pub layout: ProjectLayout,
    pub config_path: PathBuf,
}

impl Project {
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let config_path = resolve_config(config_file)?;
        let (config, source) = config::load_config_with_source(&config_path)
            .with_context(|| format!("loading config from {}", config_path.display()))?;

        let filename = config_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "config.toml".to_string());

        if let Err(errors) = validate(&config, &source, &filename) {
            let mut msg = String::from("Configuration errors:\n");
            for err in &errors {
                msg.push_str(&format!("  - {}\n", err));
            }
            bail!("{}", msg.trim_end());
        }

        let layout = ProjectLayout::from_config_path(&config_path)?;
        Ok(Self {
            config,
            layout,
            config_path,
        })
    }

    /// Connect to Docker and adopt whatever is already running.
    pub async fn environment(&self) -> Result<Environment> {
        let docker = DockerClient::connect().await?;
        let services = declared_services(&self.config, &self.layout);
        let mut env = Environment::new(docker, &self.config.project.prefix, services);
        env.init().await?;
        Ok(env)
    }
}

/// Cancel `token` on the first SIGINT or SIGTERM.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        crate::signal::shutdown_signal().await;
        tracing::info!("shutting down");
        token.cancel();
    });
}
