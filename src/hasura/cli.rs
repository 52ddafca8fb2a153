use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::error::EnvError;
use crate::layout::ProjectLayout;
use crate::process::{ExternalCommand, ProcessRunner};

/// Drives the external `hasura` binary from the project directory.
pub struct HasuraCli<'a, R: ProcessRunner> {
    runner: &'a R,
    program: String,
    database: String,
    layout: &'a ProjectLayout,
}

fn has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

impl<'a, R: ProcessRunner> HasuraCli<'a, R> {
    pub fn new(runner: &'a R, program: &str, database: &str, layout: &'a ProjectLayout) -> Self {
        Self {
            runner,
            program: program.to_string(),
            database: database.to_string(),
            layout,
        }
    }

    /// Apply migrations (when there are any), export metadata (when none
    /// is stored yet), then apply metadata.
    pub async fn apply_migrations_and_metadata(&self, endpoint: &str, admin_secret: &str) -> Result<()> {
        if has_entries(&self.layout.migrations_dir()) {
            info!(database = %self.database, "applying migrations");
            self.run(&["migrate", "apply", "--database-name", &self.database], endpoint, admin_secret)
                .await?;
        } else {
            debug!("no migrations to apply");
        }

        if !has_entries(&self.layout.metadata_dir()) {
            info!("exporting metadata");
            self.run(&["metadata", "export"], endpoint, admin_secret).await?;
        }

        info!("applying metadata");
        self.run(&["metadata", "apply"], endpoint, admin_secret).await
    }

    async fn run(&self, args: &[&str], endpoint: &str, admin_secret: &str) -> Result<()> {
        let command = ExternalCommand::new(&self.program)
            .args(args.iter().copied())
            .args(["--endpoint", endpoint, "--admin-secret", admin_secret, "--skip-update-check"])
            .current_dir(&self.layout.project_dir);

        let output = self.runner.run(&command).await?;
        if !output.success() {
            let shown = std::iter::once(self.program.as_str())
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            debug!(command = %shown, output = %output.combined(), "hasura command failed");
            return Err(EnvError::Hasura {
                command: shown,
                output: output.combined(),
            }
            .into());
        }
        Ok(())
    }
}
