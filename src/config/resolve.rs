use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::layout::{ProjectLayout, DOT_DIR, PROJECT_DIR};

/// Locate the config file: the `-f` path when given, otherwise
/// `nhost/config.toml` under the nearest enclosing project root.
///
/// A project whose `.nhost` state path exists but is not a directory is
/// rejected, since container volumes are mounted from it.
pub fn resolve_config(cli_file: Option<&Path>) -> Result<PathBuf> {
    let config_path = match cli_file {
        Some(path) if path.is_file() => path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?,
        Some(path) => bail!("Config file not found: {}", path.display()),
        None => {
            let cwd = std::env::current_dir()?;
            match ProjectLayout::discover(&cwd) {
                Some(layout) => layout.config_path(),
                None => bail!(
                    "No {}/config.toml found in {} or any parent directory",
                    PROJECT_DIR,
                    cwd.display()
                ),
            }
        }
    };

    let layout = ProjectLayout::from_config_path(&config_path)?;
    if layout.dot_dir.exists() && !layout.dot_dir.is_dir() {
        bail!(
            "{} exists but is not a directory; remove it so project state can be kept there",
            layout.dot_dir.display()
        );
    }
    tracing::debug!(config = %config_path.display(), root = %layout.root.display(), "resolved project");
    Ok(config_path)
}
