pub mod backends;
pub mod model;
pub mod resolve;
pub mod validate;

use std::path::Path;

use model::DevhostConfig;

pub fn load_config(path: &Path) -> anyhow::Result<DevhostConfig> {
    let (config, _) = load_config_with_source(path)?;
    Ok(config)
}

/// Load and parse a config file, also returning the raw source so validation
/// diagnostics can point into it.
pub fn load_config_with_source(path: &Path) -> anyhow::Result<(DevhostConfig, String)> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: DevhostConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
    Ok((config, content))
}
