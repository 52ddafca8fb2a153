use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

use crate::config;
use crate::config::resolve::resolve_config;
use crate::config::validate::validate;

pub fn run(config_file: Option<&Path>) -> Result<()> {
    let config_path = resolve_config(config_file)?;

    let (config, source) = config::load_config_with_source(&config_path)?;

    let filename = config_path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "config.toml".to_string());

    match validate(&config, &source, &filename) {
        Ok(()) => {
            let managed = config.services.values().filter(|s| s.image.is_some()).count();
            let proxied = config.services.values().filter(|s| s.proxy).count();
            println!(
                "  {} {} is valid ({} services, {} containers, {} proxied)",
                "\u{2713}".green(),
                filename,
                config.services.len(),
                managed,
                proxied,
            );
            Ok(())
        }
        Err(errors) => {
            for err in errors {
                let report: miette::Report = err.into();
                eprintln!("{:?}", report);
            }
            std::process::exit(1);
        }
    }
}
