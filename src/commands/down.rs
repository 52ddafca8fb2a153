use anyhow::{bail, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::path::Path;

use crate::commands::Project;

/// Stop every running project container; with `purge` also remove the
/// containers and the network.
pub async fn run(config_file: Option<&Path>, purge: bool) -> Result<()> {
    let project = Project::load(config_file)?;
    let mut env = project.environment().await?;

    if purge {
        env.lookup_network().await?;
    } else if !env.active {
        println!("  Nothing is running.");
        return Ok(());
    }

    let report = env.shutdown(purge).await?;

    let use_color = std::io::stdout().is_terminal();
    let verb = if purge { "Removed" } else { "Stopped" };
    let count = if purge {
        report.removed.len()
    } else {
        report.stopped.len()
    };
    if use_color {
        println!("  {} {} {} container(s)", "\u{2713}".green(), verb, count);
    } else {
        println!("  {} {} container(s)", verb, count);
    }

    if !report.is_clean() {
        let failed: Vec<String> = report
            .failed
            .iter()
            .map(|(service, err)| format!("{service}: {err}"))
            .collect();
        bail!("some containers could not be stopped:\n  - {}", failed.join("\n  - "));
    }
    Ok(())
}
