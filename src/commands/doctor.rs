use anyhow::Result;
use std::path::Path;
use std::process::Command;

use crate::config;
use crate::config::resolve::resolve_config;

/// The Hasura CLI configured for the current project, if any.
fn hasura_cli(config_file: Option<&Path>) -> String {
    resolve_config(config_file)
        .and_then(|path| config::load_config(&path))
        .map(|c| c.hasura.cli)
        .unwrap_or_else(|_| "hasura".to_string())
}

pub fn run(config_file: Option<&Path>) -> Result<()> {
    println!("devhost doctor");
    println!("==============");
    println!();

    let hasura = hasura_cli(config_file);
    let checks: [(&str, &[&str]); 2] = [
        ("docker", &["--version"]),
        (hasura.as_str(), &["version", "--skip-update-check"]),
    ];

    let mut all_ok = true;

    for (bin, args) in &checks {
        match Command::new(bin).args(*args).output() {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                let version = version.trim();
                // Some tools output to stderr
                let version = if version.is_empty() {
                    String::from_utf8_lossy(&output.stderr).trim().to_string()
                } else {
                    version.to_string()
                };
                println!("  [ok] {:<16} {}", bin, version);
            }
            _ => {
                println!("  [!!] {:<16} not found", bin);
                all_ok = false;
            }
        }
    }

    println!();
    if all_ok {
        println!("All dependencies found.");
    } else {
        println!("Some dependencies are missing. Install them for full functionality.");
        println!("Note: the Hasura CLI is only needed for migrations and metadata.");
    }

    Ok(())
}
