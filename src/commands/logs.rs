use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::commands::Project;

pub async fn run(config_file: Option<&Path>, service: &str, output: Option<&Path>) -> Result<()> {
    let project = Project::load(config_file)?;
    let env = project.environment().await?;

    match output {
        Some(path) => {
            env.save_logs(service, path).await?;
            println!("  Saved logs of {} to {}", service, path.display());
        }
        None => {
            let logs = env.logs(service).await?;
            std::io::stdout().write_all(&logs)?;
        }
    }
    Ok(())
}
