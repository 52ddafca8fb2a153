use anyhow::{bail, Result};
use std::path::Path;

use crate::commands::{cancel_on_signal, Project};

pub async fn run(config_file: Option<&Path>, service: &str, command: Vec<String>) -> Result<()> {
    if command.is_empty() {
        bail!("no command specified");
    }

    let project = Project::load(config_file)?;
    let env = project.environment().await?;
    cancel_on_signal(env.cancel_token());

    let exec_id = env.exec(service, command).await?;
    let output = env.inspect_exec(&exec_id).await?;

    print!("{}", output.stdout);
    eprint!("{}", output.stderr);

    match output.exit_code {
        Some(0) => Ok(()),
        Some(code) => std::process::exit(code as i32),
        None => bail!("command in {} was interrupted", service),
    }
}
