use bollard::container::LogOutput;
use bollard::exec::{StartExecOptions, StartExecResults};
use bollard::models::ExecConfig;
use bollard::Docker;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::docker::{DockerError, DockerResult};

/// Demultiplexed result of an exec instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the exec was interrupted before it finished.
    pub exit_code: Option<i64>,
}

impl ExecOutput {
    /// Append one frame of the multiplexed stream to the right buffer.
    pub fn push(&mut self, frame: LogOutput) {
        match frame {
            LogOutput::StdErr { message } => {
                self.stderr.push_str(&String::from_utf8_lossy(&message))
            }
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                self.stdout.push_str(&String::from_utf8_lossy(&message))
            }
            LogOutput::StdIn { .. } => {}
        }
    }
}

/// Create an exec instance with stdout and stderr attached.
pub async fn create_exec(docker: &Docker, container_id: &str, cmd: Vec<String>) -> DockerResult<String> {
    let config = ExecConfig {
        cmd: Some(cmd),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        ..Default::default()
    };

    let exec = docker
        .create_exec(container_id, config)
        .await
        .map_err(|e| DockerError::from_api(e, "container", container_id, "creating exec instance"))?;
    Ok(exec.id)
}

/// Start and attach to an exec instance, then read its exit code.
pub async fn attach_exec(
    docker: &Docker,
    exec_id: &str,
    cancel: &CancellationToken,
) -> DockerResult<ExecOutput> {
    let mut output = ExecOutput::default();
    let start_options = StartExecOptions {
        detach: false,
        ..Default::default()
    };

    let started = docker
        .start_exec(exec_id, Some(start_options))
        .await
        .map_err(|e| DockerError::from_api(e, "exec", exec_id, "starting exec"))?;

    if let StartExecResults::Attached {
        output: mut stream, ..
    } = started
    {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(exec = %exec_id, "exec attach cancelled");
                    return Ok(output);
                }
                msg = stream.next() => match msg {
                    Some(Ok(frame)) => output.push(frame),
                    Some(Err(e)) => {
                        tracing::warn!(exec = %exec_id, error = %e, "exec stream error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let inspect = docker
        .inspect_exec(exec_id)
        .await
        .map_err(|e| DockerError::from_api(e, "exec", exec_id, "inspecting exec"))?;
    output.exit_code = inspect.exit_code;

    Ok(output)
}
