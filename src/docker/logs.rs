use bollard::query_parameters::LogsOptions;
use bollard::Docker;
use futures_util::StreamExt;

use crate::docker::{DockerError, DockerResult};

/// Read the complete log of a container, stdout and stderr interleaved
/// in the order the daemon returns them.
pub async fn read_logs(docker: &Docker, container_id: &str) -> DockerResult<Vec<u8>> {
    let options = LogsOptions {
        follow: false,
        stdout: true,
        stderr: true,
        tail: "all".to_string(),
        ..Default::default()
    };

    let mut stream = docker.logs(container_id, Some(options));
    let mut buf = Vec::new();
    while let Some(item) = stream.next().await {
        let output = item.map_err(|e| {
            DockerError::from_api(e, "container", container_id, format!("reading logs of {container_id}"))
        })?;
        buf.extend_from_slice(&output.into_bytes());
    }
    Ok(buf)
}
