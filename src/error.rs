use std::path::PathBuf;

use thiserror::Error;

/// Typed failures of the environment pipeline.
///
/// Commands wrap these in `anyhow` with context; tests match on the variants.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to pull image {image}: {reason}")]
    ImagePull { image: String, reason: String },

    #[error("service {service} did not become healthy after {attempts} attempts")]
    HealthCheck { service: String, attempts: usize },

    #[error("`{command}` failed:\n{output}")]
    Hasura { command: String, output: String },

    #[error("cannot read seeds directory {}", path.display())]
    SeedsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no services are running; start them with `devhost dev`")]
    NotRunning,

    #[error("unknown service `{name}`{}", suggestion.as_ref().map(|s| format!(", did you mean `{s}`?")).unwrap_or_default())]
    UnknownService {
        name: String,
        suggestion: Option<String>,
    },
}
