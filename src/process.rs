//! Boundary to external programs such as the Hasura CLI.

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

/// A fully described invocation of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program and arguments joined with spaces, for messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn combined(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Runs an external command to completion and captures its output.
///
/// A non-zero exit is not an error at this level; callers inspect
/// [`ProcessOutput::success`]. Errors mean the program could not be run.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, command: &ExternalCommand) -> impl Future<Output = Result<ProcessOutput>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &ExternalCommand) -> Result<ProcessOutput> {
        debug!(command = %command.display(), "running external command");

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("running {}", command.program))?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let cmd = ExternalCommand::new("hasura").args(["metadata", "apply"]);
        assert_eq!(cmd.display(), "hasura metadata apply");
    }

    #[test]
    fn combined_output_skips_empty_streams() {
        let out = ProcessOutput {
            code: Some(1),
            stdout: "".into(),
            stderr: "boom\n".into(),
        };
        assert!(!out.success());
        assert_eq!(out.combined(), "boom");

        let out = ProcessOutput {
            code: Some(1),
            stdout: "a".into(),
            stderr: "b".into(),
        };
        assert_eq!(out.combined(), "a\nb");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tokio_runner_captures_output() {
        let cmd = ExternalCommand::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let out = TokioProcessRunner.run(&cmd).await.unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let cmd = ExternalCommand::new("definitely-not-a-real-program-xyz");
        assert!(TokioProcessRunner.run(&cmd).await.is_err());
    }
}
