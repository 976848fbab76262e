//! Local process transport.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::{CommandOutput, CommandSpec, Runner, RunningCommand};

/// Options for creating a [`LocalRunner`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocalRunnerOptions {
    /// Whether to wrap every command with `sudo`.
    pub elevate: bool,
}

/// Runs commands by spawning processes on the local host.
#[derive(Clone, Debug)]
pub struct LocalRunner {
    elevate: bool,
}

impl LocalRunner {
    /// Creates a new `LocalRunner`.
    #[must_use]
    pub fn new(LocalRunnerOptions { elevate }: LocalRunnerOptions) -> Self {
        Self { elevate }
    }

    fn command(&self, spec: CommandSpec) -> Command {
        let spec = if self.elevate { spec.elevated() } else { spec };

        debug!(program = %spec.program(), args = ?spec.args(), "running local command");

        let mut command = Command::new(spec.program());
        command.args(spec.args());
        command
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new(LocalRunnerOptions::default())
    }
}

#[async_trait]
impl Runner for LocalRunner {
    async fn output(&self, command: CommandSpec) -> Result<CommandOutput> {
        let output = self
            .command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Io("failed to run command", e))?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status,
        })
    }

    async fn spawn(&self, command: CommandSpec) -> Result<RunningCommand> {
        let child = self
            .command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Io("failed to spawn command", e))?;

        Ok(RunningCommand::new(child))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn output_captures_stdout_and_status() {
        let runner = LocalRunner::default();

        let output = runner
            .output(CommandSpec::new("sh", ["-c", "printf hello"]))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout_text(), "hello");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn output_captures_stderr_on_failure() {
        let runner = LocalRunner::default();

        let output = runner
            .output(CommandSpec::new("sh", ["-c", "echo oops >&2; exit 3"]))
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stderr_text().trim(), "oops");
    }

    #[tokio::test]
    async fn spawn_streams_stdin_to_stdout() {
        let runner = LocalRunner::default();

        let mut running = runner.spawn(CommandSpec::new("cat", Vec::<String>::new())).await.unwrap();

        let mut stdin = running.take_stdin().unwrap();
        let mut stdout = running.take_stdout().unwrap();

        stdin.write_all(b"streamed bytes").await.unwrap();
        drop(stdin);

        let mut read = Vec::new();
        stdout.read_to_end(&mut read).await.unwrap();
        assert_eq!(read, b"streamed bytes");

        let output = running.wait().await.unwrap();
        assert!(output.success());
    }

    #[tokio::test]
    async fn wait_collects_stderr() {
        let runner = LocalRunner::default();

        let running = runner
            .spawn(CommandSpec::new("sh", ["-c", "echo diagnostics >&2; exit 1"]))
            .await
            .unwrap();

        let output = running.wait().await.unwrap();
        assert!(!output.success());
        assert_eq!(output.stderr_text().trim(), "diagnostics");
    }
}
