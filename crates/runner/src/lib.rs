//! Executes administrative commands against a local or remote host,
//! optionally wrapped with privilege elevation, with both captured-output
//! and streaming (stdin/stdout pipe) modes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod local;
mod ssh;

pub use error::{Error, Result};
pub use local::{LocalRunner, LocalRunnerOptions};
pub use ssh::{SshRunner, SshRunnerOptions};

use std::borrow::Cow;
use std::process::ExitStatus;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;

/// A program name plus argument vector.
///
/// Commands are always carried as argv lists, never as pre-concatenated
/// shell strings, so no quoting ambiguity exists on the local side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command from a program name and arguments.
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument vector, not including the program itself.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Rewrites the command as `sudo <program> <args…>`.
    ///
    /// Elevation changes the literal argv seen by the OS, so runners apply
    /// it to every command they issue, streaming ones included.
    #[must_use]
    pub fn elevated(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
        }
    }
}

/// Captured output of a completed command.
#[derive(Debug)]
pub struct CommandOutput {
    /// Captured stdout bytes.
    pub stdout: Vec<u8>,

    /// Captured stderr bytes.
    pub stderr: Vec<u8>,

    /// Exit status of the process.
    pub status: ExitStatus,
}

impl CommandOutput {
    /// Whether the process exited successfully.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout as UTF-8 text, lossily converted.
    #[must_use]
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stderr as UTF-8 text, lossily converted.
    #[must_use]
    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// A started process with pipes for streaming use.
///
/// Stderr is drained by a background task from the moment of creation so
/// the child can never block on a full stderr pipe while the caller is
/// busy streaming stdin or stdout; the collected bytes are handed back
/// from [`wait`](Self::wait).
pub struct RunningCommand {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr_task: Option<JoinHandle<Vec<u8>>>,
}

impl RunningCommand {
    /// Wraps a spawned child process.
    ///
    /// Runner implementations (including external transports) call this
    /// with a child spawned with piped stdio.
    #[must_use]
    pub fn new(mut child: Child) -> Self {
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        Self {
            child,
            stdin,
            stdout,
            stderr_task,
        }
    }

    /// Takes the writable stdin pipe, if still available.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Takes the readable stdout pipe, if still available.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Waits for the process to exit and returns its status plus the
    /// stderr collected since the spawn.
    ///
    /// Stdout that was taken by the caller is not re-captured; the
    /// returned `stdout` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting on the child fails.
    pub async fn wait(mut self) -> Result<CommandOutput> {
        // An untouched stdin handle would hold the pipe open forever.
        drop(self.stdin.take());

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| Error::Io("failed to wait for child", e))?;

        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        Ok(CommandOutput {
            stdout: Vec::new(),
            stderr,
            status,
        })
    }
}

/// Executes commands against some target host.
///
/// A runner is configured once with its transport and elevation flag;
/// it plumbs bytes and exit statuses and performs no interpretation of
/// command output.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Runs the command to completion, capturing stdout and stderr.
    async fn output(&self, command: CommandSpec) -> Result<CommandOutput>;

    /// Starts the command without blocking, with piped stdin and stdout
    /// for streaming use.
    async fn spawn(&self, command: CommandSpec) -> Result<RunningCommand>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_rewrites_argv() {
        let command = CommandSpec::new("zfs", ["list", "-H", "tank"]).elevated();

        assert_eq!(command.program(), "sudo");
        assert_eq!(command.args(), ["zfs", "list", "-H", "tank"]);
    }

    #[test]
    fn elevation_of_bare_program() {
        let command = CommandSpec::new("zfs", Vec::<String>::new()).elevated();

        assert_eq!(command.program(), "sudo");
        assert_eq!(command.args(), ["zfs"]);
    }
}
