//! Network-shell transport via the `ssh` client.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::{CommandOutput, CommandSpec, Runner, RunningCommand};

/// Options for creating an [`SshRunner`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SshRunnerOptions {
    /// The remote target, `host` or `user@host`.
    pub target: String,

    /// Whether to wrap every remote command with `sudo`.
    pub elevate: bool,

    /// Extra arguments passed to the `ssh` client, e.g. `-p 2222` or
    /// `-i <identity-file>`.
    pub extra_args: Vec<String>,
}

/// Runs commands on a remote host through the `ssh` client.
///
/// The remote shell joins command words with spaces, so each word is
/// quoted before the join; the local argv handed to `ssh` itself stays a
/// plain vector.
#[derive(Clone, Debug)]
pub struct SshRunner {
    target: String,
    elevate: bool,
    extra_args: Vec<String>,
}

impl SshRunner {
    /// Creates a new `SshRunner`.
    #[must_use]
    pub fn new(
        SshRunnerOptions {
            target,
            elevate,
            extra_args,
        }: SshRunnerOptions,
    ) -> Self {
        Self {
            target,
            elevate,
            extra_args,
        }
    }

    fn ssh_command(&self, spec: CommandSpec) -> Command {
        let spec = if self.elevate { spec.elevated() } else { spec };
        let remote = join_words(&spec);

        debug!(target = %self.target, remote = %remote, "running remote command");

        let mut command = Command::new("ssh");
        command.args(&self.extra_args);
        command.arg(&self.target);
        command.arg("--");
        command.arg(remote);
        command
    }
}

#[async_trait]
impl Runner for SshRunner {
    async fn output(&self, command: CommandSpec) -> Result<CommandOutput> {
        let output = self
            .ssh_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Io("failed to run ssh", e))?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status,
        })
    }

    async fn spawn(&self, command: CommandSpec) -> Result<RunningCommand> {
        let child = self
            .ssh_command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Io("failed to spawn ssh", e))?;

        Ok(RunningCommand::new(child))
    }
}

fn join_words(spec: &CommandSpec) -> String {
    let mut joined = quote_word(spec.program());
    for arg in spec.args() {
        joined.push(' ');
        joined.push_str(&quote_word(arg));
    }
    joined
}

fn quote_word(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));

    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_stay_unquoted() {
        assert_eq!(quote_word("tank/fs@s1"), "tank/fs@s1");
        assert_eq!(quote_word("-Hp"), "-Hp");
    }

    #[test]
    fn special_words_get_single_quotes() {
        assert_eq!(quote_word("a b"), "'a b'");
        assert_eq!(quote_word(""), "''");
        assert_eq!(quote_word("it's"), r"'it'\''s'");
    }

    #[test]
    fn remote_command_is_word_joined() {
        let spec = CommandSpec::new("zfs", ["get", "-Hp", "-o", "value", "quota", "tank/fs"]);
        assert_eq!(join_words(&spec), "zfs get -Hp -o value quota tank/fs");
    }

    #[test]
    fn elevation_applies_before_join() {
        let runner = SshRunner::new(SshRunnerOptions {
            target: "admin@backup".to_string(),
            elevate: true,
            extra_args: vec![],
        });

        let spec = CommandSpec::new("zfs", ["list", "-H", "-o", "name", "tank"]);
        let spec = if runner.elevate { spec.elevated() } else { spec };
        assert_eq!(join_words(&spec), "sudo zfs list -H -o name tank");
    }
}
