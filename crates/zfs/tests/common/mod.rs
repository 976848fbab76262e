//! Scripted mock runner shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command;
use zetta_runner::{CommandOutput, CommandSpec, Error, Result, Runner, RunningCommand};

/// A canned reply for one captured-output invocation.
#[derive(Clone)]
pub struct Reply {
    stdout: String,
    stderr: String,
    code: i32,
}

/// A successful reply with the given stdout.
pub fn ok(stdout: &str) -> Reply {
    Reply {
        stdout: stdout.to_string(),
        stderr: String::new(),
        code: 0,
    }
}

/// A failed reply (exit code 1) with the given stderr.
pub fn fail(stderr: &str) -> Reply {
    Reply {
        stdout: String::new(),
        stderr: stderr.to_string(),
        code: 1,
    }
}

/// Runner double that replays scripted outputs keyed by the full argv
/// line and records every command it is asked to run.
///
/// Streaming commands are stood in for by real local processes (`sh`,
/// `cat`) so pipe plumbing and exit statuses stay genuine.
#[derive(Default)]
pub struct MockRunner {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    spawns: Mutex<HashMap<String, Vec<String>>>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the reply for one `output` call of the given argv line.
    /// Repeated calls for the same line queue up; the final reply is
    /// sticky.
    #[must_use]
    pub fn reply(self, argv: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(argv.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Maps a spawned argv line to a real local command standing in for
    /// it.
    #[must_use]
    pub fn spawn_as(self, argv: &str, real: &[&str]) -> Self {
        self.spawns.lock().unwrap().insert(
            argv.to_string(),
            real.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// Every argv line this runner was asked to run, in order; spawned
    /// commands are prefixed with `spawn `.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn key(command: &CommandSpec) -> String {
    let mut key = command.program().to_string();
    for arg in command.args() {
        key.push(' ');
        key.push_str(arg);
    }
    key
}

#[async_trait]
impl Runner for MockRunner {
    async fn output(&self, command: CommandSpec) -> Result<CommandOutput> {
        let key = key(&command);
        self.calls.lock().unwrap().push(key.clone());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies
                .get_mut(&key)
                .unwrap_or_else(|| panic!("unexpected command: {key}"));
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue
                    .front()
                    .cloned()
                    .unwrap_or_else(|| panic!("unexpected command: {key}"))
            }
        };

        Ok(CommandOutput {
            stdout: reply.stdout.into_bytes(),
            stderr: reply.stderr.into_bytes(),
            status: ExitStatus::from_raw(reply.code << 8),
        })
    }

    async fn spawn(&self, command: CommandSpec) -> Result<RunningCommand> {
        let key = key(&command);
        self.calls.lock().unwrap().push(format!("spawn {key}"));

        let real = self
            .spawns
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| panic!("unexpected spawn: {key}"));

        let child = Command::new(&real[0])
            .args(&real[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Io("failed to spawn mock command", e))?;

        Ok(RunningCommand::new(child))
    }
}
