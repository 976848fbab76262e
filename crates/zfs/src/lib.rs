//! Control plane over the ZFS administrative CLI: typed filesystems,
//! snapshots, and clones whose lifecycle operations shell out to the
//! `zfs` binary, classify its diagnostics into a stable error taxonomy,
//! and stream snapshot transfers between two supervised processes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod classify;
mod dataset;
mod error;
mod fs;
mod snapshot;
mod transfer;

pub use dataset::{Dataset, DatasetBase, DestroyRecursion};
pub use error::{Error, Result};
pub use fs::Filesystem;
pub use snapshot::Snapshot;
pub use transfer::SendOptions;
pub use zetta_runner::{
    CommandOutput, CommandSpec, LocalRunner, LocalRunnerOptions, Runner, RunningCommand,
    SshRunner, SshRunnerOptions,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Options for configuring a [`Zfs`] handle over the local host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZfsOptions {
    /// Path to the `zfs` binary, resolved from `PATH` by default.
    pub binary: String,

    /// Whether to wrap every command with `sudo`.
    pub elevate: bool,
}

impl Default for ZfsOptions {
    fn default() -> Self {
        Self {
            binary: "zfs".to_string(),
            elevate: false,
        }
    }
}

/// Handle to the ZFS tool on one target host.
///
/// All entities constructed from a handle share its runner; the handle
/// itself is cheap to clone. There is deliberately no process-wide
/// default instance: elevation and transport state live only in values
/// the caller constructed.
#[derive(Clone)]
pub struct Zfs {
    runner: Arc<dyn Runner>,
    binary: String,
}

impl Zfs {
    /// Creates a handle for the local host, non-elevated, with the
    /// `zfs` binary from `PATH`.
    #[must_use]
    pub fn local() -> Self {
        Self::with_options(ZfsOptions::default())
    }

    /// Creates a handle for the local host with the given options.
    #[must_use]
    pub fn with_options(ZfsOptions { binary, elevate }: ZfsOptions) -> Self {
        Self {
            runner: Arc::new(LocalRunner::new(LocalRunnerOptions { elevate })),
            binary,
        }
    }

    /// Creates a handle over a caller-supplied runner, e.g. an
    /// [`SshRunner`] for a remote host. Elevation is the runner's
    /// concern.
    #[must_use]
    pub fn with_runner(runner: Arc<dyn Runner>) -> Self {
        Self {
            runner,
            binary: "zfs".to_string(),
        }
    }

    pub(crate) fn runner(&self) -> &dyn Runner {
        self.runner.as_ref()
    }

    pub(crate) fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(self.binary.as_str(), args)
    }
}
