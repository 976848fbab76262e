//! Snapshot transfer: a serialized snapshot stream piped from a send
//! process into a receive process, either of which may be remote.
//!
//! The tool only offers one-directional send/receive primitives joined
//! by standard streams, so the pipeline's job is startup ordering (the
//! receiver must be running before the sender's output is attached),
//! the blocking byte copy (backpressure stalls the sender when the
//! receiver is slow), and observing both completion signals before
//! declaring success.

use std::io::ErrorKind;

use tracing::{debug, info};
use zetta_runner::RunningCommand;

use crate::classify::classify;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::fs::Filesystem;
use crate::snapshot::Snapshot;

/// Options for snapshot transfer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SendOptions {
    /// Include dataset properties in the stream (`send -p`).
    pub preserve_properties: bool,
}

impl Filesystem {
    /// Prepares this filesystem to receive a snapshot stream: ensures
    /// the destination container exists, then starts `receive -F` with
    /// a piped stdin for the stream.
    ///
    /// # Errors
    ///
    /// Returns the classified tool error if the container cannot be
    /// created, or a runner error if the receive process fails to start.
    pub async fn receive(&self) -> Result<RunningCommand> {
        self.base().run(["create", "-p", self.path()]).await?;

        let command = self
            .base()
            .zfs()
            .command(["receive", "-F", self.path()]);

        Ok(self.base().zfs().runner().spawn(command).await?)
    }
}

impl Snapshot {
    /// Sends this snapshot in full into a destination filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if this snapshot does not exist, or
    /// the classified error of whichever transfer participant failed.
    pub async fn send(&self, destination: &Filesystem) -> Result<()> {
        self.send_with(destination, SendOptions::default()).await
    }

    /// Sends this snapshot in full, with options.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_with(&self, destination: &Filesystem, options: SendOptions) -> Result<()> {
        transfer(self, None, destination, options).await
    }

    /// Sends the delta between a base snapshot and this snapshot into a
    /// destination filesystem that already holds the base.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if this snapshot or the base does not
    /// exist, [`Error::IncrementalBaseMismatch`] if the destination's
    /// most recent snapshot is not the base, or the classified error of
    /// whichever transfer participant failed.
    pub async fn send_incremental(&self, base: &Self, destination: &Filesystem) -> Result<()> {
        self.send_incremental_with(base, destination, SendOptions::default())
            .await
    }

    /// Sends the delta between a base snapshot and this snapshot, with
    /// options.
    ///
    /// # Errors
    ///
    /// See [`send_incremental`](Self::send_incremental).
    pub async fn send_incremental_with(
        &self,
        base: &Self,
        destination: &Filesystem,
        options: SendOptions,
    ) -> Result<()> {
        transfer(self, Some(base), destination, options).await
    }
}

async fn transfer(
    source: &Snapshot,
    base: Option<&Snapshot>,
    destination: &Filesystem,
    options: SendOptions,
) -> Result<()> {
    debug!(source = %source.path(), destination = %destination.path(), "validating transfer");

    if !source.exists().await? {
        return Err(Error::NotFound(format!(
            "source snapshot '{}' does not exist",
            source.path()
        )));
    }
    if let Some(base) = base {
        if !base.exists().await? {
            return Err(Error::NotFound(format!(
                "base snapshot '{}' does not exist",
                base.path()
            )));
        }
    }

    // The receiver must be running before the sender's output exists.
    let mut receive = destination.receive().await?;
    let mut receive_stdin = receive
        .take_stdin()
        .ok_or(zetta_runner::Error::MissingPipe("stdin"))?;

    let mut args = vec!["send"];
    if options.preserve_properties {
        args.push("-p");
    }
    if let Some(base) = base {
        args.push("-i");
        args.push(base.path());
    }
    args.push(source.path());

    let command = source.base().zfs().command(args);
    let mut send = source.base().zfs().runner().spawn(command).await?;
    let mut send_stdout = send
        .take_stdout()
        .ok_or(zetta_runner::Error::MissingPipe("stdout"))?;

    info!(source = %source.path(), destination = %destination.path(), "streaming snapshot");
    let copied = tokio::io::copy(&mut send_stdout, &mut receive_stdin).await;

    // EOF for the receiver; an open handle would stall it forever.
    drop(receive_stdin);
    drop(send_stdout);

    // Receive is waited on first and its failure wins: a receiver error
    // is the actionable root cause of the sender's broken pipe.
    let receive_output = receive.wait().await?;
    let send_output = send.wait().await?;

    if !receive_output.success() {
        return Err(classify(receive_output.status, &receive_output.stderr));
    }
    if !send_output.success() {
        return Err(classify(send_output.status, &send_output.stderr));
    }

    match copied {
        Ok(bytes) => {
            info!(source = %source.path(), destination = %destination.path(), bytes, "transfer complete");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Err(Error::BrokenPipe(e.to_string())),
        Err(e) => Err(Error::Runner(zetta_runner::Error::Io(
            "failed to copy snapshot stream",
            e,
        ))),
    }
}
