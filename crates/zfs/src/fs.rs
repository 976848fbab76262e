//! Filesystem entities: creation, listing, mount state, promotion, and
//! snapshot creation.

use tracing::info;

use crate::dataset::{Dataset, DatasetBase};
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::{Zfs, classify::classify};

/// A mutable, mountable dataset.
///
/// Clones are filesystems too; a filesystem that originated from a
/// snapshot carries the dependency in its `origin` property until
/// promoted.
#[derive(Clone)]
pub struct Filesystem {
    base: DatasetBase,
}

impl std::fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filesystem")
            .field("path", &self.base.path())
            .finish()
    }
}

impl Dataset for Filesystem {
    fn base(&self) -> &DatasetBase {
        &self.base
    }
}

impl Filesystem {
    pub(crate) fn new(zfs: Zfs, path: String) -> Self {
        Self {
            base: DatasetBase::new(zfs, path),
        }
    }

    /// Mounts the filesystem.
    ///
    /// # Errors
    ///
    /// Returns the classified tool error on failure.
    pub async fn mount(&self) -> Result<()> {
        self.base.run(["mount", self.path()]).await?;
        Ok(())
    }

    /// Unmounts the filesystem.
    ///
    /// # Errors
    ///
    /// Returns the classified tool error on failure.
    pub async fn unmount(&self) -> Result<()> {
        self.base.run(["unmount", self.path()]).await?;
        Ok(())
    }

    /// Promotes this filesystem, inverting the origin dependency between
    /// it and the snapshot it was cloned from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PromoteNotClone`] if this filesystem is not a
    /// clone.
    pub async fn promote(&self) -> Result<()> {
        self.base.run(["promote", self.path()]).await?;
        info!(path = %self.path(), "promoted filesystem");
        Ok(())
    }

    /// Creates a snapshot of this filesystem named `<path>@<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the filesystem does not exist, or
    /// [`Error::InvalidDatasetName`] for a malformed name.
    pub async fn snapshot(&self, name: &str) -> Result<Snapshot> {
        let snapshot_path = format!("{}@{name}", self.path());
        self.base.run(["snapshot", snapshot_path.as_str()]).await?;
        info!(path = %snapshot_path, "created snapshot");

        self.base.zfs().snapshot(&snapshot_path)
    }

    /// Lists the snapshots under this filesystem.
    ///
    /// # Errors
    ///
    /// Returns the classified tool error on failure.
    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let output = self
            .base
            .run(["list", "-Hr", "-o", "name", "-t", "snapshot", self.path()])
            .await?;

        let text = output.stdout_text();
        let mut snapshots = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.contains('@') {
                snapshots.push(self.base.zfs().snapshot(line)?);
            }
        }

        Ok(snapshots)
    }
}

impl Zfs {
    /// Returns a [`Filesystem`] wrapper for a path without issuing any
    /// command or checking existence.
    pub fn filesystem<P: Into<String>>(&self, path: P) -> Filesystem {
        Filesystem::new(self.clone(), path.into())
    }

    /// Creates a filesystem, including missing parents.
    ///
    /// Existence is checked proactively so that creating over an
    /// existing dataset yields a clean typed error instead of relying
    /// solely on the tool's own message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if a dataset already exists at
    /// the path, or the classified tool error on failure.
    pub async fn create_filesystem(&self, path: &str) -> Result<Filesystem> {
        let filesystem = self.filesystem(path);

        if filesystem.exists().await? {
            return Err(Error::AlreadyExists(format!("fs {path} already exists")));
        }

        filesystem.base().run(["create", "-p", path]).await?;
        info!(path, "created filesystem");

        Ok(filesystem)
    }

    /// Lists all filesystems under a root path, the root included.
    ///
    /// A nonexistent root is an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDatasetName`] for a malformed root, or
    /// the classified tool error on failure.
    pub async fn list_filesystems(&self, root: &str) -> Result<Vec<Filesystem>> {
        let command = self.command(["list", "-Hr", "-o", "name", root]);
        let output = self.runner().output(command).await?;

        if !output.success() {
            return match classify(output.status, &output.stderr) {
                Error::NotFound(_) => Ok(Vec::new()),
                err => Err(err),
            };
        }

        let text = output.stdout_text();
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| self.filesystem(line))
            .collect())
    }
}
