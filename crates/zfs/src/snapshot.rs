//! Snapshot entities: cloning and clone discovery.

use tracing::info;

use crate::Zfs;
use crate::dataset::{Dataset, DatasetBase};
use crate::error::{Error, Result};
use crate::fs::Filesystem;

/// An immutable, point-in-time, read-only view of a filesystem, named
/// `<filesystem-path>@<name>`.
///
/// The back-reference to the parent filesystem is reconstructed from the
/// path, never cached as live state.
#[derive(Clone)]
pub struct Snapshot {
    base: DatasetBase,
    filesystem: Filesystem,
    name: String,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("path", &self.base.path())
            .field("filesystem", &self.filesystem)
            .field("name", &self.name)
            .finish()
    }
}

impl Dataset for Snapshot {
    fn base(&self) -> &DatasetBase {
        &self.base
    }
}

impl Snapshot {
    pub(crate) fn from_path(zfs: &Zfs, path: &str) -> Result<Self> {
        let (filesystem_path, name) = parse_snapshot_path(path)?;

        Ok(Self {
            base: DatasetBase::new(zfs.clone(), path.to_string()),
            filesystem: zfs.filesystem(filesystem_path),
            name: name.to_string(),
        })
    }

    /// The filesystem this snapshot was taken of.
    #[must_use]
    pub const fn parent(&self) -> &Filesystem {
        &self.filesystem
    }

    /// The snapshot name, the part after `@`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clones this snapshot into a new writable filesystem.
    ///
    /// The clone must live in the snapshot's pool; a cross-pool target
    /// is rejected before any external command is issued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolMismatch`] for a cross-pool target, or the
    /// classified tool error on failure.
    pub async fn clone_into(&self, target_path: &str) -> Result<Filesystem> {
        let target = self.base.zfs().filesystem(target_path);

        if self.pool() != target.pool() {
            return Err(Error::PoolMismatch {
                source_pool: self.pool().to_string(),
                target: target.pool().to_string(),
            });
        }

        self.base
            .run(["clone", self.path(), target_path])
            .await?;
        info!(source = %self.path(), target = target_path, "cloned snapshot");

        Ok(target)
    }

    /// Lists the filesystems cloned from this snapshot: every filesystem
    /// in the snapshot's pool whose `origin` property equals this
    /// snapshot's path.
    ///
    /// # Errors
    ///
    /// Returns the classified tool error on failure.
    pub async fn list_clones(&self) -> Result<Vec<Filesystem>> {
        let filesystems = self.base.zfs().list_filesystems(self.pool()).await?;

        let mut clones = Vec::new();
        for filesystem in filesystems {
            if filesystem.get_property("origin").await? == self.path() {
                clones.push(filesystem);
            }
        }

        Ok(clones)
    }
}

impl Zfs {
    /// Returns a [`Snapshot`] wrapper for a `<filesystem>@<name>` path
    /// without issuing any command or checking existence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDatasetName`] unless the path contains
    /// exactly one `@` with a nonempty filesystem path and name around
    /// it.
    pub fn snapshot(&self, path: &str) -> Result<Snapshot> {
        Snapshot::from_path(self, path)
    }
}

fn parse_snapshot_path(path: &str) -> Result<(&str, &str)> {
    match path.split_once('@') {
        Some((filesystem, name))
            if !filesystem.is_empty() && !name.is_empty() && !name.contains('@') =>
        {
            Ok((filesystem, name))
        }
        _ => Err(Error::InvalidDatasetName(format!(
            "'{path}' is not a valid snapshot path"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn snapshot_path_decomposes() {
        let zfs = Zfs::local();
        let snapshot = zfs.snapshot("tank/test/fs1@s1").unwrap();

        assert_eq!(snapshot.path(), "tank/test/fs1@s1");
        assert_eq!(snapshot.name(), "s1");
        assert_eq!(snapshot.parent().path(), "tank/test/fs1");
        assert_eq!(snapshot.pool(), "tank");
    }

    #[test]
    fn snapshot_path_requires_exactly_one_separator() {
        let zfs = Zfs::local();

        assert_matches!(zfs.snapshot("tank/fs1"), Err(Error::InvalidDatasetName(_)));
        assert_matches!(zfs.snapshot("tank/fs1@"), Err(Error::InvalidDatasetName(_)));
        assert_matches!(zfs.snapshot("@s1"), Err(Error::InvalidDatasetName(_)));
        assert_matches!(
            zfs.snapshot("tank/fs1@s1@s2"),
            Err(Error::InvalidDatasetName(_))
        );
    }
}
