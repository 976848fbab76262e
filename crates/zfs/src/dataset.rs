//! Shared behavior of pool-scoped datasets.

use async_trait::async_trait;
use tracing::debug;
use zetta_runner::CommandOutput;

use crate::Zfs;
use crate::classify::classify;
use crate::error::{Error, Result};

/// Recursion mode for destroying a dataset.
///
/// The three modes are strictly ordered in destructive power.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DestroyRecursion {
    /// Fail if the dataset has dependent snapshots or clones.
    #[default]
    None,

    /// Recursively destroy descendant snapshots and filesystems, but
    /// fail if a clone depends on any of them (`-r`).
    Soft,

    /// Recursively destroy everything, dependent clones included (`-R`).
    Hard,
}

impl DestroyRecursion {
    pub(crate) const fn flag(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Soft => Some("-r"),
            Self::Hard => Some("-R"),
        }
    }
}

/// Shared base value wrapped by every dataset entity.
///
/// Holds the configured [`Zfs`] handle and the dataset path. No remote
/// state is cached: every query re-invokes the external tool, since the
/// storage state can change out-of-band between calls.
#[derive(Clone)]
pub struct DatasetBase {
    zfs: Zfs,
    path: String,
}

impl DatasetBase {
    pub(crate) fn new(zfs: Zfs, path: String) -> Self {
        Self { zfs, path }
    }

    pub(crate) const fn zfs(&self) -> &Zfs {
        &self.zfs
    }

    /// Full dataset path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pool identifier: the segment before the first `/`.
    #[must_use]
    pub fn pool(&self) -> &str {
        self.path
            .split_once('/')
            .map_or(self.path.as_str(), |(pool, _)| pool)
    }

    /// Final `/`-delimited path segment.
    #[must_use]
    pub fn last_path(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map_or(self.path.as_str(), |(_, last)| last)
    }

    /// Runs a `zfs` subcommand, classifying a non-zero exit into a typed
    /// error.
    pub(crate) async fn run<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = self.zfs.command(args);
        let output = self.zfs.runner().output(command).await?;

        if output.success() {
            Ok(output)
        } else {
            Err(classify(output.status, &output.stderr))
        }
    }

    /// Queries a single named property.
    pub(crate) async fn get_property(&self, property: &str) -> Result<String> {
        let output = self
            .run(["get", "-Hp", "-o", "value", property, self.path.as_str()])
            .await?;

        Ok(first_line(&output.stdout_text()).to_string())
    }

    pub(crate) async fn get_property_int(&self, property: &str) -> Result<i64> {
        let value = self.get_property(property).await?;

        value
            .parse()
            .map_err(|source| Error::PropertyNotNumeric {
                property: property.to_string(),
                value,
                source,
            })
    }

    /// Sets a property, then reads it back and fails unless the stored
    /// value equals what was requested. The tool can silently coerce or
    /// reject values, so verification is mandatory.
    pub(crate) async fn set_property(&self, property: &str, value: &str) -> Result<()> {
        let assignment = format!("{property}={value}");
        self.run(["set", assignment.as_str(), self.path.as_str()])
            .await?;

        let actual = self.get_property(property).await?;
        if actual != value {
            return Err(Error::PropertyNotApplied {
                property: property.to_string(),
                requested: value.to_string(),
                actual,
            });
        }

        Ok(())
    }

    /// Whether a dataset exists at exactly this path.
    ///
    /// The listing is restricted to the path and the returned name must
    /// equal the path exactly, so a prefix match is never a false
    /// positive. A nonexistent dataset is not an error to this call.
    pub(crate) async fn exists(&self) -> Result<bool> {
        let command = self
            .zfs
            .command(["list", "-H", "-o", "name", self.path.as_str()]);
        let output = self.zfs.runner().output(command).await?;

        if output.success() {
            return Ok(first_line(&output.stdout_text()) == self.path);
        }

        match classify(output.status, &output.stderr) {
            Error::NotFound(_) => Ok(false),
            err => Err(err),
        }
    }

    pub(crate) async fn destroy(&self, recursion: DestroyRecursion) -> Result<()> {
        let mut args = vec!["destroy"];
        if let Some(flag) = recursion.flag() {
            args.push(flag);
        }
        args.push(self.path.as_str());

        debug!(path = %self.path, ?recursion, "destroying dataset");
        self.run(args).await?;

        Ok(())
    }
}

/// Minimal capability set shared by filesystems, snapshots, and clones.
///
/// Entities embed a [`DatasetBase`] and get the shared behavior through
/// the default methods here; richer operations live on the concrete
/// types.
#[async_trait]
pub trait Dataset: Send + Sync {
    /// The shared base value backing this entity.
    fn base(&self) -> &DatasetBase;

    /// Full dataset path.
    fn path(&self) -> &str {
        self.base().path()
    }

    /// Pool identifier: the segment before the first `/`.
    fn pool(&self) -> &str {
        self.base().pool()
    }

    /// Final `/`-delimited path segment.
    fn last_path(&self) -> &str {
        self.base().last_path()
    }

    /// Queries a single named property.
    async fn get_property(&self, property: &str) -> Result<String> {
        self.base().get_property(property).await
    }

    /// Queries a single named property and parses it as an integer.
    async fn get_property_int(&self, property: &str) -> Result<i64> {
        self.base().get_property_int(property).await
    }

    /// Sets a property and verifies the stored value by reading it back.
    async fn set_property(&self, property: &str, value: &str) -> Result<()> {
        self.base().set_property(property, value).await
    }

    /// Whether a dataset exists at exactly this path.
    async fn exists(&self) -> Result<bool> {
        self.base().exists().await
    }

    /// Destroys the dataset with the given recursion mode.
    async fn destroy(&self, recursion: DestroyRecursion) -> Result<()> {
        self.base().destroy(recursion).await
    }
}

fn first_line(text: &str) -> &str {
    text.split('\n').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(path: &str) -> DatasetBase {
        DatasetBase::new(Zfs::local(), path.to_string())
    }

    #[test]
    fn pool_is_first_segment() {
        assert_eq!(base("tank/some/thing").pool(), "tank");
        assert_eq!(base("tank").pool(), "tank");
        assert_eq!(base("tank/fs@s1").pool(), "tank");
    }

    #[test]
    fn last_path_is_final_segment() {
        assert_eq!(base("tank/some/thing").last_path(), "thing");
        assert_eq!(base("tank").last_path(), "tank");
        assert_eq!(base("tank/fs@s1").last_path(), "fs@s1");
    }

    #[test]
    fn destroy_recursion_flags() {
        assert_eq!(DestroyRecursion::None.flag(), None);
        assert_eq!(DestroyRecursion::Soft.flag(), Some("-r"));
        assert_eq!(DestroyRecursion::Hard.flag(), Some("-R"));
    }

    #[test]
    fn first_line_takes_text_before_newline() {
        assert_eq!(first_line("1000000\n"), "1000000");
        assert_eq!(first_line("tank/fs"), "tank/fs");
        assert_eq!(first_line(""), "");
    }
}
