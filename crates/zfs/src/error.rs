//! Error types for ZFS operations.

use std::num::ParseIntError;

use thiserror::Error;

/// Result type for ZFS operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the ZFS tool.
///
/// Variants produced by the diagnostic classifier carry the matched
/// diagnostic line; the remaining variants are raised locally before any
/// external command is issued.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown property name on a property read.
    #[error("{0}")]
    BadPropertyGet(String),

    /// Unknown property name on a property write.
    #[error("{0}")]
    BadPropertySet(String),

    /// Destroy blocked by existing children.
    #[error("{0}")]
    NeedsRecursive(String),

    /// Operation on a nonexistent dataset.
    #[error("{0}")]
    NotFound(String),

    /// Filesystem created but not mounted, typically a permissions issue.
    #[error("{0}")]
    NotMountedNeedsElevation(String),

    /// Explicit privilege error.
    #[error("{0}")]
    NeedsElevation(String),

    /// Create on an already-existing path.
    #[error("{0}")]
    AlreadyExists(String),

    /// Promote on a filesystem that is not a clone.
    #[error("{0}")]
    PromoteNotClone(String),

    /// Malformed dataset path.
    #[error("{0}")]
    InvalidDatasetName(String),

    /// Receive target collision.
    #[error("{0}")]
    ReceiverAlreadyExists(String),

    /// Incremental receive whose expected base snapshot does not match.
    #[error("{0}")]
    IncrementalBaseMismatch(String),

    /// A streaming participant exited before the stream finished.
    #[error("{0}")]
    BrokenPipe(String),

    /// Clone across pools, rejected before any external call is made.
    #[error("cannot clone across pools: source pool '{source_pool}' does not match target pool '{target}'")]
    PoolMismatch {
        /// Pool of the source snapshot.
        source_pool: String,
        /// Pool of the clone target path.
        target: String,
    },

    /// A property write did not stick on read-back verification.
    #[error("property {property} not set: requested '{requested}', got '{actual}'")]
    PropertyNotApplied {
        /// The property that was written.
        property: String,
        /// The requested value.
        requested: String,
        /// The value the tool actually stored.
        actual: String,
    },

    /// A property value could not be parsed as an integer.
    #[error("property {property} is not an integer: '{value}'")]
    PropertyNotNumeric {
        /// The property that was read.
        property: String,
        /// The non-numeric value returned by the tool.
        value: String,
        /// The underlying parse failure.
        #[source]
        source: ParseIntError,
    },

    /// Diagnostics that match no known pattern, joined with `; `.
    #[error("{0}")]
    Unclassified(String),

    /// Command execution failed before producing an exit status.
    #[error(transparent)]
    Runner(#[from] zetta_runner::Error),
}
