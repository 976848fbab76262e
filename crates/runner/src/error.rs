//! Error types for command execution.

use std::io;

use thiserror::Error;

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running commands.
#[derive(Debug, Error)]
pub enum Error {
    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] io::Error),

    /// A requested pipe was not opened on the child process.
    #[error("{0} pipe not available")]
    MissingPipe(&'static str),
}
