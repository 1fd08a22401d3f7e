//! Centralized error types for mimewalk.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mimewalk library.
///
/// None of these are fatal to a run: callers report them and move on to
/// the next part or message.
#[derive(Error, Debug)]
pub enum MimeError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The message source does not exist.
    #[error("{0}: no such file")]
    NotFound(PathBuf),

    /// The message could not be parsed.
    #[error("{path}: parse error: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The character encoding is not supported.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Malformed input in the middle of a charset conversion.
    #[error("malformed {encoding} input at byte {offset}")]
    Conversion { encoding: String, offset: usize },

    /// The filter command could not be started.
    #[error("cannot run filter '{command}': {source}")]
    FilterSpawn {
        command: String,
        source: std::io::Error,
    },

    /// The filter command exited unsuccessfully.
    #[error("filter '{command}' failed: {status}")]
    FilterExit {
        command: String,
        status: std::process::ExitStatus,
    },

    /// Extraction refused to overwrite an existing file.
    #[error("{0}: file exists")]
    FileExists(PathBuf),

    /// A part name that does not yield a usable file name.
    #[error("invalid file name: {0:?}")]
    InvalidFilename(String),

    /// Writing to the output stream failed.
    #[error("output error: {0}")]
    Output(#[source] std::io::Error),
}

/// Convenience alias for `Result<T, MimeError>`.
pub type Result<T> = std::result::Result<T, MimeError>;

impl MimeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// `?` on a bare `io::Error` means the output stream failed; file
/// operations go through [`MimeError::io`] to keep their path.
impl From<std::io::Error> for MimeError {
    fn from(source: std::io::Error) -> Self {
        Self::Output(source)
    }
}
