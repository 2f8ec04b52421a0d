//! Failure taxonomy shared by readers and strategies.
//!
//! Every reader operation returns `ReadError`; strategies wrap it in a
//! `Failure` that records which side of the comparison produced it.

use std::fmt;
use std::io;

/// Error returned by a reader or digest operation.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The resource does not exist (missing file, HTTP 404/410).
    #[error("not found: {0}")]
    NotFound(String),
    /// Transport failure, or a remote that answered with an unusable status.
    #[error("unreachable: {0}")]
    Unreachable(String),
    /// Local read failure.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    /// The remote answered in a way the comparison cannot trust
    /// (ignored Range, wrong length, unexpected content encoding).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// API misuse: finalized accumulator, exhausted stream, range outside the resource.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Coarse classification of a `ReadError`, for reporting and matching in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadErrorKind {
    NotFound,
    Unreachable,
    Io,
    ProtocolViolation,
    InvalidState,
}

impl fmt::Display for ReadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadErrorKind::NotFound => "not-found",
            ReadErrorKind::Unreachable => "unreachable",
            ReadErrorKind::Io => "io",
            ReadErrorKind::ProtocolViolation => "protocol-violation",
            ReadErrorKind::InvalidState => "invalid-state",
        };
        f.write_str(s)
    }
}

impl ReadError {
    pub fn kind(&self) -> ReadErrorKind {
        match self {
            ReadError::NotFound(_) => ReadErrorKind::NotFound,
            ReadError::Unreachable(_) => ReadErrorKind::Unreachable,
            ReadError::Io { .. } => ReadErrorKind::Io,
            ReadError::ProtocolViolation(_) => ReadErrorKind::ProtocolViolation,
            ReadError::InvalidState(_) => ReadErrorKind::InvalidState,
        }
    }

    /// Map a local `io::Error` for `path`: a missing file is `NotFound`, anything else `Io`.
    pub fn from_io(path: &std::path::Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            ReadError::NotFound(path.display().to_string())
        } else {
            ReadError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    }
}
