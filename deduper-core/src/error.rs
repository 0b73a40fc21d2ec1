//! Error types for signature, manifest and duplicate-finding operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by `deduper-core`.
#[derive(Debug, Error)]
pub enum Error {
    /// A format name outside the four recognized formats.
    #[error(
        "unsupported format {0:?} (expected one of: partial, partial-with-size, full, full-with-size)"
    )]
    UnsupportedFormat(String),

    /// A target file could not be opened or read.
    #[error("cannot read {path:?}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest line that is neither blank, a comment, nor `<signature> <path>`.
    #[error("malformed manifest line {line}: {content:?}")]
    ManifestParse { line: usize, content: String },

    /// The list file itself could not be opened, read or written.
    #[error("cannot access list file {path:?}: {source}")]
    ManifestAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest path that is absolute, climbs out of the start directory or
    /// crosses a symlink the policy does not allow.
    #[error("unsafe path: {0}")]
    UnsafePath(String),

    /// A file name that cannot be written as a single manifest line.
    #[error("path cannot be represented in a list file: {0:?}")]
    UnrepresentablePath(PathBuf),

    /// A duplicate removal strategy name that is not known.
    #[error("unsupported strategy {0:?} (expected one of: nop, keep-first)")]
    UnsupportedStrategy(String),

    /// Byte-for-byte check found files whose signatures agree but contents differ.
    #[error("diagnostics failed: {0} files differ from the first file of their group")]
    GroupMismatch(usize),

    /// Bad include/exclude glob.
    #[error("bad pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Directory traversal failure.
    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess { path: path.into(), source }
    }

    pub(crate) fn manifest_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ManifestAccess { path: path.into(), source }
    }
}

/// Result type for `deduper-core` operations.
pub type Result<T> = std::result::Result<T, Error>;
