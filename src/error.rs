//! Structured error handling for cache reads.

use std::path::PathBuf;

/// Result alias used throughout the reader.
pub type Result<T> = std::result::Result<T, BlockfileError>;

/// Errors that can occur while reading a blockfile cache.
///
/// Validation failures are not represented here when probing: the
/// [`is_cache_directory`](crate::validate::is_cache_directory) check returns
/// `false` instead. [`BlockfileError::NotACacheDirectory`] is only produced
/// when an operation that requires a cache is handed something else.
///
/// Unknown content encodings are not errors either: the body is returned
/// undecoded and a warning is logged.
#[derive(thiserror::Error, Debug)]
pub enum BlockfileError {
    /// The directory is missing `index`/`data_0` or their magic numbers differ.
    #[error("Not a blockfile cache directory: {}", .0.display())]
    NotACacheDirectory(PathBuf),

    /// An I/O error occurred while reading an index, block, or external file.
    ///
    /// Truncated files surface here as [`std::io::ErrorKind::UnexpectedEof`].
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        /// File where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The on-disk structures are inconsistent: a chain cycle, an address
    /// naming a missing or wrongly-typed block file, or an impossible size.
    #[error("Corrupt cache index: {0}")]
    CorruptIndex(String),
}

impl BlockfileError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a [`BlockfileError::CorruptIndex`] from anything printable.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptIndex(message.into())
    }

    /// Whether this error indicates on-disk corruption rather than an I/O fault.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptIndex(_))
    }
}
