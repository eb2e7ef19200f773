//! Errors raised while hashing sources or touching cache files

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for hashing and cache file access
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A source or cache file could not be read or written
    #[error("Failed to {operation} {}", path.display())]
    #[diagnostic(
        code(sitepurge::cache::io),
        help("Check that the file exists and the cache directory is writable")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// File being accessed
        path: PathBuf,
        /// What was attempted, e.g. "read"
        operation: &'static str,
    },

    /// A cache file exists but does not hold a list of entries
    #[error("Corrupt cache entry {}", path.display())]
    #[diagnostic(
        code(sitepurge::cache::corrupt_entry),
        help("Delete the file; the page is purged again on the next build")
    )]
    CorruptEntry {
        /// Cache file that failed to parse
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// Entries for a key could not be encoded
    #[error("Failed to encode cache entries for key {key}")]
    #[diagnostic(code(sitepurge::cache::encode))]
    Encode {
        /// Key the entries belong to
        key: String,
        /// Encoding failure
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// I/O failure on `path`
    #[must_use]
    pub fn io(source: std::io::Error, path: impl AsRef<Path>, operation: &'static str) -> Self {
        Self::Io {
            source,
            path: path.as_ref().to_path_buf(),
            operation,
        }
    }
}

/// Result type for hashing and cache file access
pub type Result<T> = std::result::Result<T, Error>;
