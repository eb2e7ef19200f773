//! Error types for the purge pipeline

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for purge pipeline operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error while reading or rewriting build output
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(sitepurge::io),
        help("Check that the build output exists and is writable")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write")
        operation: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    #[diagnostic(code(sitepurge::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// The purge engine failed or returned malformed results
    #[error("Purge engine error: {message}")]
    #[diagnostic(
        code(sitepurge::engine),
        help("The page keeps its original stylesheet references")
    )]
    Engine {
        /// Error message describing the engine failure
        message: String,
    },

    /// Hooks were invoked out of order
    #[error("Build lifecycle error: {message}")]
    #[diagnostic(code(sitepurge::lifecycle))]
    Lifecycle {
        /// Error message describing the ordering problem
        message: String,
    },
}

impl Error {
    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an engine error
    #[must_use]
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }

    /// Create a lifecycle error
    #[must_use]
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: msg.into(),
        }
    }
}

/// Result type for purge pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
