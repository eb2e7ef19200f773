//! CLI error types with miette diagnostics

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::{Diagnostic, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Failed to read build manifest {}", path.display())]
    #[diagnostic(
        code(sitepurge::cli::manifest_read),
        help("Record the build with the host integration first")
    )]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid build manifest {}: {message}", path.display())]
    #[diagnostic(code(sitepurge::cli::manifest_parse))]
    ManifestParse {
        path: PathBuf,
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("{failed} of {total} pages failed to purge")]
    #[diagnostic(
        code(sitepurge::cli::pages_failed),
        help("Failed pages keep their original stylesheets; rerun with --level debug for details")
    )]
    PagesFailed { failed: usize, total: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] sitepurge_core::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] sitepurge_cache::Error),
}

impl CliError {
    /// Parse error pointing at the offending line and column of `src`.
    pub fn manifest_parse(path: PathBuf, src: String, error: &serde_json::Error) -> Self {
        let offset = byte_offset(&src, error.line(), error.column());
        Self::ManifestParse {
            path,
            message: error.to_string(),
            src,
            span: (offset, 0).into(),
        }
    }
}

/// Byte offset of a 1-based line and column, clamped to the input.
fn byte_offset(src: &str, line: usize, column: usize) -> usize {
    let line_start: usize = src
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(src.len())
}
