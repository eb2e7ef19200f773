//! Purge engine contract and adapters.
//!
//! The selector purging algorithm itself lives outside this crate. A
//! [`PurgeEngine`] receives the bundled stylesheets of a build and the
//! content sources of one page, and returns the CSS that page actually uses.
//! Engines must be deterministic: cache entries are only valid if the same
//! request always produces the same CSS text.

use crate::options::ContentSource;
use crate::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Splits content into candidate selector tokens.
pub trait SelectorExtractor: Send + Sync + fmt::Debug {
    /// Candidate selectors found in `content`.
    fn extract(&self, content: &str) -> Vec<String>;
}

/// Candidate selector pattern used when none is configured.
const DEFAULT_PATTERN: &str = r#"[^<>"'`\s]*[^<>"'`\s:]"#;

static DEFAULT_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(DEFAULT_PATTERN).ok());

fn find_all(pattern: &Regex, content: &str) -> Vec<String> {
    pattern
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Default extractor: runs of characters outside `<>"'` backtick and
/// whitespace that do not end in `:`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl SelectorExtractor for DefaultExtractor {
    fn extract(&self, content: &str) -> Vec<String> {
        DEFAULT_REGEX
            .as_ref()
            .map_or_else(Vec::new, |pattern| find_all(pattern, content))
    }
}

/// Extractor returning every match of a user supplied regex.
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    pattern: Regex,
}

impl RegexExtractor {
    /// Compile an extractor from a pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            Error::configuration(format!("Invalid extractor pattern '{pattern}': {e}"))
        })?;
        Ok(Self { pattern })
    }
}

impl SelectorExtractor for RegexExtractor {
    fn extract(&self, content: &str) -> Vec<String> {
        find_all(&self.pattern, content)
    }
}

/// Extractor for an optional configured pattern, falling back to [`DefaultExtractor`].
pub fn extractor_for(pattern: Option<&str>) -> Result<Arc<dyn SelectorExtractor>> {
    Ok(match pattern {
        Some(pattern) => Arc::new(RegexExtractor::new(pattern)?),
        None => Arc::new(DefaultExtractor),
    })
}

/// Everything the engine needs to purge the stylesheets for one page.
#[derive(Debug, Clone)]
pub struct PurgeRequest {
    /// Bundled stylesheets to purge.
    pub css: Vec<PathBuf>,
    /// Sources scanned for used selectors.
    pub content: Vec<ContentSource>,
    /// Selector extractor applied to every content source.
    pub extractor: Arc<dyn SelectorExtractor>,
    /// Extra engine configuration, passed through unmodified.
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl PurgeRequest {
    /// Run the extractor over every content source.
    ///
    /// A content file that cannot be read fails the request.
    pub async fn candidate_selectors(&self) -> Result<BTreeSet<String>> {
        let mut selectors = BTreeSet::new();
        for source in &self.content {
            let text = match source {
                ContentSource::Path(path) => tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| Error::io(e, path, "read"))?,
                ContentSource::Raw { raw, .. } => raw.clone(),
            };
            selectors.extend(self.extractor.extract(&text));
        }
        Ok(selectors)
    }
}

/// Purged CSS for one input stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeResult {
    /// Retained CSS text.
    pub css: String,
    /// Stylesheet the CSS came from; `None` for inline CSS.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// External CSS purging function.
#[async_trait]
pub trait PurgeEngine: Send + Sync {
    /// Purge the request's stylesheets against its content sources.
    async fn purge(&self, request: &PurgeRequest) -> Result<Vec<PurgeResult>>;
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    css: &'a [PathBuf],
    content: &'a [ContentSource],
    selectors: BTreeSet<String>,
    options: &'a serde_json::Map<String, serde_json::Value>,
}

/// Engine bridging to an external purge process over JSON.
///
/// The request (stylesheets, content sources, extracted candidate selectors
/// and pass-through options) is written to the command's stdin; the command
/// must print a JSON array of `{ "css": ..., "file": ... }` on stdout.
#[derive(Debug, Clone)]
pub struct CommandPurgeEngine {
    program: String,
    args: Vec<String>,
}

impl CommandPurgeEngine {
    /// Engine running `program` with `args`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl PurgeEngine for CommandPurgeEngine {
    async fn purge(&self, request: &PurgeRequest) -> Result<Vec<PurgeResult>> {
        let payload = CommandRequest {
            css: &request.css,
            content: &request.content,
            selectors: request.candidate_selectors().await?,
            options: &request.options,
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| Error::engine(format!("Failed to encode purge request: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::io_no_path(e, format!("spawn purge engine {}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::engine("Purge engine stdin unavailable"))?;
        // Stdout and stderr are drained while the request is written.
        let write_request = async move {
            let written = stdin.write_all(&body).await;
            drop(stdin);
            written
        };
        let (written, output) = tokio::join!(write_request, child.wait_with_output());
        let output = output.map_err(|e| Error::io_no_path(e, "wait for purge engine"))?;

        // An engine may answer without reading its whole request.
        if let Err(e) = written
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(Error::io_no_path(e, "write purge request"));
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::engine(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::engine(format!("Invalid purge engine output: {e}")))
    }
}
