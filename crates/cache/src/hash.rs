//! Content hashing for cache keys and purged stylesheet names

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Number of digest bytes kept in keys and filenames (8 hex characters).
const SHORT_DIGEST_BYTES: usize = 4;

/// A short content-addressed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already computed key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as hex text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the JSON file that stores entries for this key.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental cache key computation over file contents and inline text.
///
/// Inputs are hashed in the order they are added; the digest covers their
/// concatenated bytes only.
#[derive(Default)]
pub struct CacheKeyBuilder {
    hasher: Sha256,
}

impl CacheKeyBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the contents of a file.
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let bytes = fs::read(path).map_err(|e| Error::io(e, path, "read"))?;
        self.hasher.update(&bytes);
        Ok(())
    }

    /// Append raw bytes, e.g. inline markup from configuration.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Finish the digest and return the short key.
    #[must_use]
    pub fn finish(self) -> CacheKey {
        let digest = self.hasher.finalize();
        CacheKey(hex::encode(&digest[..SHORT_DIGEST_BYTES]))
    }
}

/// Derive the cache key for a list of contributing files.
pub fn derive_cache_key<I, P>(files: I) -> Result<CacheKey>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut builder = CacheKeyBuilder::new();
    for file in files {
        builder.add_file(file.as_ref())?;
    }
    Ok(builder.finish())
}

/// Short content hash (8 hex characters) of arbitrary bytes.
#[must_use]
pub fn content_hash(bytes: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(bytes.as_ref());
    hex::encode(&digest[..SHORT_DIGEST_BYTES])
}

/// Compute the path of the purged copy of a bundled stylesheet.
///
/// Bundler output follows `name.<hash>.css`; the trailing hash segment is
/// replaced by the hash of `css`. A name without a hash segment gains one.
#[must_use]
pub fn hashed_css_path(original: &Path, css: &str) -> PathBuf {
    let file_name = original
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.strip_suffix(".css").unwrap_or(&file_name);
    let base = match stem.rfind('.') {
        Some(idx) if idx > 0 => &stem[..idx],
        _ => stem,
    };
    let renamed = format!("{base}.{}.css", content_hash(css));
    original.with_file_name(renamed)
}
