//! On-disk store of purge results keyed by content hash

use crate::{CacheKey, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Cache location relative to the project root (inside the dependency cache area).
pub const DEFAULT_CACHE_SUBDIR: &str = "node_modules/.cache/sitepurge";

/// One purged stylesheet recorded under a cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Purged stylesheet text
    pub css: String,
    /// Path of the content-hashed stylesheet the CSS was written to
    pub file: PathBuf,
    /// Basename of the bundled stylesheet that HTML references are rewritten from
    #[serde(rename = "purgedFile")]
    pub purged_file: String,
}

impl CacheEntry {
    /// Basename of the purged output file, the name HTML should reference.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// JSON-file cache of purge results.
///
/// Each key maps to `<dir>/<key>.json` holding a list of [`CacheEntry`].
/// Entries are never evicted.
#[derive(Debug, Clone)]
pub struct PurgeCache {
    dir: PathBuf,
}

impl PurgeCache {
    /// Create a cache rooted at `dir`. Nothing is touched on disk.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache in the default location under a project root.
    #[must_use]
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(DEFAULT_CACHE_SUBDIR))
    }

    /// Directory holding the cache files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the JSON file for a key
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Create the cache directory if needed.
    ///
    /// Returns `false` when the directory could not be created; later writes
    /// will fail and be logged, so the build only loses its cache.
    pub fn ensure_dir(&self) -> bool {
        match fs::create_dir_all(&self.dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to create purge cache directory"
                );
                false
            }
        }
    }

    /// Look up the entries stored for a key.
    ///
    /// A missing, unreadable or corrupt file is a miss (empty list).
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Vec<CacheEntry> {
        match self.read(key) {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Treating unreadable cache entry as miss");
                Vec::new()
            }
        }
    }

    fn read(&self, key: &CacheKey) -> Result<Option<Vec<CacheEntry>>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| Error::io(e, &path, "read"))?;
        let entries = serde_json::from_str(&content)
            .map_err(|source| Error::CorruptEntry { path, source })?;
        Ok(Some(entries))
    }

    /// Store the entries for a key. Failures are logged and swallowed.
    pub fn put(&self, key: &CacheKey, entries: &[CacheEntry]) {
        if let Err(e) = self.write(key, entries) {
            tracing::warn!(key = %key, error = %e, "Failed to write purge cache entry");
        }
    }

    /// Store the entries for a key, reporting failures to the caller.
    pub fn write(&self, key: &CacheKey, entries: &[CacheEntry]) -> Result<PathBuf> {
        let path = self.entry_path(key);
        let json = serde_json::to_string(entries).map_err(|source| Error::Encode {
            key: key.to_string(),
            source,
        })?;
        fs::write(&path, json).map_err(|e| Error::io(e, &path, "write"))?;
        tracing::debug!(key = %key, path = %path.display(), "Stored purge result");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entry() -> CacheEntry {
        CacheEntry {
            css: "p{padding:20px}".to_string(),
            file: PathBuf::from("/dist/_astro/index.0f182320.css"),
            purged_file: "index.BxK3a9Qz.css".to_string(),
        }
    }

    // ==========================================================================
    // CacheEntry tests
    // ==========================================================================

    #[test]
    fn test_cache_entry_json_field_names() {
        let json = serde_json::to_value(sample_entry()).unwrap();
        assert_eq!(json["css"], "p{padding:20px}");
        assert_eq!(json["file"], "/dist/_astro/index.0f182320.css");
        assert_eq!(json["purgedFile"], "index.BxK3a9Qz.css");
    }

    #[test]
    fn test_cache_entry_file_name() {
        assert_eq!(sample_entry().file_name(), "index.0f182320.css");
    }

    // ==========================================================================
    // PurgeCache tests
    // ==========================================================================

    #[test]
    fn test_for_project_uses_dependency_cache_area() {
        let cache = PurgeCache::for_project(Path::new("/project"));
        assert_eq!(
            cache.dir(),
            Path::new("/project/node_modules/.cache/sitepurge")
        );
    }

    #[test]
    fn test_get_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = PurgeCache::new(temp.path());
        assert!(cache.get(&CacheKey::new("deadbeef")).is_empty());
    }

    #[test]
    fn test_get_without_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = PurgeCache::new(temp.path().join("never-created"));
        assert!(cache.get(&CacheKey::new("deadbeef")).is_empty());
    }

    #[test]
    fn test_put_then_get() {
        let temp = TempDir::new().unwrap();
        let cache = PurgeCache::new(temp.path().join("cache"));
        assert!(cache.ensure_dir());

        let key = CacheKey::new("0f182320");
        cache.put(&key, &[sample_entry()]);

        assert!(cache.entry_path(&key).exists());
        assert_eq!(cache.get(&key), vec![sample_entry()]);
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let temp = TempDir::new().unwrap();
        let cache = PurgeCache::new(temp.path());
        let key = CacheKey::new("0f182320");
        fs::write(cache.entry_path(&key), "{not json").unwrap();
        assert!(matches!(cache.read(&key), Err(Error::CorruptEntry { .. })));
        assert!(cache.get(&key).is_empty());
    }

    #[test]
    fn test_put_without_directory_does_not_fail() {
        let temp = TempDir::new().unwrap();
        let cache = PurgeCache::new(temp.path().join("missing"));
        let key = CacheKey::new("0f182320");

        cache.put(&key, &[sample_entry()]);
        assert!(cache.write(&key, &[sample_entry()]).is_err());
        assert!(cache.get(&key).is_empty());
    }

    #[test]
    fn test_reads_original_cache_format() {
        let temp = TempDir::new().unwrap();
        let cache = PurgeCache::new(temp.path());
        let key = CacheKey::new("abcd1234");
        fs::write(
            cache.entry_path(&key),
            r#"[{"css":".a{}","file":"/dist/_astro/a.11111111.css","purgedFile":"a.22222222.css"}]"#,
        )
        .unwrap();

        let entries = cache.get(&key);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].purged_file, "a.22222222.css");
        assert_eq!(entries[0].file_name(), "a.11111111.css");
    }
}
