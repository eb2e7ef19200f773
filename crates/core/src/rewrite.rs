//! Rewriting emitted HTML to reference per-page stylesheets.

use crate::engine::PurgeResult;
use crate::{Error, Result};
use sitepurge_cache::{CacheEntry, CacheKey, PurgeCache, hashed_css_path};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Replace every reference to `from` in `html` with `to`.
#[must_use]
pub fn rename_references(html: &str, from: &str, to: &str) -> String {
    if from.is_empty() || from == to {
        return html.to_string();
    }
    html.replace(from, to)
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Applies purge results and cache entries to the build output.
#[derive(Debug, Clone)]
pub struct OutputRewriter {
    cache: PurgeCache,
}

impl OutputRewriter {
    /// Rewriter recording purge results in `cache`.
    #[must_use]
    pub fn new(cache: PurgeCache) -> Self {
        Self { cache }
    }

    /// Cache the rewriter reads and records entries in.
    #[must_use]
    pub fn cache(&self) -> &PurgeCache {
        &self.cache
    }

    /// Replay cached entries onto one HTML file.
    ///
    /// Returns the stylesheets written.
    pub async fn apply_cached(
        &self,
        output_path: &Path,
        html: String,
        entries: &[CacheEntry],
    ) -> Result<Vec<PathBuf>> {
        let mut html = html;
        let mut written = Vec::with_capacity(entries.len());

        for entry in entries {
            write_file(&entry.file, entry.css.as_bytes()).await?;
            html = rename_references(&html, &entry.purged_file, &entry.file_name());
            written.push(entry.file.clone());
        }

        write_file(output_path, html.as_bytes()).await?;
        Ok(written)
    }

    /// Write freshly purged stylesheets, rewrite the HTML and record the
    /// entries under `key`.
    ///
    /// Results without a `.css` source file are ignored. Returns the
    /// stylesheets written.
    pub async fn apply_purged(
        &self,
        key: &CacheKey,
        output_path: &Path,
        html: String,
        results: &[PurgeResult],
    ) -> Result<Vec<PathBuf>> {
        let mut html = html;
        let mut entries = Vec::new();

        for result in results {
            let Some(source) = result.file.as_deref() else {
                continue;
            };
            if source.extension().is_none_or(|ext| ext != "css") {
                continue;
            }

            let target = hashed_css_path(source, &result.css);
            write_file(&target, result.css.as_bytes()).await?;

            let purged_file = basename(source);
            html = rename_references(&html, &purged_file, &basename(&target));
            entries.push(CacheEntry {
                css: result.css.clone(),
                file: target,
                purged_file,
            });
        }

        write_file(output_path, html.as_bytes()).await?;
        self.cache.put(key, &entries);
        Ok(entries.into_iter().map(|entry| entry.file).collect())
    }
}

/// Whether `html` still links a bundle any of `entries` was purged from.
///
/// Bundle names carry the bundler's content hash, so an entry whose bundle
/// is no longer referenced describes CSS from an earlier build.
#[must_use]
pub fn references_cached_bundle(html: &str, entries: &[CacheEntry]) -> bool {
    entries
        .iter()
        .any(|entry| !entry.purged_file.is_empty() && html.contains(&entry.purged_file))
}

/// Read an emitted HTML file.
pub async fn read_html(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(e, path, "read"))
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io(e, path, "write"))
}

/// Empty every bundle not in `keep`.
///
/// Returns the files truncated; failures are logged and skipped.
pub async fn truncate_bundles(bundles: &[PathBuf], keep: &HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut truncated = Vec::new();
    for bundle in bundles {
        if keep.contains(bundle) {
            debug!(file = %bundle.display(), "Keeping stylesheet written by this build");
            continue;
        }
        match tokio::fs::write(bundle, b"").await {
            Ok(()) => truncated.push(bundle.clone()),
            Err(e) => warn!(file = %bundle.display(), error = %e, "Failed to truncate bundle"),
        }
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HTML: &str = r#"<html><head><link rel="stylesheet" href="/_astro/index.AbCd1234.css"></head><body class="card"></body></html>"#;

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let assets = temp.path().join("dist/_astro");
        std::fs::create_dir_all(&assets).unwrap();
        let bundle = assets.join("index.AbCd1234.css");
        std::fs::write(&bundle, ".card{color:red}.unused{color:blue}").unwrap();
        let page = temp.path().join("dist/index.html");
        std::fs::write(&page, HTML).unwrap();
        (temp, bundle, page)
    }

    #[test]
    fn test_rename_replaces_every_occurrence() {
        let html = "a.css b a.css";
        assert_eq!(rename_references(html, "a.css", "c.css"), "c.css b c.css");
        assert_eq!(rename_references(html, "", "c.css"), html);
    }

    #[tokio::test]
    async fn test_apply_purged_writes_hashed_css_and_caches() {
        let (temp, bundle, page) = fixture();
        let cache = PurgeCache::new(temp.path().join("cache"));
        assert!(cache.ensure_dir());
        let rewriter = OutputRewriter::new(cache.clone());
        let key = CacheKey::new("deadbeef");

        let results = vec![
            PurgeResult {
                css: "p { padding: 20px; }".to_string(),
                file: Some(bundle.clone()),
            },
            PurgeResult {
                css: "inline{}".to_string(),
                file: None,
            },
        ];
        let html = read_html(&page).await.unwrap();
        let written = rewriter
            .apply_purged(&key, &page, html, &results)
            .await
            .unwrap();

        let expected = bundle.with_file_name("index.2430a115.css");
        assert_eq!(written, vec![expected.clone()]);
        assert_eq!(std::fs::read_to_string(&expected).unwrap(), "p { padding: 20px; }");

        let rewritten = std::fs::read_to_string(&page).unwrap();
        assert!(rewritten.contains("/_astro/index.2430a115.css"));
        assert!(!rewritten.contains("index.AbCd1234.css"));

        let entries = cache.get(&key);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].purged_file, "index.AbCd1234.css");
        assert_eq!(entries[0].file, expected);
    }

    #[tokio::test]
    async fn test_apply_cached_replays_entries() {
        let (temp, bundle, page) = fixture();
        let rewriter = OutputRewriter::new(PurgeCache::new(temp.path().join("cache")));
        let target = bundle.with_file_name("index.0f182320.css");
        let entries = vec![CacheEntry {
            css: "p{padding:20px}".to_string(),
            file: target.clone(),
            purged_file: "index.AbCd1234.css".to_string(),
        }];

        let html = read_html(&page).await.unwrap();
        assert!(references_cached_bundle(&html, &entries));
        let written = rewriter.apply_cached(&page, html, &entries).await.unwrap();
        assert_eq!(written, vec![target.clone()]);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "p{padding:20px}");
        assert!(std::fs::read_to_string(&page).unwrap().contains("index.0f182320.css"));
    }

    #[test]
    fn test_renamed_bundle_is_not_referenced() {
        let entries = vec![CacheEntry {
            css: ".card{}".to_string(),
            file: PathBuf::from("/dist/_astro/index.0f182320.css"),
            purged_file: "index.AbCd1234.css".to_string(),
        }];
        assert!(!references_cached_bundle(
            r#"<link href="/_astro/index.EfGh5678.css">"#,
            &entries
        ));
    }

    #[tokio::test]
    async fn test_apply_cached_unwritable_html_fails() {
        let temp = TempDir::new().unwrap();
        let rewriter = OutputRewriter::new(PurgeCache::new(temp.path().join("cache")));
        let result = rewriter
            .apply_cached(&temp.path().join("missing/index.html"), HTML.to_string(), &[])
            .await;
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[tokio::test]
    async fn test_truncate_skips_kept_files() {
        let (_temp, bundle, _page) = fixture();
        let purged = bundle.with_file_name("index.2430a115.css");
        std::fs::write(&purged, "p{}").unwrap();

        let keep = HashSet::from([purged.clone()]);
        let truncated = truncate_bundles(&[bundle.clone(), purged.clone()], &keep).await;

        assert_eq!(truncated, vec![bundle.clone()]);
        assert_eq!(std::fs::read_to_string(&bundle).unwrap(), "");
        assert_eq!(std::fs::read_to_string(&purged).unwrap(), "p{}");
    }
}
