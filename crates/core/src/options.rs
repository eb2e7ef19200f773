//! Build and purge configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Assets subdirectory used by the host when none is configured.
pub const DEFAULT_ASSETS_DIR: &str = "_astro";

/// Extension given to inline content without one.
fn default_extension() -> String {
    "html".to_string()
}

/// A source scanned for selectors while purging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentSource {
    /// File path or glob pattern.
    Path(String),
    /// Inline markup.
    Raw {
        /// Markup text.
        raw: String,
        /// Kind of markup, e.g. `html`.
        #[serde(default = "default_extension")]
        extension: String,
    },
}

impl ContentSource {
    /// Inline HTML content.
    #[must_use]
    pub fn html(raw: impl Into<String>) -> Self {
        Self::Raw {
            raw: raw.into(),
            extension: default_extension(),
        }
    }

    /// Content read from a file path.
    #[must_use]
    pub fn path(path: impl AsRef<Path>) -> Self {
        Self::Path(path.as_ref().to_string_lossy().into_owned())
    }
}

/// User configuration for the purge integration.
///
/// Unknown keys are kept in [`PurgeOptions::engine_options`] and handed to
/// the purge engine untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeOptions {
    /// Extra content sources scanned for every page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentSource>,

    /// Regex replacing the default selector extractor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,

    /// Override for the cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Remaining engine options.
    #[serde(flatten)]
    pub engine_options: serde_json::Map<String, serde_json::Value>,
}

impl PurgeOptions {
    /// Load options from a TOML or JSON file (chosen by extension).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content).map_err(|e| {
                Error::configuration(format!("Invalid options in {}: {e}", path.display()))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                Error::configuration(format!("Invalid options in {}: {e}", path.display()))
            })
        }
    }

    /// Add a content source.
    #[must_use]
    pub fn with_content(mut self, source: ContentSource) -> Self {
        self.content.push(source);
        self
    }

    /// Set the extractor regex.
    #[must_use]
    pub fn with_extractor(mut self, pattern: impl Into<String>) -> Self {
        self.extractor = Some(pattern.into());
        self
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set a pass-through engine option.
    #[must_use]
    pub fn with_engine_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.engine_options.insert(key.into(), value.into());
        self
    }

    /// Path and glob entries of [`PurgeOptions::content`].
    pub fn content_patterns(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|source| match source {
            ContentSource::Path(pattern) => Some(pattern.as_str()),
            ContentSource::Raw { .. } => None,
        })
    }

    /// Inline entries of [`PurgeOptions::content`].
    pub fn inline_content(&self) -> impl Iterator<Item = &ContentSource> {
        self.content
            .iter()
            .filter(|source| matches!(source, ContentSource::Raw { .. }))
    }

    /// Expand the path and glob entries into existing files.
    ///
    /// Relative patterns are resolved against `project_root`. The result is
    /// sorted and deduplicated so cache keys do not depend on filesystem
    /// iteration order.
    pub fn resolve_content_files(&self, project_root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for pattern in self.content_patterns() {
            let full_pattern = if Path::new(pattern).is_absolute() {
                PathBuf::from(pattern)
            } else {
                project_root.join(pattern)
            };
            let pattern_str = full_pattern.to_str().ok_or_else(|| {
                Error::configuration(format!(
                    "Content pattern contains invalid UTF-8: {}",
                    full_pattern.display()
                ))
            })?;
            let matches = glob::glob(pattern_str).map_err(|e| {
                Error::configuration(format!("Invalid content pattern '{pattern}': {e}"))
            })?;
            for entry in matches.flatten() {
                if entry.is_file() {
                    files.push(entry);
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

/// Output mode the host builds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Every page prerendered to HTML.
    #[default]
    Static,
    /// Pages rendered on demand.
    Server,
    /// Mixed prerendered and on-demand pages.
    Hybrid,
}

impl OutputMode {
    /// Whether the build is fully static.
    #[must_use]
    pub fn is_static(self) -> bool {
        matches!(self, Self::Static)
    }
}

/// Host configuration, reported once it is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Output mode of the build.
    #[serde(default)]
    pub output: OutputMode,
    /// Project root reported by the host; overrides the session's root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
    /// Build output directory.
    pub out_dir: PathBuf,
    /// Subdirectory of `out_dir` holding bundled assets.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
}

fn default_assets_dir() -> String {
    DEFAULT_ASSETS_DIR.to_string()
}

impl BuildConfig {
    /// Static build writing to `out_dir`.
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            output: OutputMode::Static,
            project_root: None,
            out_dir: out_dir.into(),
            assets_dir: default_assets_dir(),
        }
    }

    /// Set the output mode.
    #[must_use]
    pub const fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Set the project root.
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Set the assets subdirectory.
    #[must_use]
    pub fn with_assets_dir(mut self, assets_dir: impl Into<String>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_source_untagged() {
        let sources: Vec<ContentSource> =
            serde_json::from_str(r#"["src/**/*.md", {"raw": "<p class=\"x\"></p>"}]"#).unwrap();
        assert_eq!(sources[0], ContentSource::Path("src/**/*.md".to_string()));
        assert_eq!(sources[1], ContentSource::html("<p class=\"x\"></p>"));
    }

    #[test]
    fn test_options_from_toml_keep_unknown_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sitepurge.toml");
        fs::write(
            &path,
            r#"
content = ["src/**/*.md", { raw = "<div class='modal'></div>", extension = "html" }]
extractor = "[A-Za-z0-9_-]+"
safelist = ["active"]
keyframes = true
"#,
        )
        .unwrap();

        let options = PurgeOptions::from_file(&path).unwrap();
        assert_eq!(options.content.len(), 2);
        assert_eq!(options.extractor.as_deref(), Some("[A-Za-z0-9_-]+"));
        assert_eq!(options.engine_options["keyframes"], serde_json::json!(true));
        assert_eq!(options.engine_options["safelist"], serde_json::json!(["active"]));
        assert_eq!(options.content_patterns().collect::<Vec<_>>(), vec!["src/**/*.md"]);
        assert_eq!(options.inline_content().count(), 1);
    }

    #[test]
    fn test_options_from_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sitepurge.json");
        fs::write(&path, r#"{"cacheDir": "/tmp/purge", "variables": true}"#).unwrap();

        let options = PurgeOptions::from_file(&path).unwrap();
        assert_eq!(options.cache_dir, Some(PathBuf::from("/tmp/purge")));
        assert_eq!(options.engine_options["variables"], serde_json::json!(true));
    }

    #[test]
    fn test_invalid_options_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sitepurge.toml");
        fs::write(&path, "content = 42").unwrap();
        assert!(matches!(
            PurgeOptions::from_file(&path),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_resolve_content_files_sorted() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("content")).unwrap();
        fs::write(temp.path().join("content/b.md"), "b").unwrap();
        fs::write(temp.path().join("content/a.md"), "a").unwrap();
        fs::write(temp.path().join("content/skip.txt"), "c").unwrap();

        let options = PurgeOptions::default()
            .with_content(ContentSource::Path("content/*.md".to_string()))
            .with_content(ContentSource::Path("content/a.md".to_string()))
            .with_content(ContentSource::html("<p></p>"));
        let files = options.resolve_content_files(temp.path()).unwrap();
        assert_eq!(
            files,
            vec![temp.path().join("content/a.md"), temp.path().join("content/b.md")]
        );
    }

    #[test]
    fn test_build_config_defaults() {
        let config: BuildConfig = serde_json::from_str(r#"{"outDir": "/site/dist"}"#).unwrap();
        assert_eq!(config.output, OutputMode::Static);
        assert_eq!(config.assets_dir, DEFAULT_ASSETS_DIR);
        assert!(config.output.is_static());
        assert!(!OutputMode::Server.is_static());
    }
}
