//! Module id filtering and path normalization.

use std::path::Path;

/// Image extensions whose modules never contribute selectors.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "svg", "gif", "avif"];

/// Path segment marking third-party dependency code.
pub const VENDOR_SEGMENT: &str = "node_modules";

/// Decides which module ids belong in a page's module set.
///
/// A module is kept when it lives under the project root, is not vendored
/// dependency code, and is not an image asset.
#[derive(Debug, Clone)]
pub struct ModuleFilter {
    /// Normalized project root with a trailing `/`.
    root_prefix: String,
}

impl ModuleFilter {
    /// Create a filter for a project root.
    #[must_use]
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let mut root_prefix = normalize_path(&project_root.as_ref().to_string_lossy());
        if !root_prefix.ends_with('/') {
            root_prefix.push('/');
        }
        Self { root_prefix }
    }

    /// Project root prefix used for membership checks (ends with `/`).
    #[must_use]
    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Whether a module id passes the filter.
    #[must_use]
    pub fn accepts(&self, id: &str) -> bool {
        !is_image(id) && id.starts_with(&self.root_prefix) && !id.contains(VENDOR_SEGMENT)
    }

    /// Retained ids from `ids`, query suffixes stripped.
    #[must_use]
    pub fn clean<'i>(&self, ids: impl IntoIterator<Item = &'i str>) -> Vec<String> {
        ids.into_iter()
            .filter(|id| self.accepts(id))
            .map(|id| strip_query(id).to_string())
            .collect()
    }

    /// Project-relative key for a page entry module.
    ///
    /// Ids outside the project root are normalized but otherwise kept as-is.
    #[must_use]
    pub fn page_key(&self, module_id: &str) -> String {
        let relative = module_id
            .strip_prefix(&self.root_prefix)
            .unwrap_or(module_id);
        normalize_path(relative)
    }
}

fn is_image(id: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| id.contains(&format!(".{ext}")))
}

/// Drop a `?query` suffix from a module id.
#[must_use]
pub fn strip_query(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}

/// Normalize a path string: `/` separators, no `.` segments, `..` resolved.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute { format!("/{joined}") } else { joined }
}
