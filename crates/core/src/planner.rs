//! Turning resolved routes into per-output purge tasks.

use crate::engine::{PurgeRequest, SelectorExtractor};
use crate::options::ContentSource;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sitepurge_cache::{CacheKey, CacheKeyBuilder};
use sitepurge_graph::PageModuleMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Route pattern to the physical files emitted for it.
pub type AssetMap = HashMap<String, Vec<PathBuf>>;

/// One part of a route segment, e.g. `[slug]` or `blog`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutePart {
    /// Literal text or parameter name.
    pub content: String,
    /// Whether the part is a parameter.
    #[serde(default)]
    pub dynamic: bool,
    /// Whether the part is a rest parameter (`[...path]`).
    #[serde(default)]
    pub spread: bool,
}

/// A route as resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoute {
    /// Route pattern, the key into the [`AssetMap`].
    pub pattern: String,
    /// Project-relative path of the page entry module.
    pub entrypoint: String,
    /// URL segments of the route.
    #[serde(default)]
    pub segments: Vec<Vec<RoutePart>>,
    /// Fixed pathname; absent for parameterized routes.
    #[serde(default)]
    pub pathname: Option<String>,
}

impl ResolvedRoute {
    /// Catch-all page template: no fixed pathname and a single segment.
    #[must_use]
    pub fn is_dynamic_index(&self) -> bool {
        self.pathname.as_deref().is_none_or(str::is_empty) && self.segments.len() == 1
    }
}

/// Purge work for one emitted HTML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Emitted HTML artifact.
    pub output_path: PathBuf,
    /// Modules the page is built from.
    pub dependency_modules: Vec<PathBuf>,
}

/// Inputs shared by every task of a build.
#[derive(Debug, Clone)]
pub struct PurgeContext {
    /// Bundled stylesheets discovered before any task ran.
    pub css_files: Vec<PathBuf>,
    /// Files matched by the configured content patterns.
    pub content_files: Vec<PathBuf>,
    /// Inline content sources from configuration.
    pub inline_content: Vec<ContentSource>,
    /// Selector extractor handed to the engine.
    pub extractor: Arc<dyn SelectorExtractor>,
    /// Pass-through engine options.
    pub engine_options: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    /// Derive the task's cache key from dependency and global content bytes.
    ///
    /// The page's own HTML is not part of the key.
    pub async fn cache_key(&self, context: &PurgeContext) -> Result<CacheKey> {
        let mut builder = CacheKeyBuilder::new();
        for path in self.dependency_modules.iter().chain(&context.content_files) {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| Error::io(e, path, "read"))?;
            builder.add_bytes(&bytes);
        }
        for source in &context.inline_content {
            if let ContentSource::Raw { raw, .. } = source {
                builder.add_bytes(raw.as_bytes());
            }
        }
        Ok(builder.finish())
    }

    /// Build the engine request for this page.
    #[must_use]
    pub fn purge_request(&self, context: &PurgeContext, html: &str) -> PurgeRequest {
        let mut content: Vec<ContentSource> = self
            .dependency_modules
            .iter()
            .chain(&context.content_files)
            .map(ContentSource::path)
            .collect();
        content.extend(context.inline_content.iter().cloned());
        content.push(ContentSource::html(html));

        PurgeRequest {
            css: context.css_files.clone(),
            content,
            extractor: Arc::clone(&context.extractor),
            options: context.engine_options.clone(),
        }
    }
}

fn tasks_for_route(
    route: &ResolvedRoute,
    assets: &AssetMap,
    pages: &PageModuleMap,
    out_dir: &Path,
    tasks: &mut Vec<Task>,
) {
    let Some(outputs) = assets.get(&route.pattern) else {
        debug!(route = %route.pattern, "No emitted files for route");
        return;
    };

    let modules: Vec<PathBuf> = pages
        .get(&route.entrypoint)
        .iter()
        .map(PathBuf::from)
        .collect();

    for output in outputs {
        let output_path = if output.is_absolute() {
            output.clone()
        } else {
            out_dir.join(output)
        };
        tasks.push(Task {
            output_path,
            dependency_modules: modules.clone(),
        });
    }
}

/// Create one task per emitted file of every resolved route.
///
/// Dynamic index routes are planned after the others with the same lookup.
/// Routes whose entrypoint was never recorded get an empty dependency list;
/// routes without emitted files produce no task.
#[must_use]
pub fn plan_tasks(
    routes: &[ResolvedRoute],
    assets: &AssetMap,
    pages: &PageModuleMap,
    out_dir: &Path,
) -> Vec<Task> {
    let (dynamic_index, regular): (Vec<&ResolvedRoute>, Vec<&ResolvedRoute>) =
        routes.iter().partition(|route| route.is_dynamic_index());

    let mut tasks = Vec::new();
    for route in regular {
        tasks_for_route(route, assets, pages, out_dir, &mut tasks);
    }
    for route in dynamic_index {
        tasks_for_route(route, assets, pages, out_dir, &mut tasks);
    }
    tasks
}
