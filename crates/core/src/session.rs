//! Per-build state driven by host lifecycle hooks.

use crate::engine::{PurgeEngine, SelectorExtractor, extractor_for};
use crate::executor::{BuildReport, TaskExecutor};
use crate::options::{BuildConfig, PurgeOptions};
use crate::planner::{AssetMap, PurgeContext, ResolvedRoute, plan_tasks};
use crate::rewrite::{OutputRewriter, truncate_bundles};
use crate::{Error, Result};
use async_trait::async_trait;
use sitepurge_cache::PurgeCache;
use sitepurge_graph::{ModuleGraphCollector, ModuleInfoSource, PageModuleMap, ParsedModule};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Final build notification.
#[derive(Debug, Clone, Default)]
pub struct BuildDone {
    /// Directory the build was written to.
    pub out_dir: PathBuf,
    /// Route pattern to emitted files.
    pub assets: AssetMap,
}

/// Lifecycle notifications a static-site host delivers, in order.
#[async_trait]
pub trait BuildHooks: Send {
    /// The host configuration is final.
    fn on_config_resolved(&mut self, config: BuildConfig);

    /// The bundler parsed a module. Called in emission order.
    fn on_module_parsed(&mut self, module: &ParsedModule);

    /// Bundling finished; the full module graph can be queried.
    fn on_bundle_ready(&mut self, graph: &dyn ModuleInfoSource);

    /// Routes were resolved.
    fn on_routes_resolved(&mut self, routes: Vec<ResolvedRoute>);

    /// Output is on disk; purge and rewrite it.
    async fn on_build_done(&mut self, done: BuildDone) -> Result<BuildReport>;
}

/// The purge pipeline for one build.
///
/// Owns the page map for the duration of the build; nothing outlives it
/// except files on disk and the cache.
pub struct BuildSession {
    project_root: PathBuf,
    options: PurgeOptions,
    engine: Arc<dyn PurgeEngine>,
    extractor: Option<Arc<dyn SelectorExtractor>>,
    config: Option<BuildConfig>,
    collector: ModuleGraphCollector,
    routes: Vec<ResolvedRoute>,
}

impl BuildSession {
    /// Session for a project rooted at `project_root`.
    #[must_use]
    pub fn new(
        project_root: impl Into<PathBuf>,
        options: PurgeOptions,
        engine: Arc<dyn PurgeEngine>,
    ) -> Self {
        let project_root = project_root.into();
        Self {
            collector: ModuleGraphCollector::new(&project_root),
            project_root,
            options,
            engine,
            extractor: None,
            config: None,
            routes: Vec::new(),
        }
    }

    /// Use `extractor` instead of the configured one.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn SelectorExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Root module ids are resolved against.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Pages recorded so far.
    #[must_use]
    pub fn pages(&self) -> &PageModuleMap {
        self.collector.pages()
    }

    fn cache(&self) -> PurgeCache {
        match &self.options.cache_dir {
            Some(dir) if dir.is_absolute() => PurgeCache::new(dir),
            Some(dir) => PurgeCache::new(self.project_root.join(dir)),
            None => PurgeCache::for_project(&self.project_root),
        }
    }

    fn context(&self, css_files: Vec<PathBuf>) -> Result<PurgeContext> {
        let extractor = match &self.extractor {
            Some(extractor) => Arc::clone(extractor),
            None => extractor_for(self.options.extractor.as_deref())?,
        };
        Ok(PurgeContext {
            css_files,
            content_files: self.options.resolve_content_files(&self.project_root)?,
            inline_content: self.options.inline_content().cloned().collect(),
            extractor,
            engine_options: self.options.engine_options.clone(),
        })
    }
}

/// Stylesheet bundles under `<out_dir>/<assets_dir>`, sorted.
pub fn discover_bundles(out_dir: &Path, assets_dir: &str) -> Result<Vec<PathBuf>> {
    let pattern = out_dir.join(assets_dir).join("**").join("*.css");
    let pattern = pattern.to_str().ok_or_else(|| {
        Error::configuration(format!(
            "Output directory contains invalid UTF-8: {}",
            out_dir.display()
        ))
    })?;
    let mut bundles: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| Error::configuration(format!("Invalid assets directory '{assets_dir}': {e}")))?
        .flatten()
        .filter(|path| path.is_file())
        .collect();
    bundles.sort();
    Ok(bundles)
}

#[async_trait]
impl BuildHooks for BuildSession {
    fn on_config_resolved(&mut self, config: BuildConfig) {
        if let Some(root) = &config.project_root
            && *root != self.project_root
        {
            self.project_root.clone_from(root);
            self.collector = ModuleGraphCollector::new(root);
        }
        self.config = Some(config);
    }

    fn on_module_parsed(&mut self, module: &ParsedModule) {
        self.collector.on_module_parsed(module);
    }

    fn on_bundle_ready(&mut self, graph: &dyn ModuleInfoSource) {
        self.collector.expand_all(graph);
    }

    fn on_routes_resolved(&mut self, routes: Vec<ResolvedRoute>) {
        self.routes = routes;
    }

    async fn on_build_done(&mut self, done: BuildDone) -> Result<BuildReport> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| Error::lifecycle("Build finished before the configuration was resolved"))?;

        if !config.output.is_static() {
            warn!(output = ?config.output, "Output mode isn't static, skipped");
            return Ok(BuildReport::skipped());
        }

        let bundles = discover_bundles(&done.out_dir, &config.assets_dir)?;
        let context = self.context(bundles.clone())?;

        let cache = self.cache();
        cache.ensure_dir();

        let tasks = plan_tasks(&self.routes, &done.assets, self.collector.pages(), &done.out_dir);
        let executor = TaskExecutor::new(
            Arc::clone(&self.engine),
            OutputRewriter::new(cache),
            context,
        );

        let mut report = BuildReport {
            skipped: false,
            outcomes: executor.run(tasks).await,
            truncated: Vec::new(),
        };

        if report.is_success() {
            report.truncated = truncate_bundles(&bundles, &report.written_files()).await;
        } else {
            warn!(
                failed = report.failed(),
                "Some pages failed to purge, keeping original bundles"
            );
        }

        info!(
            pages = report.outcomes.len(),
            cache_hits = report.cache_hits(),
            purged = report.purged(),
            failed = report.failed(),
            truncated = report.truncated.len(),
            "Purge finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PurgeRequest, PurgeResult};
    use crate::options::OutputMode;
    use tempfile::TempDir;

    struct UnusedEngine;

    #[async_trait]
    impl PurgeEngine for UnusedEngine {
        async fn purge(&self, _request: &PurgeRequest) -> Result<Vec<PurgeResult>> {
            Err(Error::engine("engine should not be called"))
        }
    }

    fn session(root: &Path) -> BuildSession {
        BuildSession::new(root, PurgeOptions::default(), Arc::new(UnusedEngine))
    }

    #[tokio::test]
    async fn test_build_done_without_config_is_lifecycle_error() {
        let temp = TempDir::new().unwrap();
        let mut session = session(temp.path());
        let result = session.on_build_done(BuildDone::default()).await;
        assert!(matches!(result, Err(Error::Lifecycle { .. })));
    }

    #[tokio::test]
    async fn test_server_output_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut session = session(temp.path());
        session.on_config_resolved(
            BuildConfig::new(temp.path().join("dist")).with_output(OutputMode::Server),
        );
        let report = session
            .on_build_done(BuildDone {
                out_dir: temp.path().join("dist"),
                assets: AssetMap::new(),
            })
            .await
            .unwrap();
        assert!(report.skipped);
        assert!(!temp.path().join("node_modules").exists());
    }

    #[test]
    fn test_config_root_replaces_session_root() {
        let mut session = session(Path::new("/old"));
        session.on_config_resolved(BuildConfig::new("/site/dist").with_project_root("/site"));
        assert_eq!(session.project_root(), Path::new("/site"));

        session.on_module_parsed(&ParsedModule {
            id: "/site/src/pages/index.astro".to_string(),
            is_page_entry: true,
            ..ParsedModule::default()
        });
        assert!(session.pages().contains("src/pages/index.astro"));
    }

    #[test]
    fn test_relative_cache_dir_resolves_against_root() {
        let session = BuildSession::new(
            "/site",
            PurgeOptions::default().with_cache_dir(".purge"),
            Arc::new(UnusedEngine),
        );
        assert_eq!(session.cache().dir(), Path::new("/site/.purge"));
    }

    #[test]
    fn test_discover_bundles_recurses_and_sorts() {
        let temp = TempDir::new().unwrap();
        let assets = temp.path().join("_astro");
        std::fs::create_dir_all(assets.join("nested")).unwrap();
        std::fs::write(assets.join("b.css"), "").unwrap();
        std::fs::write(assets.join("nested/a.css"), "").unwrap();
        std::fs::write(assets.join("c.js"), "").unwrap();

        let bundles = discover_bundles(temp.path(), "_astro").unwrap();
        assert_eq!(bundles, vec![assets.join("b.css"), assets.join("nested/a.css")]);
    }
}
