//! Recorded builds replayed through a [`BuildSession`].
//!
//! A manifest captures what a host reports during one build: the resolved
//! configuration, every parsed module in emission order, the resolved
//! routes and the emitted files per route.

use crate::errors::CliError;
use serde::{Deserialize, Serialize};
use sitepurge_core::{AssetMap, BuildConfig, BuildDone, BuildHooks, BuildReport, ResolvedRoute};
use sitepurge_graph::{ModuleGraph, ParsedModule};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    pub config: BuildConfig,
    #[serde(default)]
    pub modules: Vec<ParsedModule>,
    #[serde(default)]
    pub routes: Vec<ResolvedRoute>,
    #[serde(default)]
    pub assets: BTreeMap<String, Vec<PathBuf>>,
}

impl BuildManifest {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let src = std::fs::read_to_string(path).map_err(|source| CliError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&src)
            .map_err(|e| CliError::manifest_parse(path.to_path_buf(), src.clone(), &e))
    }

    /// Resolve relative directories against `root`.
    #[must_use]
    pub fn rooted(mut self, root: &Path) -> Self {
        if self.config.out_dir.is_relative() {
            self.config.out_dir = root.join(&self.config.out_dir);
        }
        if let Some(project_root) = &self.config.project_root
            && project_root.is_relative()
        {
            self.config.project_root = Some(root.join(project_root));
        }
        self
    }

    /// Module graph as the bundler left it.
    #[must_use]
    pub fn module_graph(&self) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        for module in &self.modules {
            let imported: Vec<&str> = module.imported_ids.iter().map(String::as_str).collect();
            let dynamic: Vec<&str> = module
                .dynamically_imported_ids
                .iter()
                .map(String::as_str)
                .collect();
            graph.add_module(&module.id, &imported, &dynamic);
        }
        graph
    }

    /// Drive `hooks` through the recorded lifecycle.
    pub async fn replay<H: BuildHooks + ?Sized>(
        self,
        hooks: &mut H,
    ) -> sitepurge_core::Result<BuildReport> {
        let graph = self.module_graph();
        ::tracing::debug!(modules = graph.module_count(), "Rebuilt module graph");
        let out_dir = self.config.out_dir.clone();

        hooks.on_config_resolved(self.config);
        for module in &self.modules {
            hooks.on_module_parsed(module);
        }
        hooks.on_bundle_ready(&graph);
        hooks.on_routes_resolved(self.routes);

        let assets: AssetMap = self.assets.into_iter().collect();
        hooks.on_build_done(BuildDone { out_dir, assets }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepurge_graph::ModuleInfoSource;

    const MANIFEST: &str = r#"{
        "config": { "output": "static", "outDir": "dist" },
        "modules": [
            {
                "id": "/site/src/pages/index.astro",
                "importedIds": ["/site/src/components/Card.astro"],
                "isPageEntry": true
            },
            {
                "id": "/site/src/components/Card.astro",
                "dynamicallyImportedIds": ["/site/src/components/Modal.astro"]
            }
        ],
        "routes": [
            { "pattern": "/", "entrypoint": "src/pages/index.astro", "pathname": "/" }
        ],
        "assets": { "/": ["index.html"] }
    }"#;

    #[test]
    fn test_manifest_parses_host_format() {
        let manifest: BuildManifest = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.modules.len(), 2);
        assert!(manifest.modules[0].is_page_entry);
        assert_eq!(manifest.routes[0].entrypoint, "src/pages/index.astro");
        assert_eq!(manifest.assets["/"], vec![PathBuf::from("index.html")]);
    }

    #[test]
    fn test_module_graph_keeps_dynamic_imports() {
        let manifest: BuildManifest = serde_json::from_str(MANIFEST).unwrap();
        let graph = manifest.module_graph();
        let info = graph.module_info("/site/src/components/Card.astro").unwrap();
        assert_eq!(
            info.dynamically_imported_ids,
            vec!["/site/src/components/Modal.astro"]
        );
    }

    #[test]
    fn test_rooted_resolves_out_dir() {
        let manifest: BuildManifest = serde_json::from_str(MANIFEST).unwrap();
        let manifest = manifest.rooted(Path::new("/site"));
        assert_eq!(manifest.config.out_dir, PathBuf::from("/site/dist"));
    }

    #[test]
    fn test_load_reports_parse_location() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("build.json");
        std::fs::write(&path, "{\n  \"config\": \n}").unwrap();
        assert!(matches!(
            BuildManifest::load(&path),
            Err(CliError::ManifestParse { .. })
        ));
    }
}
