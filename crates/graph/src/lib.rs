//! Page dependency closure over a bundler module graph.
//!
//! This crate maps every generated page to the full set of project modules
//! it depends on. Pages are recorded while the bundler parses modules; once
//! the whole graph is known each page list is expanded to its transitive
//! closure over static and dynamic imports.
//!
//! # Key Types
//!
//! - [`ModuleGraphCollector`]: records page entries and expands their closures
//! - [`PageModuleMap`]: page key to deduplicated module list
//! - [`ModuleInfoSource`]: query capability over the finished module graph
//! - [`ModuleGraph`]: in-memory [`ModuleInfoSource`] backed by petgraph
//! - [`ModuleFilter`]: drops image assets and third-party code
//!
//! # Example
//!
//! ```
//! use sitepurge_graph::{ModuleGraph, ModuleGraphCollector};
//!
//! let mut graph = ModuleGraph::new();
//! graph.add_module("/app/src/pages/index.astro", &["/app/src/components/Card.astro"], &[]);
//! graph.add_module("/app/src/components/Card.astro", &["/app/src/components/Icon.astro"], &[]);
//!
//! let mut collector = ModuleGraphCollector::new("/app");
//! let key = collector.record_page_entry(
//!     "/app/src/pages/index.astro",
//!     &["/app/src/components/Card.astro".to_string()],
//! );
//! collector.expand_all(&graph);
//!
//! assert_eq!(key, "src/pages/index.astro");
//! assert_eq!(collector.pages().get(&key).len(), 3);
//! ```

mod collector;
mod filter;
mod graph;
mod pages;
mod traversal;

pub use collector::{ModuleGraphCollector, ParsedModule};
pub use filter::{IMAGE_EXTENSIONS, ModuleFilter, VENDOR_SEGMENT, normalize_path, strip_query};
pub use graph::ModuleGraph;
pub use pages::PageModuleMap;
pub use traversal::collect_reachable;

use std::collections::HashMap;

/// Imports of a single module as reported by the bundler.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    /// Statically imported module ids.
    #[serde(default)]
    pub imported_ids: Vec<String>,
    /// Dynamically imported module ids.
    #[serde(default)]
    pub dynamically_imported_ids: Vec<String>,
}

impl ModuleInfo {
    /// Static then dynamic imports.
    pub fn all_imports(&self) -> impl Iterator<Item = &str> {
        self.imported_ids
            .iter()
            .chain(&self.dynamically_imported_ids)
            .map(String::as_str)
    }
}

/// Query capability over the bundler's finished module graph.
///
/// Implemented by the host after bundling. Returns `None` for ids the
/// bundler knows nothing about.
pub trait ModuleInfoSource {
    /// Look up the imports of a module.
    fn module_info(&self, id: &str) -> Option<ModuleInfo>;
}

impl ModuleInfoSource for HashMap<String, ModuleInfo> {
    fn module_info(&self, id: &str) -> Option<ModuleInfo> {
        self.get(id).cloned()
    }
}

impl<S: ModuleInfoSource + ?Sized> ModuleInfoSource for &S {
    fn module_info(&self, id: &str) -> Option<ModuleInfo> {
        (**self).module_info(id)
    }
}
