//! Page entry recording and closure expansion.

use crate::{ModuleFilter, ModuleInfoSource, PageModuleMap, collect_reachable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Module-parsed notification from the host bundler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedModule {
    /// Absolute module id.
    pub id: String,
    /// Statically imported module ids.
    #[serde(default)]
    pub imported_ids: Vec<String>,
    /// Dynamically imported module ids.
    #[serde(default)]
    pub dynamically_imported_ids: Vec<String>,
    /// Whether the bundler flagged this module as the root of a page.
    #[serde(default)]
    pub is_page_entry: bool,
}

/// Builds the page to module-set mapping for one build.
///
/// Pages are recorded from module-parsed events in bundler emission order,
/// then expanded once the full graph is available.
#[derive(Debug, Clone)]
pub struct ModuleGraphCollector {
    filter: ModuleFilter,
    pages: PageModuleMap,
}

impl ModuleGraphCollector {
    /// Create a collector for a project root.
    #[must_use]
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            filter: ModuleFilter::new(project_root),
            pages: PageModuleMap::new(),
        }
    }

    /// The filter applied to every import.
    #[must_use]
    pub fn filter(&self) -> &ModuleFilter {
        &self.filter
    }

    /// Handle a module-parsed event; non-page modules are ignored.
    ///
    /// Returns the page key when the module was recorded.
    pub fn on_module_parsed(&mut self, module: &ParsedModule) -> Option<String> {
        module
            .is_page_entry
            .then(|| self.record_page_entry(&module.id, &module.imported_ids))
    }

    /// Record a page entry module and its direct imports.
    ///
    /// The stored list is the filtered, query-stripped imports followed by
    /// the entry module itself. Returns the page key.
    pub fn record_page_entry(&mut self, module_id: &str, direct_imports: &[String]) -> String {
        let key = self.filter.page_key(module_id);
        let mut modules = self
            .filter
            .clean(direct_imports.iter().map(String::as_str));
        modules.push(module_id.to_string());

        debug!(page = %key, modules = modules.len(), "Recorded page entry");
        self.pages.insert(key.clone(), modules);
        key
    }

    /// Expand one page's module list to its transitive closure.
    ///
    /// Unknown page keys are ignored.
    pub fn expand_transitive_closure<S>(&mut self, page_key: &str, graph: &S)
    where
        S: ModuleInfoSource + ?Sized,
    {
        if !self.pages.contains(page_key) {
            return;
        }

        let seeds = self.pages.get(page_key).to_vec();
        let mut visited = HashSet::new();
        let mut modules = seeds.clone();
        for seed in &seeds {
            collect_reachable(graph, &self.filter, seed, &mut visited, &mut modules);
        }

        self.pages.insert(page_key, modules);
        debug!(
            page = %page_key,
            modules = self.pages.get(page_key).len(),
            "Expanded page module closure"
        );
    }

    /// Expand every recorded page.
    pub fn expand_all<S>(&mut self, graph: &S)
    where
        S: ModuleInfoSource + ?Sized,
    {
        let keys: Vec<String> = self.pages.keys().map(String::from).collect();
        for key in keys {
            self.expand_transitive_closure(&key, graph);
        }
    }

    /// The page map collected so far.
    #[must_use]
    pub fn pages(&self) -> &PageModuleMap {
        &self.pages
    }
}
