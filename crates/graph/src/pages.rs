//! Page to module-set mapping.

use std::collections::{BTreeMap, HashSet};

/// Mapping from page key to the modules that page depends on.
///
/// Keys are project-relative paths of page entry modules; values are module
/// paths with duplicates removed (first occurrence wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageModuleMap {
    pages: BTreeMap<String, Vec<String>>,
}

impl PageModuleMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the module list of a page, deduplicating it.
    pub fn insert(&mut self, page_key: impl Into<String>, modules: Vec<String>) {
        self.pages.insert(page_key.into(), dedup(modules));
    }

    /// Modules for a page; empty when the page was never recorded.
    #[must_use]
    pub fn get(&self, page_key: &str) -> &[String] {
        self.pages.get(page_key).map_or(&[], Vec::as_slice)
    }

    /// Whether a page was recorded.
    #[must_use]
    pub fn contains(&self, page_key: &str) -> bool {
        self.pages.contains_key(page_key)
    }

    /// Recorded page keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Number of recorded pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn dedup(modules: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(modules.len());
    modules
        .into_iter()
        .filter(|module| seen.insert(module.clone()))
        .collect()
}
