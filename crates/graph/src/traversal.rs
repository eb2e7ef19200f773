//! Reachability over the module graph.

use crate::{ModuleFilter, ModuleInfoSource, strip_query};
use std::collections::HashSet;

/// Walk every module reachable from `start` through static and dynamic imports.
///
/// Each import accepted by `filter` is appended to `acc` with its query
/// suffix stripped. Traversal is keyed by raw module id, since the bundler
/// models `Card.astro?astro&type=style` as its own module, and `visited` is
/// checked before any module is expanded, so import cycles terminate.
///
/// `visited` may be shared across several starts of the same page to avoid
/// walking common subgraphs twice.
pub fn collect_reachable<S>(
    source: &S,
    filter: &ModuleFilter,
    start: &str,
    visited: &mut HashSet<String>,
    acc: &mut Vec<String>,
) where
    S: ModuleInfoSource + ?Sized,
{
    let mut to_process = vec![start.to_string()];

    while let Some(current) = to_process.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }

        let Some(info) = source.module_info(&current) else {
            continue;
        };

        for import in info.all_imports() {
            if !filter.accepts(import) {
                continue;
            }
            acc.push(strip_query(import).to_string());
            if !visited.contains(import) {
                to_process.push(import.to_string());
            }
        }
    }
}
