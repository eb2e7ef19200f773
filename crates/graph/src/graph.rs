//! In-memory module graph using petgraph.
//!
//! Hosts that do not keep their own module graph around after bundling can
//! replay module-parsed events into a [`ModuleGraph`] and hand it to the
//! collector as its [`ModuleInfoSource`].

use crate::{ModuleInfo, ModuleInfoSource};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportKind {
    /// `import x from "..."`
    Static,
    /// `import("...")`
    Dynamic,
}

#[derive(Debug, Clone)]
struct ModuleNode {
    id: String,
    /// Set once the module's own imports were reported, not just referenced.
    parsed: bool,
}

#[derive(Debug, Clone, Copy)]
struct ImportEdge {
    kind: ImportKind,
    /// Position in the importer's import list.
    order: usize,
}

/// Directed module graph, edges point from importer to imported module.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    graph: DiGraph<ModuleNode, ImportEdge>,
    id_to_node: HashMap<String, NodeIndex>,
}

impl ModuleGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(&node) = self.id_to_node.get(id) {
            return node;
        }
        let node = self.graph.add_node(ModuleNode {
            id: id.to_string(),
            parsed: false,
        });
        self.id_to_node.insert(id.to_string(), node);
        node
    }

    /// Record a parsed module and its imports.
    ///
    /// Reporting the same module again replaces its previous imports.
    pub fn add_module(&mut self, id: &str, imported: &[&str], dynamic: &[&str]) {
        let node = self.node(id);

        while let Some(edge) = self.graph.first_edge(node, Direction::Outgoing) {
            self.graph.remove_edge(edge);
        }

        let edges = imported
            .iter()
            .map(|target| (ImportKind::Static, target))
            .chain(dynamic.iter().map(|target| (ImportKind::Dynamic, target)));
        for (order, (kind, target)) in edges.enumerate() {
            let target = self.node(target);
            self.graph.add_edge(node, target, ImportEdge { kind, order });
        }
        self.graph[node].parsed = true;
        trace!(module = id, imports = imported.len(), dynamic = dynamic.len(), "Added module");
    }

    /// Number of known module ids, parsed or only referenced.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl ModuleInfoSource for ModuleGraph {
    fn module_info(&self, id: &str) -> Option<ModuleInfo> {
        let &node = self.id_to_node.get(id)?;
        if !self.graph[node].parsed {
            return None;
        }

        let mut edges: Vec<_> = self.graph.edges(node).collect();
        edges.sort_by_key(|edge| edge.weight().order);

        let mut info = ModuleInfo::default();
        for edge in edges {
            let target = self.graph[edge.target()].id.clone();
            match edge.weight().kind {
                ImportKind::Static => info.imported_ids.push(target),
                ImportKind::Dynamic => info.dynamically_imported_ids.push(target),
            }
        }
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_info_preserves_import_order() {
        let mut graph = ModuleGraph::new();
        graph.add_module("/p/a.ts", &["/p/b.ts", "/p/c.ts"], &["/p/d.ts"]);

        let info = graph.module_info("/p/a.ts").unwrap();
        assert_eq!(info.imported_ids, vec!["/p/b.ts", "/p/c.ts"]);
        assert_eq!(info.dynamically_imported_ids, vec!["/p/d.ts"]);
    }

    #[test]
    fn test_referenced_only_module_has_no_info() {
        let mut graph = ModuleGraph::new();
        graph.add_module("/p/a.ts", &["/p/b.ts"], &[]);

        assert!(graph.module_info("/p/b.ts").is_none());
        assert_eq!(graph.module_count(), 2);
    }

    #[test]
    fn test_readding_module_replaces_imports() {
        let mut graph = ModuleGraph::new();
        graph.add_module("/p/a.ts", &["/p/b.ts"], &[]);
        graph.add_module("/p/a.ts", &["/p/c.ts"], &[]);

        let info = graph.module_info("/p/a.ts").unwrap();
        assert_eq!(info.imported_ids, vec!["/p/c.ts"]);
    }
}
