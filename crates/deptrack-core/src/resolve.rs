use std::collections::HashMap;

use crate::analyzer::{LanguageAnalyzer, ParsedFile, ResolutionContext};
use crate::graph::DependencyGraph;
use crate::types::{DependencyKind, ResolveStatus};

/// Distinct declared versions per dependency name, used for conflict
/// detection across files.
#[derive(Debug, Default)]
pub struct VersionIndex {
    versions: HashMap<String, Vec<String>>,
}

impl VersionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from every versioned edge currently in the graph.
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let mut index = Self::new();
        for edge in graph.edges() {
            if let Some(version) = &edge.version_constraint {
                index.record(&edge.to, version);
            }
        }
        index
    }

    pub fn record(&mut self, name: &str, version: &str) {
        let versions = self.versions.entry(name.to_string()).or_default();
        if !versions.iter().any(|v| v == version) {
            versions.push(version.to_string());
        }
    }

    /// True when more than one distinct version has been declared for `name`.
    pub fn has_conflict(&self, name: &str) -> bool {
        self.versions.get(name).is_some_and(|v| v.len() > 1)
    }

    /// Every version seen for `name`, in first-declared order.
    pub fn versions_of(&self, name: &str) -> &[String] {
        self.versions.get(name).map_or(&[], |v| v.as_slice())
    }
}

/// Classify the freshly parsed dependencies of one file through the owning
/// analyzer. Failures become per-dependency statuses, never call-level
/// errors.
pub fn classify_file(
    parsed: &mut ParsedFile,
    analyzer: &dyn LanguageAnalyzer,
    graph: &DependencyGraph,
) {
    let mut versions = VersionIndex::from_graph(graph);
    for dep in &parsed.dependencies {
        if let Some(version) = &dep.version {
            versions.record(&dep.name, version);
        }
    }
    let ctx = ResolutionContext {
        graph,
        versions: &versions,
    };
    for dep in &mut parsed.dependencies {
        dep.status = analyzer.classify_dependency(dep, &ctx);
    }
}

/// Re-derive every edge's resolution against the complete graph.
///
/// Runs after a directory scan (and before output generation) so final edge
/// statuses do not depend on the order workers finished in: version conflicts
/// are computed from the full index, dangling internal targets become
/// `NotFound`, and edges whose target node exists become `Resolved`.
/// Advisory `Circular` and `Error` classifications from analyzers are kept.
pub fn finalize(graph: &DependencyGraph) {
    let versions = VersionIndex::from_graph(graph);
    for edge in graph.edges() {
        let status = if versions.has_conflict(&edge.to) {
            ResolveStatus::VersionConflict
        } else if matches!(edge.resolution, ResolveStatus::Circular | ResolveStatus::Error) {
            edge.resolution
        } else if graph.contains_node(&edge.to) {
            ResolveStatus::Resolved
        } else if edge.kind == DependencyKind::Internal {
            ResolveStatus::NotFound
        } else {
            // A declared-only external reference; nothing to resolve against.
            ResolveStatus::Resolved
        };
        graph.set_edge_resolution(&edge.from, &edge.to, edge.kind, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode};
    use crate::types::NodeKind;
    use serde_json::Value;
    use std::path::PathBuf;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Library,
            path: PathBuf::from(format!("{id}.kt")),
            dependencies: vec![],
            metadata: Value::Null,
        }
    }

    fn edge(from: &str, to: &str, kind: DependencyKind, version: Option<&str>) -> GraphEdge {
        GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            version_constraint: version.map(str::to_string),
            resolution: ResolveStatus::Pending,
            metadata: Value::Null,
        }
    }

    #[test]
    fn test_version_index_conflicts() {
        let mut index = VersionIndex::new();
        index.record("pkg", "1.0.0");
        index.record("pkg", "1.0.0");
        assert!(!index.has_conflict("pkg"));
        assert_eq!(index.versions_of("pkg"), ["1.0.0"]);

        index.record("pkg", "2.0.0");
        assert!(index.has_conflict("pkg"));
        assert_eq!(index.versions_of("pkg"), ["1.0.0", "2.0.0"]);
        assert!(!index.has_conflict("other"));
    }

    #[test]
    fn test_finalize_resolves_present_targets() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));
        graph.add_edge(edge("a", "b", DependencyKind::Internal, None));

        finalize(&graph);
        assert_eq!(graph.edges()[0].resolution, ResolveStatus::Resolved);
    }

    #[test]
    fn test_finalize_marks_dangling_internal_not_found() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a"));
        graph.add_edge(edge("a", "missing", DependencyKind::Internal, None));
        graph.add_edge(edge("a", "left-pad", DependencyKind::External, None));

        finalize(&graph);
        let edges = graph.edges();
        assert_eq!(edges[0].resolution, ResolveStatus::NotFound);
        assert_eq!(edges[1].resolution, ResolveStatus::Resolved);
    }

    #[test]
    fn test_finalize_detects_version_conflicts() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));
        graph.add_edge(edge("a", "shared", DependencyKind::External, Some("1.0")));
        graph.add_edge(edge("b", "shared", DependencyKind::External, Some("2.0")));

        finalize(&graph);
        for e in graph.edges() {
            assert_eq!(e.resolution, ResolveStatus::VersionConflict);
        }
    }

    #[test]
    fn test_finalize_preserves_advisory_statuses() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));
        let mut hinted = edge("a", "b", DependencyKind::Internal, None);
        hinted.resolution = ResolveStatus::Circular;
        graph.add_edge(hinted);

        finalize(&graph);
        assert_eq!(graph.edges()[0].resolution, ResolveStatus::Circular);
    }

    #[test]
    fn test_finalize_is_order_independent() {
        let build = |reversed: bool| {
            let graph = DependencyGraph::new();
            let mut ids = vec!["a", "b", "c"];
            if reversed {
                ids.reverse();
            }
            for id in ids {
                graph.add_node(node(id));
            }
            graph.add_edge(edge("a", "b", DependencyKind::Internal, None));
            graph.add_edge(edge("b", "ghost", DependencyKind::Internal, None));
            finalize(&graph);
            let mut statuses: Vec<_> = graph
                .edges()
                .into_iter()
                .map(|e| (e.from, e.to, e.resolution.to_string()))
                .collect();
            statuses.sort();
            statuses
        };

        assert_eq!(build(false), build(true));
    }
}
