use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{DependencyKind, NodeKind, ResolveStatus};

/// A graph-visible unit: one analyzed module, service, or config artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Globally unique id; inserting a duplicate merges into the existing node.
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// The file this node originated from.
    pub path: PathBuf,
    /// Ordered, de-duplicated ids of the nodes this one points to.
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
}

/// A directed, typed relation between two node ids.
///
/// Edges reference ids by value: the target may be absent from the graph (a
/// dangling edge), which represents an unresolved dependency rather than a
/// structural error. Identity is the `(from, to, kind)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: DependencyKind,
    pub version_constraint: Option<String>,
    pub resolution: ResolveStatus,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Default)]
struct GraphInner {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    edge_index: HashMap<(String, String, DependencyKind), usize>,
}

/// The canonical dependency structure shared by all workers.
///
/// One lock guards every operation, point lookups included, so no caller can
/// observe an index that disagrees with its collection mid-mutation.
#[derive(Default)]
pub struct DependencyGraph {
    inner: Mutex<GraphInner>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, GraphInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a node, or merge it into the existing node with the same id:
    /// scalar fields take the new value, dependency ids are unioned in
    /// first-seen order, and non-null metadata replaces the old payload.
    pub fn add_node(&self, node: GraphNode) {
        let mut inner = self.locked();
        match inner.node_index.get(&node.id).copied() {
            Some(idx) => {
                let existing = &mut inner.nodes[idx];
                existing.name = node.name;
                existing.kind = node.kind;
                existing.path = node.path;
                for dep in node.dependencies {
                    if !existing.dependencies.contains(&dep) {
                        existing.dependencies.push(dep);
                    }
                }
                if !node.metadata.is_null() {
                    existing.metadata = node.metadata;
                }
            }
            None => {
                let idx = inner.nodes.len();
                inner.node_index.insert(node.id.clone(), idx);
                inner.nodes.push(node);
            }
        }
    }

    /// Insert an edge, or overwrite the edge with the same `(from, to, kind)`
    /// triple (last write wins). Endpoints are not validated; dangling edges
    /// are surfaced later as unresolved dependencies. When the `from` node
    /// exists, its dependency-id set is kept in sync.
    pub fn add_edge(&self, edge: GraphEdge) {
        let mut inner = self.locked();
        if let Some(idx) = inner.node_index.get(&edge.from).copied() {
            let node = &mut inner.nodes[idx];
            if !node.dependencies.contains(&edge.to) {
                node.dependencies.push(edge.to.clone());
            }
        }
        let key = (edge.from.clone(), edge.to.clone(), edge.kind);
        match inner.edge_index.get(&key).copied() {
            Some(idx) => inner.edges[idx] = edge,
            None => {
                let idx = inner.edges.len();
                inner.edge_index.insert(key, idx);
                inner.edges.push(edge);
            }
        }
    }

    pub fn find_node(&self, id: &str) -> Option<GraphNode> {
        let inner = self.locked();
        inner.node_index.get(id).map(|&idx| inner.nodes[idx].clone())
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.locked().node_index.contains_key(id)
    }

    /// Update the stored resolution of one edge. No-op when the edge is absent.
    pub fn set_edge_resolution(
        &self,
        from: &str,
        to: &str,
        kind: DependencyKind,
        resolution: ResolveStatus,
    ) {
        let mut inner = self.locked();
        let key = (from.to_string(), to.to_string(), kind);
        if let Some(idx) = inner.edge_index.get(&key).copied() {
            inner.edges[idx].resolution = resolution;
        }
    }

    pub fn node_count(&self) -> usize {
        self.locked().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.locked().edges.len()
    }

    /// Snapshot of all nodes in insertion order.
    pub fn nodes(&self) -> Vec<GraphNode> {
        self.locked().nodes.clone()
    }

    /// Snapshot of all edges in insertion order.
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.locked().edges.clone()
    }

    pub fn clear(&self) {
        let mut inner = self.locked();
        inner.nodes.clear();
        inner.node_index.clear();
        inner.edges.clear();
        inner.edge_index.clear();
    }

    pub fn has_cycles(&self) -> bool {
        !self.detect_cycles().is_empty()
    }

    /// Find all directed cycles in the edge relation.
    ///
    /// Three-state depth-first search: nodes are visited in insertion order
    /// and adjacency follows edge insertion order, so the reported set is
    /// reproducible for a fixed build sequence. Every node is used as an
    /// entry point, disconnected components included. Edges into nodes absent
    /// from the graph are ignored — a dangling endpoint cannot lie on a
    /// cycle. Each back edge reports one cycle: the in-progress path from the
    /// revisited node to the current one. A self-edge is a one-node cycle.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let inner = self.locked();

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); inner.nodes.len()];
        for edge in &inner.edges {
            if let (Some(&from), Some(&to)) = (
                inner.node_index.get(&edge.from),
                inner.node_index.get(&edge.to),
            ) {
                adjacency[from].push(to);
            }
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Finished,
        }

        let mut marks = vec![Mark::Unvisited; inner.nodes.len()];
        let mut cycles = Vec::new();

        for start in 0..inner.nodes.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            marks[start] = Mark::InProgress;
            // Explicit stack of (node, next outgoing edge to try); `path`
            // mirrors the chain of in-progress nodes.
            let mut stack = vec![(start, 0usize)];
            let mut path = vec![start];

            loop {
                let Some(frame) = stack.last_mut() else {
                    break;
                };
                let node = frame.0;
                if frame.1 < adjacency[node].len() {
                    let target = adjacency[node][frame.1];
                    frame.1 += 1;
                    match marks[target] {
                        Mark::Unvisited => {
                            marks[target] = Mark::InProgress;
                            path.push(target);
                            stack.push((target, 0));
                        }
                        Mark::InProgress => {
                            // Back edge: the suffix of the path starting at
                            // `target` is a cycle.
                            if let Some(pos) = path.iter().position(|&n| n == target) {
                                cycles.push(
                                    path[pos..]
                                        .iter()
                                        .map(|&n| inner.nodes[n].id.clone())
                                        .collect(),
                                );
                            }
                        }
                        Mark::Finished => {}
                    }
                } else {
                    marks[node] = Mark::Finished;
                    path.pop();
                    stack.pop();
                }
            }
        }

        cycles
    }
}
