//! Graph arena using petgraph::StableDiGraph keyed by string node names

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::HashMap;

/// Index of a node in a [`CodeGraph`]. Valid for the lifetime of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of an edge in a [`CodeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// A directed graph whose nodes are addressed by a unique string key.
///
/// Nodes and edges live in an index arena, so cycles need no shared ownership.
pub struct CodeGraph<N, E> {
    inner: StableDiGraph<(String, N), E>,
    index: HashMap<String, NodeIndex>,
}

impl<N, E> std::fmt::Debug for CodeGraph<N, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl<N, E> CodeGraph<N, E> {
    pub fn new() -> Self {
        CodeGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Add a node under `key`. Returns the existing id if the key is taken.
    pub fn add_node(&mut self, key: impl Into<String>, node: N) -> NodeId {
        let key = key.into();
        if let Some(idx) = self.index.get(&key) {
            return NodeId(idx.index());
        }
        let idx = self.inner.add_node((key.clone(), node));
        self.index.insert(key, idx);
        NodeId(idx.index())
    }

    /// Add an edge between two existing nodes.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, edge: E) -> EdgeId {
        let idx = self
            .inner
            .add_edge(NodeIndex::new(source.0), NodeIndex::new(target.0), edge);
        EdgeId(idx.index())
    }

    /// Find a node by key.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).map(|idx| NodeId(idx.index()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&N> {
        self.inner.node_weight(NodeIndex::new(id.0)).map(|(_, n)| n)
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.inner
            .node_weight_mut(NodeIndex::new(id.0))
            .map(|(_, n)| n)
    }

    /// Key of a node.
    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.inner
            .node_weight(NodeIndex::new(id.0))
            .map(|(k, _)| k.as_str())
    }

    /// Get an edge by ID.
    pub fn edge(&self, id: EdgeId) -> Option<&E> {
        self.inner.edge_weight(EdgeIndex::new(id.0))
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Upper bound of node indices, for sizing per-node side tables.
    pub fn node_bound(&self) -> usize {
        self.inner.node_indices().map(|i| i.index() + 1).max().unwrap_or(0)
    }

    /// All node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.node_indices().map(|idx| NodeId(idx.index()))
    }

    /// All node ids ordered by key.
    pub fn sorted_node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.node_ids().collect();
        ids.sort_by(|a, b| self.key(*a).cmp(&self.key(*b)));
        ids
    }

    /// Iterate over all nodes with their keys.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &str, &N)> {
        self.inner.node_indices().filter_map(move |idx| {
            self.inner
                .node_weight(idx)
                .map(|(k, n)| (NodeId(idx.index()), k.as_str(), n))
        })
    }

    /// Iterate over all edges as (source, target, weight).
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &E)> {
        self.inner.edge_references().map(|e| {
            (
                NodeId(e.source().index()),
                NodeId(e.target().index()),
                e.weight(),
            )
        })
    }

    /// Outgoing neighbours, ordered by key and deduplicated.
    pub fn successors(&self, source: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .inner
            .neighbors_directed(NodeIndex::new(source.0), Direction::Outgoing)
            .map(|idx| NodeId(idx.index()))
            .collect();
        out.sort_by(|a, b| self.key(*a).cmp(&self.key(*b)));
        out.dedup();
        out
    }
}

impl<N, E> Default for CodeGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}
