//! InputSet - the immutable resolved input graph.
//!
//! Once created, an InputSet is read-only. Only `berth update` (or a manifest
//! change) creates a new one.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};

use crate::core::locator::Locator;
use crate::sources::Snapshot;

/// Node id of the project itself.
pub const ROOT_NODE: &str = "root";

/// How a node refers to one of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEdge {
    /// A fetched node
    Node(String),
    /// An alias: input names walked from the root
    Follows(Vec<String>),
}

/// A node in the input graph.
#[derive(Debug, Clone)]
pub struct InputNode {
    /// Unique node id
    pub id: String,

    /// Input names walked from the root to reach this node
    pub path: Vec<String>,

    /// Locator as declared (None for the root)
    pub original: Option<Locator>,

    /// Locator pinned to the fetched revision (None for the root)
    pub locked: Option<Locator>,

    /// Fetched content (None for the root)
    pub snapshot: Option<Snapshot>,

    /// Edges to this node's own inputs
    pub inputs: BTreeMap<String, InputEdge>,
}

impl InputNode {
    pub(crate) fn root() -> Self {
        InputNode {
            id: ROOT_NODE.to_string(),
            path: Vec::new(),
            original: None,
            locked: None,
            snapshot: None,
            inputs: BTreeMap::new(),
        }
    }
}

/// The resolved input graph.
///
/// Follows edges are kept as written (for the lockfile) and also canonicalized
/// into graph edges, so every name maps to exactly one fetched node.
#[derive(Debug, Clone)]
pub struct InputSet {
    /// Nodes by id
    nodes: BTreeMap<String, InputNode>,

    /// Canonical edges (follows already collapsed), weighted by input name
    graph: DiGraph<String, String>,

    /// Map from node id to graph index
    id_to_index: HashMap<String, NodeIndex>,
}

impl InputSet {
    /// Build the set from resolved nodes and their canonical edges.
    ///
    /// `canonical` holds `(from, input name, to)` triples with follows collapsed.
    pub(crate) fn new(
        nodes: BTreeMap<String, InputNode>,
        canonical: Vec<(String, String, String)>,
    ) -> Self {
        let mut graph = DiGraph::new();
        let mut id_to_index = HashMap::new();
        for id in nodes.keys() {
            id_to_index.insert(id.clone(), graph.add_node(id.clone()));
        }
        for (from, name, to) in canonical {
            if let (Some(&a), Some(&b)) = (id_to_index.get(&from), id_to_index.get(&to)) {
                graph.add_edge(a, b, name);
            }
        }

        InputSet {
            nodes,
            graph,
            id_to_index,
        }
    }

    /// Get the root node.
    pub fn root(&self) -> &InputNode {
        &self.nodes[ROOT_NODE]
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&InputNode> {
        self.nodes.get(id)
    }

    /// Iterate over all nodes, sorted by id.
    pub fn nodes(&self) -> impl Iterator<Item = &InputNode> {
        self.nodes.values()
    }

    /// Number of fetched snapshots (the root is not fetched).
    pub fn snapshot_count(&self) -> usize {
        self.nodes.values().filter(|n| n.snapshot.is_some()).count()
    }

    /// The node an input name of `from` canonically points at.
    pub fn target(&self, from: &str, name: &str) -> Option<&InputNode> {
        let index = *self.id_to_index.get(from)?;
        self.graph
            .edges(index)
            .find(|edge| edge.weight() == name)
            .and_then(|edge| self.nodes.get(&self.graph[edge.target()]))
    }

    /// Walk a `/`-separated input path from the root.
    pub fn lookup(&self, path: &str) -> Option<&InputNode> {
        let mut current = self.root();
        for segment in path.split('/') {
            current = self.target(&current.id, segment)?;
        }
        Some(current)
    }

    /// Snapshot of a top-level input.
    pub fn snapshot(&self, input: &str) -> Option<&Snapshot> {
        self.target(ROOT_NODE, input)?.snapshot.as_ref()
    }

    /// Canonical inputs of a node, sorted by name.
    pub fn children(&self, id: &str) -> Vec<(&str, &InputNode)> {
        let Some(&index) = self.id_to_index.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<_> = self
            .graph
            .edges(index)
            .filter_map(|edge| {
                let node = self.nodes.get(&self.graph[edge.target()])?;
                Some((edge.weight().as_str(), node))
            })
            .collect();
        children.sort_by(|a, b| a.0.cmp(b.0));
        children
    }

    /// Nodes not reachable from the root.
    pub fn unreachable(&self) -> Vec<&str> {
        let start = self.id_to_index[ROOT_NODE];
        let mut dfs = Dfs::new(&self.graph, start);
        let mut seen = std::collections::HashSet::new();
        while let Some(index) = dfs.next(&self.graph) {
            seen.insert(index);
        }
        self.graph
            .node_indices()
            .filter(|i| !seen.contains(i))
            .map(|i| self.graph[i].as_str())
            .collect()
    }
}
