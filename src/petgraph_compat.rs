//! Optional petgraph compatibility layer.
//!
//! Converts a [`Graph`]'s resolved wiring into a `petgraph::DiGraph`, enabling petgraph's
//! algorithm library for analysis and DOT export. Grounded on
//! `weavegraph::graphs::petgraph_compat`, adapted from its `NodeKind` node weights to this
//! crate's [`GraphIoId`] invocation identities.
//!
//! # Feature Gate
//!
//! ```toml
//! [dependencies]
//! flowloom = { version = "0.1", features = ["petgraph-compat"] }
//! ```

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::graph::Graph;
use crate::types::GraphIoId;

/// A petgraph-compatible directed graph representation of a flowloom graph.
pub type FlowDiGraph = DiGraph<GraphIoId, ()>;

/// Mapping from [`GraphIoId`] to petgraph `NodeIndex`.
pub type NodeIndexMap = FxHashMap<GraphIoId, NodeIndex>;

/// Result of converting a [`Graph`] to petgraph format.
#[derive(Debug, Clone)]
pub struct PetgraphConversion {
    pub graph: FlowDiGraph,
    pub index_map: NodeIndexMap,
}

impl PetgraphConversion {
    #[must_use]
    pub fn index_of(&self, id: &GraphIoId) -> Option<NodeIndex> {
        self.index_map.get(id).copied()
    }

    #[must_use]
    pub fn node_at(&self, index: NodeIndex) -> Option<&GraphIoId> {
        self.graph.node_weight(index)
    }
}

fn convert(edges: &FxHashMap<GraphIoId, Vec<GraphIoId>>) -> PetgraphConversion {
    let mut graph = DiGraph::new();
    let mut index_map: NodeIndexMap = FxHashMap::default();

    let mut all_nodes: Vec<GraphIoId> = edges.keys().cloned().collect();
    all_nodes.sort();

    for id in &all_nodes {
        let idx = graph.add_node(id.clone());
        index_map.insert(id.clone(), idx);
    }

    for (from, tos) in edges {
        let from_idx = index_map[from];
        for to in tos {
            let to_idx = index_map[to];
            graph.add_edge(from_idx, to_idx, ());
        }
    }

    PetgraphConversion { graph, index_map }
}

/// Converts `graph`'s resolved wiring into a petgraph `DiGraph`.
#[must_use]
pub fn to_petgraph(graph: &Graph) -> PetgraphConversion {
    convert(&graph.edge_map())
}

/// Exports `graph`'s resolved wiring as DOT, renderable with Graphviz.
#[must_use]
pub fn to_dot(graph: &Graph) -> String {
    use std::fmt::Write;

    let conversion = to_petgraph(graph);
    let mut output = String::new();

    writeln!(output, "digraph {{").unwrap();
    writeln!(output, "    rankdir=LR;").unwrap();
    writeln!(output, "    node [shape=box, style=rounded];").unwrap();

    for idx in conversion.graph.node_indices() {
        let id = conversion.graph.node_weight(idx).unwrap();
        writeln!(output, "    {} [ label=\"{}\" ];", idx.index(), id).unwrap();
    }

    writeln!(output).unwrap();

    for edge in conversion.graph.edge_indices() {
        let (from, to) = conversion.graph.edge_endpoints(edge).unwrap();
        writeln!(output, "    {} -> {};", from.index(), to.index()).unwrap();
    }

    writeln!(output, "}}").unwrap();
    output
}

/// Cross-check cycle detection using petgraph's own algorithm.
#[must_use]
pub fn is_cyclic(graph: &Graph) -> bool {
    let conversion = to_petgraph(graph);
    petgraph::algo::is_cyclic_directed(&conversion.graph)
}
