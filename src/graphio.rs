//! One invocation of a node within a graph: its resolved input bindings and its output record.
//!
//! Grounded on `weavegraph::graphs::builder::GraphBuilder`'s per-node bookkeeping (a node plus
//! its edges), scoped down per `SPEC_FULL.md` §3/§4.C/§4.D to a single struct that owns both the
//! binding side (how each input field is resolved) and the result side (a [`Record`]).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::aggregator::Aggregator;
use crate::handle::{FieldRef, OutputHandle};
use crate::node::Node;
use crate::record::{FieldSpec, Record};
use crate::types::{GraphIoId, Value};

/// How a single input field of a [`GraphIo`] is resolved at run time.
#[derive(Clone, Debug)]
pub enum InputBinding {
    /// Wired to another node's output field.
    Edge(GraphIoId, String),
    /// A fixed value supplied at construction time.
    Constant(Value),
    /// Wired to the ordered collection of fields gathered by an aggregator.
    AggregatorRef(crate::types::AggregatorId),
}

/// The argument a caller passes at a `Graph::call` call site — either something that resolves
/// to one producer (a handle field, a whole handle, a plain constant) or a fan-in aggregator.
#[derive(Clone, Debug)]
pub enum Input {
    Handle(OutputHandle),
    Field(FieldRef),
    Agg(Aggregator),
    Const(Value),
}

impl From<FieldRef> for Input {
    fn from(f: FieldRef) -> Self {
        Input::Field(f)
    }
}

impl From<OutputHandle> for Input {
    fn from(h: OutputHandle) -> Self {
        Input::Handle(h)
    }
}

impl From<Aggregator> for Input {
    fn from(a: Aggregator) -> Self {
        Input::Agg(a)
    }
}

impl From<Value> for Input {
    fn from(v: Value) -> Self {
        Input::Const(v)
    }
}

impl From<serde_json::Value> for Input {
    fn from(v: serde_json::Value) -> Self {
        Input::Const(Value::Json(v))
    }
}

/// One invocation of a [`Node`]: its id, the node it invokes, its resolved input bindings, and
/// the output record that fills in as the scheduler runs it.
pub struct GraphIo {
    pub id: GraphIoId,
    pub node: Arc<Node>,
    pub inputs: FxHashMap<String, InputBinding>,
    pub output: Record,
}

impl std::fmt::Debug for GraphIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphIo")
            .field("id", &self.id)
            .field("node", &self.node.name)
            .field("inputs", &self.inputs)
            .finish()
    }
}

impl GraphIo {
    pub fn new(node: Arc<Node>, inputs: FxHashMap<String, InputBinding>) -> Self {
        let id = GraphIoId::new(&node.name);
        let output_schema: Vec<FieldSpec> = node.output_schema.clone();
        GraphIo {
            id,
            node,
            inputs,
            output: Record::new("output", &output_schema),
        }
    }

    /// Input fields the node declares but which have no binding at all — always an authoring
    /// error if non-empty once the graph is fully wired (`SPEC_FULL.md` §4.C).
    pub fn missing_fields(&self) -> Vec<String> {
        self.node
            .input_schema
            .iter()
            .filter(|f| !self.inputs.contains_key(&f.name))
            .map(|f| f.name.clone())
            .collect()
    }
}
