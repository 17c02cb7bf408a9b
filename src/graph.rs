//! The graph: a registry of nodes, their resolved wiring, and the entry points used to build
//! and run it.
//!
//! Grounded on `weavegraph::graphs::builder::GraphBuilder` (a fluent accumulator of nodes and
//! edges that eventually compiles into something runnable) and `weavegraph::app::App::invoke`
//! (the single async entry point that drives a compiled graph to completion). `Graph::call`
//! is the explicit registry dispatch this corpus's own design notes point to as the idiomatic
//! stand-in for attribute-style dynamic dispatch.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::instrument;

use crate::aggregator::Aggregator;
use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::graphio::{GraphIo, Input, InputBinding};
use crate::handle::{FieldRef, OutputHandle};
use crate::node::{Node, NodeSpec};
use crate::planner::{build_waves, plan_implicit_graph};
use crate::record::{FieldSpec, Record};
use crate::scheduler::run_waves;
use crate::types::Value;

/// The values supplied to [`Graph::run`] for the graph's declared [`Graph::input`] fields.
#[derive(Clone, Debug)]
pub enum RunInput {
    /// Bound to the declared inputs in the order they were declared.
    Positional(Vec<Value>),
    /// Bound to the declared inputs by name (every input sharing a name receives the same
    /// value — each missing field synthesized by [`Graph::call`] keeps its own identity but not
    /// necessarily a unique name).
    Keyword(FxHashMap<String, Value>),
}

impl RunInput {
    fn value_for(&self, index: usize, name: &str) -> Option<Value> {
        match self {
            RunInput::Positional(values) => values.get(index).cloned(),
            RunInput::Keyword(map) => map.get(name).cloned(),
        }
    }
}

/// A dataflow graph: a node registry plus the wiring (explicit, and — only when the graph was
/// never wired with [`Graph::call`] at all — implicit) between their invocations.
pub struct Graph {
    nodes: FxHashMap<String, Arc<Node>>,
    flow: IndexMap<crate::types::GraphIoId, GraphIo>,
    aggregators: IndexMap<crate::types::AggregatorId, Aggregator>,
    graph_inputs: Vec<(String, crate::types::GraphIoId)>,
    outputs: Option<OutputHandle>,
    config: ExecutorConfig,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            nodes: FxHashMap::default(),
            flow: IndexMap::new(),
            aggregators: IndexMap::new(),
            graph_inputs: Vec::new(),
            outputs: None,
            config: ExecutorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a node that runs inline on the calling thread.
    pub fn add_node_sync(
        &mut self,
        spec: NodeSpec,
        f: impl Fn(FxHashMap<String, Value>) -> Result<Vec<Value>, ExecutorError> + Send + Sync + 'static,
    ) -> &mut Self {
        let name = spec.name.clone();
        self.nodes.insert(name, Arc::new(Node::new_sync(spec, f)));
        self
    }

    /// Registers a node dispatched concurrently with the rest of its wave.
    pub fn add_node_async<F, Fut>(&mut self, spec: NodeSpec, f: F) -> &mut Self
    where
        F: Fn(FxHashMap<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Vec<Value>, ExecutorError>> + Send + 'static,
    {
        let name = spec.name.clone();
        self.nodes.insert(name, Arc::new(Node::new_async(spec, f)));
        self
    }

    /// Declares a graph-level input field, returning a reference a node can be wired to just
    /// like any other producer's output field.
    pub fn input(&mut self, name: impl Into<String>, type_name: impl Into<String>) -> FieldRef {
        let name = name.into();
        let field = FieldSpec::new(name.clone(), type_name);
        let synthetic = Arc::new(Node::new_sync(
            NodeSpec::new(format!("input:{name}")).output(field),
            |_| Ok(vec![Value::Unset]),
        ));
        let io = GraphIo::new(synthetic, FxHashMap::default());
        let id = io.id.clone();
        self.flow.insert(id.clone(), io);
        self.graph_inputs.push((name.clone(), id.clone()));
        FieldRef::new(id, name)
    }

    /// Starts a new fan-in aggregator. Assemble it with `+=` and pass it as a keyword argument
    /// to [`Graph::call`].
    pub fn aggregator(&self, result_name: impl Into<String>) -> Aggregator {
        Aggregator::new(result_name)
    }

    /// Declares what the graph as a whole produces.
    pub fn set_outputs(&mut self, outputs: OutputHandle) {
        self.outputs = Some(outputs);
    }

    /// Invokes the registered node `name`, wiring `positional` and `keyword` arguments onto its
    /// declared input schema, and returns a handle to its (not yet computed) output fields.
    ///
    /// A positional [`OutputHandle`] binds field-by-field against as many consecutive input
    /// slots as it has fields (§4.E); a keyword `OutputHandle` binds only its first field.
    /// Positional constants and aggregators are rejected — both need an explicit field name to
    /// attach to. Any input field left unbound after all arguments are applied is silently
    /// wired to a fresh, single-use [`Graph::input`] (§4.E step 5), so every node built through
    /// `call` always leaves the flow fully bound.
    pub fn call(
        &mut self,
        name: &str,
        positional: Vec<Input>,
        keyword: Vec<(String, Input)>,
    ) -> Result<OutputHandle, ExecutorError> {
        let node = self
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutorError::UnknownField {
                record: "<graph>".to_string(),
                field: name.to_string(),
            })?;

        let mut inputs: FxHashMap<String, InputBinding> = FxHashMap::default();
        let mut cursor = 0usize;

        for arg in positional {
            match arg {
                Input::Field(field_ref) => {
                    let field_name = schema_field_at(&node, name, cursor);
                    inputs.insert(field_name, InputBinding::Edge(field_ref.graphio_id, field_ref.field));
                    cursor += 1;
                }
                Input::Handle(handle) => {
                    for (_, field_ref) in handle.iter() {
                        let field_name = schema_field_at(&node, name, cursor);
                        inputs.insert(
                            field_name,
                            InputBinding::Edge(field_ref.graphio_id.clone(), field_ref.field.clone()),
                        );
                        cursor += 1;
                    }
                }
                Input::Const(_) | Input::Agg(_) => {
                    return Err(ExecutorError::UnsupportedPositionalConstant {
                        node: name.to_string(),
                        position: cursor,
                    });
                }
            }
        }

        for (field_name, arg) in keyword {
            let binding = match arg {
                Input::Const(v) => {
                    let expects_aggregator = node
                        .input_schema
                        .iter()
                        .any(|f| f.name == field_name && f.type_name == "list");
                    if expects_aggregator {
                        return Err(ExecutorError::BadAggregatorInput { slot: field_name });
                    }
                    InputBinding::Constant(v)
                }
                Input::Field(field_ref) => InputBinding::Edge(field_ref.graphio_id, field_ref.field),
                Input::Handle(handle) => {
                    let (_, first) = handle
                        .iter()
                        .next()
                        .unwrap_or_else(|| panic!("node '{name}' received an empty OutputHandle for '{field_name}'"));
                    InputBinding::Edge(first.graphio_id.clone(), first.field.clone())
                }
                Input::Agg(agg) => {
                    let agg_id = agg.id.clone();
                    self.aggregators.insert(agg_id.clone(), agg);
                    InputBinding::AggregatorRef(agg_id)
                }
            };
            if inputs.insert(field_name.clone(), binding).is_some() {
                return Err(ExecutorError::DoubleWrite {
                    record: name.to_string(),
                    field: field_name,
                });
            }
        }

        let missing: Vec<String> = node
            .input_schema
            .iter()
            .map(|f| f.name.clone())
            .filter(|field_name| !inputs.contains_key(field_name))
            .collect();
        for field_name in missing {
            let field_ref = self.input(field_name.clone(), "any");
            inputs.insert(field_name, InputBinding::Edge(field_ref.graphio_id, field_ref.field));
        }

        let io = GraphIo::new(node, inputs);
        let id = io.id.clone();
        let output_fields: Vec<String> = io.node.output_schema.iter().map(|f| f.name.clone()).collect();
        self.flow.insert(id.clone(), io);
        Ok(OutputHandle::single(id, &output_fields))
    }

    /// Computes the wave plan without running any node, returning the number of waves. Useful
    /// to check a graph compiles (no [`ExecutorError::StuckGraph`] or
    /// [`ExecutorError::AmbiguousTopology`]) before running it with real inputs.
    pub fn validate(&self) -> Result<usize, ExecutorError> {
        if self.flow.is_empty() {
            let (flow, _, _) = plan_implicit_graph(&self.nodes, &self.config)?;
            let empty_aggs = IndexMap::new();
            return Ok(build_waves(&flow, &empty_aggs)?.len());
        }
        Ok(build_waves(&self.flow, &self.aggregators)?.len())
    }

    /// Producer -> consumers edge map derived from each invocation's resolved `Edge` bindings.
    /// Feeds the optional [`crate::petgraph_compat`] conversion.
    #[cfg(feature = "petgraph-compat")]
    pub(crate) fn edge_map(&self) -> FxHashMap<crate::types::GraphIoId, Vec<crate::types::GraphIoId>> {
        let flow_ref;
        let owned;
        if self.flow.is_empty() {
            owned = plan_implicit_graph(&self.nodes, &self.config)
                .map(|(flow, _, _)| flow)
                .unwrap_or_default();
            flow_ref = &owned;
        } else {
            flow_ref = &self.flow;
        }

        let mut edges: FxHashMap<crate::types::GraphIoId, Vec<crate::types::GraphIoId>> =
            FxHashMap::default();
        for (consumer, io) in flow_ref {
            edges.entry(consumer.clone()).or_default();
            for binding in io.inputs.values() {
                if let InputBinding::Edge(producer, _) = binding {
                    edges.entry(producer.clone()).or_default().push(consumer.clone());
                }
            }
        }
        edges
    }

    /// Runs the graph end to end. If [`Graph::call`] was never used (`flow` is empty), the
    /// implicit planner builds the whole flow from the registered nodes first (§4.G) — after
    /// that, `flow` stays populated, so a second `run` plans nothing and reuses the same wiring
    /// (idempotent planning). Each run seeds the declared inputs fresh, dispatches ready waves
    /// until nothing remains, and assembles the declared outputs.
    #[instrument(skip(self, input), fields(nodes = self.nodes.len()))]
    pub async fn run(&mut self, input: RunInput) -> Result<Record, ExecutorError> {
        if self.flow.is_empty() {
            let (flow, graph_inputs, outputs) = plan_implicit_graph(&self.nodes, &self.config)?;
            self.flow = flow;
            self.graph_inputs = graph_inputs;
            self.outputs = Some(outputs);
        }

        for io in self.flow.values_mut() {
            io.output.reset();
        }

        for (index, (field_name, id)) in self.graph_inputs.clone().into_iter().enumerate() {
            if let Some(value) = input.value_for(index, &field_name) {
                self.flow
                    .get_mut(&id)
                    .expect("graph_inputs id always present in flow")
                    .output
                    .set(&field_name, value)?;
            }
        }

        let waves = build_waves(&self.flow, &self.aggregators)?;
        run_waves(&mut self.flow, &self.aggregators, &waves, &self.config).await?;

        let outputs = self
            .outputs
            .as_ref()
            .expect("Graph::run called before Graph::set_outputs");
        let schema: Vec<FieldSpec> = outputs
            .field_names()
            .map(|name| FieldSpec::new(name, "any"))
            .collect();
        let mut result = Record::new("graph_output", &schema);
        for (name, field_ref) in outputs.iter() {
            let value = self.flow[&field_ref.graphio_id].output.get(&field_ref.field);
            result.set(name, value)?;
        }
        Ok(result)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

fn schema_field_at(node: &Node, caller: &str, position: usize) -> String {
    node.input_schema
        .get(position)
        .map(|f| f.name.clone())
        .unwrap_or_else(|| {
            panic!(
                "node '{caller}' received more positional arguments than its input schema declares ({} fields)",
                node.input_schema.len()
            )
        })
}
