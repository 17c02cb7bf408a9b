//! Error taxonomy for graph construction and execution.
//!
//! Mirrors the shape of `weavegraph::node::NodeError` / `weavegraph::runtimes::runner::RunnerError`:
//! a single `thiserror` enum with `miette::Diagnostic` codes and help text, so construction-time
//! mistakes and execution-time failures both surface through the same `Result` type.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building or running a [`crate::graph::Graph`].
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutorError {
    /// A record was read or written on a field outside its declared schema.
    #[error("unknown field '{field}' on record '{record}'")]
    #[diagnostic(
        code(flowloom::unknown_field),
        help("check that '{field}' is listed in {record}'s input/output schema")
    )]
    UnknownField { record: String, field: String },

    /// A field already holds a set value that conflicts with a new write.
    #[error("double write to field '{field}' on record '{record}'")]
    #[diagnostic(
        code(flowloom::double_write),
        help("two producers disagree on '{field}'; only one node may set a given output field")
    )]
    DoubleWrite { record: String, field: String },

    /// A graph input has neither a bound producer nor a default value at run time.
    #[error("input field '{field}' is unbound")]
    #[diagnostic(
        code(flowloom::unbound_input),
        help("pass a value for '{field}' to Graph::run, or give it a default")
    )]
    UnboundInput { field: String },

    /// The ready-wave loop stopped with nodes that never became ready.
    #[error("graph is stuck: {} node(s) never became ready: {}", remaining.len(), remaining.join(", "))]
    #[diagnostic(
        code(flowloom::stuck_graph),
        help("check for a missing edge, an unresolved constant, or an actual cycle")
    )]
    StuckGraph { remaining: Vec<String> },

    /// The implicit planner found more than one producer whose outputs match a consumer's inputs.
    #[error("ambiguous topology: '{consumer}' matches {} candidate producers", candidates.len())]
    #[diagnostic(
        code(flowloom::ambiguous_topology),
        help("wire '{consumer}' explicitly via Graph::call instead of relying on implicit planning")
    )]
    AmbiguousTopology {
        consumer: String,
        candidates: Vec<String>,
    },

    /// A raw constant was passed as a keyword argument to a call slot whose declared input
    /// type is `"list"` — the shape an aggregator reference resolves to — so the graph could
    /// never recover a producer to resolve there.
    #[error("aggregator slot '{slot}' did not receive a field reference")]
    #[diagnostic(code(flowloom::bad_aggregator_input))]
    BadAggregatorInput { slot: String },

    /// A raw constant (or aggregator) was passed positionally to `Graph::call`.
    #[error("node '{node}' received an unsupported constant at positional argument {position}")]
    #[diagnostic(
        code(flowloom::unsupported_positional_constant),
        help("pass constants as keyword arguments instead")
    )]
    UnsupportedPositionalConstant { node: String, position: usize },

    /// A node closure returned an error, or the scheduler could not shape its result onto
    /// the node's output schema.
    #[error("node '{node}' failed: {source}")]
    #[diagnostic(code(flowloom::node_failure))]
    NodeFailure {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ExecutorError {
    pub(crate) fn node_failure(
        node: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ExecutorError::NodeFailure {
            node: node.into(),
            source: Box::new(source),
        }
    }
}
