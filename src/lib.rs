//! # Flowloom: a concurrent dataflow graph executor
//!
//! Flowloom wires plain closures into a directed graph by declared input/output field names
//! and runs the result wave by wave, dispatching each wave's async nodes concurrently.
//!
//! ## Core Concepts
//!
//! - **Records**: flat, schema-declared field containers with an explicit "unset" state
//! - **Nodes**: sync or async closures, registered once with an explicit input/output schema
//! - **Graph**: an accumulator of node invocations (`Graph::call`), wired by field references
//! - **Planner**: fills in any input left unwired by matching it against the other nodes'
//!   declared outputs
//! - **Scheduler**: groups invocations into ready waves and runs each wave to completion
//!   before starting the next
//!
//! ## Quick Start
//!
//! ```
//! use flowloom::{
//!     graph::{Graph, RunInput},
//!     node::NodeSpec,
//!     record::FieldSpec,
//!     types::Value,
//! };
//! use serde_json::json;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let mut graph = Graph::new();
//! let n = graph.input("n", "int");
//!
//! graph.add_node_sync(
//!     NodeSpec::new("increment")
//!         .input(FieldSpec::new("n", "int"))
//!         .output(FieldSpec::new("result", "int")),
//!     |kwargs| {
//!         let n = kwargs.get("n").unwrap().as_json().unwrap().as_i64().unwrap();
//!         Ok(vec![Value::Json(json!(n + 1))])
//!     },
//! );
//! let out = graph.call("increment", vec![n.into()], vec![]).unwrap();
//! graph.set_outputs(out);
//!
//! let result = graph.run(RunInput::Positional(vec![Value::Json(json!(41))])).await.unwrap();
//! assert_eq!(result.get("result"), Value::Json(json!(42)));
//! # });
//! ```
//!
//! ## Module Guide
//!
//! - [`types`] — the [`types::Value`] sentinel and id newtypes
//! - [`record`] — [`record::Record`]/[`record::FieldSpec`]
//! - [`node`] — [`node::Node`]/[`node::NodeSpec`]
//! - [`handle`] — [`handle::OutputHandle`]/[`handle::FieldRef`]
//! - [`aggregator`] — [`aggregator::Aggregator`] fan-in
//! - [`graphio`] — one resolved node invocation ([`graphio::GraphIo`]) and call-site [`graphio::Input`]
//! - [`planner`] — implicit wiring and wave ordering
//! - [`scheduler`] — wave dispatch
//! - [`graph`] — [`graph::Graph`], the public entry point
//! - [`config`] — [`config::ExecutorConfig`]
//! - [`error`] — [`error::ExecutorError`]

pub mod aggregator;
pub mod config;
pub mod error;
pub mod graph;
pub mod graphio;
pub mod handle;
pub mod node;
pub mod planner;
pub mod record;
pub mod scheduler;
pub mod types;

#[cfg(feature = "petgraph-compat")]
pub mod petgraph_compat;

pub use error::ExecutorError;
pub use graph::{Graph, RunInput};

/// Installs a `tracing` subscriber reading its filter from `RUST_LOG`, falling back to `info`.
///
/// Mirrors the teacher's own telemetry bootstrap: one call at process start, driven by the
/// environment rather than a config file.
pub fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_error::ErrorLayer::default())
        .try_init();
}
