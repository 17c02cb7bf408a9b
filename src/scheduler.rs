//! Ready-wave execution: run each wave's sync nodes inline, its async nodes concurrently.
//!
//! Grounded on `weavegraph::app::App::apply_barrier`'s superstep loop (compute a wave's worth of
//! `NodePartial`s, then merge them all before starting the next) and
//! `weavegraph::runtimes::execution::StepReport` for the step/outcome shape. Concurrency within
//! an async wave is bounded with `futures_util::stream::StreamExt::buffer_unordered`, the same
//! tool `rotten-risingwave`'s hash-aggregation executor reaches for over its per-group futures
//! rather than a hand-rolled semaphore.

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::instrument;

use crate::aggregator::Aggregator;
use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::graphio::{GraphIo, InputBinding};
use crate::node::NodeKind;
use crate::types::{AggregatorId, GraphIoId, Value};

#[derive(Debug)]
struct OutputArityMismatch {
    node: String,
    expected: usize,
    got: usize,
}

impl fmt::Display for OutputArityMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node '{}' returned {} value(s), expected {} to match its output schema",
            self.node, self.got, self.expected
        )
    }
}

impl std::error::Error for OutputArityMismatch {}

fn gather_kwargs(
    graph_ios: &IndexMap<GraphIoId, GraphIo>,
    aggregators: &IndexMap<AggregatorId, Aggregator>,
    id: &GraphIoId,
) -> Result<FxHashMap<String, Value>, ExecutorError> {
    let io = &graph_ios[id];
    if let Some(missing) = io.missing_fields().into_iter().next() {
        return Err(ExecutorError::UnboundInput { field: missing });
    }

    let mut kwargs = FxHashMap::default();
    for (field_name, binding) in &io.inputs {
        let value = match binding {
            InputBinding::Edge(producer_id, producer_field) => {
                graph_ios[producer_id].output.get(producer_field)
            }
            InputBinding::Constant(v) => v.clone(),
            InputBinding::AggregatorRef(agg_id) => {
                let agg = &aggregators[agg_id];
                let mut values = Vec::with_capacity(agg.inputs.len());
                for (_, field_ref) in &agg.inputs {
                    let v = graph_ios[&field_ref.graphio_id].output.get(&field_ref.field);
                    values.push(v.into_json().unwrap_or(serde_json::Value::Null));
                }
                Value::Json(serde_json::Value::Array(values))
            }
        };
        if value.is_unset() {
            return Err(ExecutorError::UnboundInput {
                field: field_name.clone(),
            });
        }
        kwargs.insert(field_name.clone(), value);
    }
    Ok(kwargs)
}

fn write_output(io: &mut GraphIo, values: Vec<Value>) -> Result<(), ExecutorError> {
    if values.len() != io.node.output_schema.len() {
        return Err(ExecutorError::node_failure(
            io.node.name.clone(),
            OutputArityMismatch {
                node: io.node.name.clone(),
                expected: io.node.output_schema.len(),
                got: values.len(),
            },
        ));
    }
    for (field_spec, value) in io.node.output_schema.clone().iter().zip(values) {
        io.output.set(&field_spec.name, value)?;
    }
    Ok(())
}

/// Runs every wave to completion, writing each node's result onto its [`GraphIo::output`]
/// record before the next wave starts.
#[instrument(skip(graph_ios, aggregators, waves, config))]
pub async fn run_waves(
    graph_ios: &mut IndexMap<GraphIoId, GraphIo>,
    aggregators: &IndexMap<AggregatorId, Aggregator>,
    waves: &[Vec<GraphIoId>],
    config: &ExecutorConfig,
) -> Result<(), ExecutorError> {
    for (wave_index, wave) in waves.iter().enumerate() {
        tracing::debug!(wave = wave_index, size = wave.len(), "dispatching wave");

        // Graph-level inputs are seeded directly by `Graph::run` before waves start; they sit
        // in wave 0 (no predecessors) but must not be re-invoked.
        let already_resolved = |io: &GraphIo| {
            !io.node.output_schema.is_empty()
                && io
                    .node
                    .output_schema
                    .iter()
                    .all(|f| !io.output.get(&f.name).is_unset())
        };

        let (sync_ids, async_ids): (Vec<_>, Vec<_>) = wave
            .iter()
            .filter(|id| !already_resolved(&graph_ios[*id]))
            .cloned()
            .partition(|id| graph_ios[id].node.kind == NodeKind::Sync);

        for id in sync_ids {
            let kwargs = gather_kwargs(graph_ios, aggregators, &id)?;
            let node = Arc::clone(&graph_ios[&id].node);
            let values = node.invoke_sync(kwargs)?;
            write_output(graph_ios.get_mut(&id).expect("id from this wave"), values)?;
        }

        if async_ids.is_empty() {
            continue;
        }

        let mut prepared = Vec::with_capacity(async_ids.len());
        for id in async_ids {
            let kwargs = gather_kwargs(graph_ios, aggregators, &id)?;
            let node = Arc::clone(&graph_ios[&id].node);
            prepared.push((id, node, kwargs));
        }

        let limit = config.max_concurrency.unwrap_or(prepared.len().max(1));
        let results: Vec<(GraphIoId, Result<Vec<Value>, ExecutorError>)> =
            futures_util::stream::iter(prepared.into_iter().map(|(id, node, kwargs)| async move {
                let result = node.invoke_async(kwargs).await;
                (id, result)
            }))
            .buffer_unordered(limit)
            .collect()
            .await;

        for (id, result) in results {
            let values = result?;
            write_output(graph_ios.get_mut(&id).expect("id from this wave"), values)?;
        }
    }

    Ok(())
}
