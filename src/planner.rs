//! Implicit topology inference and wave ordering.
//!
//! Grounded on `weavegraph::graphs::iteration::topological_sort` (Kahn's algorithm with a
//! deterministic tie-break over ready nodes). Two responsibilities live here, matching
//! `SPEC_FULL.md` §4.G/§4.H:
//!
//! 1. [`plan_implicit_graph`] builds an entire flow from a bare node registry by matching each
//!    node's input field-name *set* against every other node's output field-name *set* — used
//!    only when a [`crate::graph::Graph`] is run without a single explicit
//!    [`crate::graph::Graph::call`]. Nodes with no exact match become roots wired to fresh
//!    per-field graph inputs.
//! 2. [`build_waves`] runs Kahn's algorithm over a fully-bound flow's edges to produce an
//!    execution order grouped into ready waves, exactly like the teacher's
//!    `GraphBuilder::topological_sort` groups nodes with no remaining unresolved predecessor.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::graphio::{GraphIo, InputBinding};
use crate::handle::OutputHandle;
use crate::node::Node;
use crate::record::FieldSpec;
use crate::types::GraphIoId;

fn field_set(fields: &[FieldSpec]) -> FxHashSet<&str> {
    fields.iter().map(|f| f.name.as_str()).collect()
}

/// Builds a full flow from a bare node registry by matching field-name sets
/// (`SPEC_FULL.md` §4.G). Returns the constructed flow, the fresh graph inputs it had to
/// synthesize for root nodes (in the order they were created), and the composed output handle
/// for every node that is never itself a producer (the graph's leaves).
///
/// `config.strict_ambiguous_topology` governs what happens when a consumer's input set matches
/// more than one producer's output set exactly: strict (the default) rejects the graph with
/// `ExecutorError::AmbiguousTopology`; lenient picks the alphabetically-first candidate (ties
/// are otherwise unresolvable without caller guidance) and logs the discarded candidates via
/// `tracing::warn!` instead of failing construction.
pub fn plan_implicit_graph(
    nodes: &FxHashMap<String, Arc<Node>>,
    config: &ExecutorConfig,
) -> Result<(IndexMap<GraphIoId, GraphIo>, Vec<(String, GraphIoId)>, OutputHandle), ExecutorError> {
    let mut node_names: Vec<&String> = nodes.keys().collect();
    node_names.sort();

    // node name -> sole producer node name whose output set matches its input set exactly.
    let mut producer_of: FxHashMap<&str, &str> = FxHashMap::default();
    for consumer in &node_names {
        let consumer_node = &nodes[*consumer];
        if consumer_node.input_schema.is_empty() {
            continue;
        }
        let consumer_inputs = field_set(&consumer_node.input_schema);
        let mut candidates: Vec<&str> = Vec::new();
        for producer in &node_names {
            if producer == consumer {
                continue;
            }
            let producer_node = &nodes[*producer];
            if field_set(&producer_node.output_schema) == consumer_inputs {
                candidates.push(producer.as_str());
            }
        }
        if candidates.len() > 1 {
            if config.strict_ambiguous_topology {
                return Err(ExecutorError::AmbiguousTopology {
                    consumer: (*consumer).clone(),
                    candidates: candidates.into_iter().map(str::to_string).collect(),
                });
            }
            candidates.sort_unstable();
            tracing::warn!(
                consumer = %consumer,
                chosen = candidates[0],
                discarded = ?&candidates[1..],
                "ambiguous topology resolved leniently"
            );
        }
        if let Some(producer) = candidates.into_iter().next() {
            producer_of.insert(consumer.as_str(), producer);
        }
    }

    // Topologically extend from roots (nodes with no matched producer) outward, in
    // `node_names` order so construction is deterministic.
    let mut graph_ios: IndexMap<GraphIoId, GraphIo> = IndexMap::new();
    let mut ids_by_name: FxHashMap<&str, GraphIoId> = FxHashMap::default();
    let mut graph_inputs: Vec<(String, GraphIoId)> = Vec::new();

    fn materialize<'a>(
        name: &'a str,
        nodes: &'a FxHashMap<String, Arc<Node>>,
        producer_of: &FxHashMap<&'a str, &'a str>,
        graph_ios: &mut IndexMap<GraphIoId, GraphIo>,
        ids_by_name: &mut FxHashMap<&'a str, GraphIoId>,
        graph_inputs: &mut Vec<(String, GraphIoId)>,
        in_progress: &mut FxHashSet<&'a str>,
    ) -> Result<GraphIoId, ExecutorError> {
        if let Some(id) = ids_by_name.get(name) {
            return Ok(id.clone());
        }
        if !in_progress.insert(name) {
            return Err(ExecutorError::StuckGraph {
                remaining: vec![name.to_string()],
            });
        }

        let node = Arc::clone(&nodes[name]);
        let mut inputs: FxHashMap<String, InputBinding> = FxHashMap::default();

        if let Some(producer_name) = producer_of.get(name) {
            let producer_id = materialize(
                producer_name,
                nodes,
                producer_of,
                graph_ios,
                ids_by_name,
                graph_inputs,
                in_progress,
            )?;
            let producer_fields = nodes[*producer_name].output_schema.clone();
            for field in &producer_fields {
                inputs.insert(field.name.clone(), InputBinding::Edge(producer_id.clone(), field.name.clone()));
            }
        } else {
            for field in &node.input_schema {
                let input_id = GraphIoId::for_input(&field.name);
                let synthetic = Arc::new(Node::new_sync(
                    crate::node::NodeSpec::new(format!("input:{}", field.name))
                        .output(field.clone()),
                    |_| Ok(vec![crate::types::Value::Unset]),
                ));
                let mut io = GraphIo::new(synthetic, FxHashMap::default());
                io.id = input_id.clone();
                graph_ios.insert(input_id.clone(), io);
                graph_inputs.push((field.name.clone(), input_id.clone()));
                inputs.insert(field.name.clone(), InputBinding::Edge(input_id, field.name.clone()));
            }
        }

        let io = GraphIo::new(node, inputs);
        let id = io.id.clone();
        graph_ios.insert(id.clone(), io);
        ids_by_name.insert(name, id.clone());
        in_progress.remove(name);
        Ok(id)
    }

    for name in &node_names {
        let mut in_progress = FxHashSet::default();
        materialize(
            name,
            nodes,
            &producer_of,
            &mut graph_ios,
            &mut ids_by_name,
            &mut graph_inputs,
            &mut in_progress,
        )?;
    }

    // Leaves: nodes that never appear as anyone's producer.
    let produced: FxHashSet<&str> = producer_of.values().copied().collect();
    let mut outputs = OutputHandle::new();
    for name in &node_names {
        if produced.contains(name.as_str()) {
            continue;
        }
        let id = ids_by_name[name.as_str()].clone();
        let fields: Vec<String> = nodes[*name].output_schema.iter().map(|f| f.name.clone()).collect();
        outputs += OutputHandle::single(id, &fields);
    }

    Ok((graph_ios, graph_inputs, outputs))
}

/// Groups every [`GraphIo`] into ready waves: wave 0 depends on nothing, wave N depends only on
/// waves `< N`. Ties within a wave are broken by registration order, mirroring the teacher's
/// deterministic topological sort.
///
/// Returns [`ExecutorError::StuckGraph`] listing every node that never became ready — either a
/// true cycle, or a field that matched no producer and was never resolved.
pub fn build_waves(
    graph_ios: &IndexMap<GraphIoId, GraphIo>,
    aggregators: &IndexMap<crate::types::AggregatorId, crate::aggregator::Aggregator>,
) -> Result<Vec<Vec<GraphIoId>>, ExecutorError> {
    let registration_order: Vec<GraphIoId> = graph_ios.keys().cloned().collect();

    let mut predecessors: FxHashMap<GraphIoId, FxHashSet<GraphIoId>> = FxHashMap::default();
    for id in &registration_order {
        predecessors.insert(id.clone(), FxHashSet::default());
    }
    for (id, io) in graph_ios {
        for binding in io.inputs.values() {
            match binding {
                InputBinding::Edge(producer, _) => {
                    predecessors.get_mut(id).unwrap().insert(producer.clone());
                }
                InputBinding::AggregatorRef(agg_id) => {
                    if let Some(agg) = aggregators.get(agg_id) {
                        for (_, field_ref) in &agg.inputs {
                            predecessors.get_mut(id).unwrap().insert(field_ref.graphio_id.clone());
                        }
                    }
                }
                InputBinding::Constant(_) => {}
            }
        }
    }

    let mut waves = Vec::new();
    let mut done: FxHashSet<GraphIoId> = FxHashSet::default();

    loop {
        let ready: Vec<GraphIoId> = registration_order
            .iter()
            .filter(|id| !done.contains(*id))
            .filter(|id| predecessors[*id].iter().all(|p| done.contains(p)))
            .filter(|id| graph_ios[*id].missing_fields().is_empty())
            .cloned()
            .collect();

        if ready.is_empty() {
            break;
        }
        for id in &ready {
            done.insert(id.clone());
        }
        waves.push(ready);
    }

    if done.len() != registration_order.len() {
        let remaining: Vec<String> = registration_order
            .iter()
            .filter(|id| !done.contains(*id))
            .map(|id| {
                let io = &graph_ios[id];
                let missing = io.missing_fields();
                if missing.is_empty() {
                    io.node.name.clone()
                } else {
                    format!("{} (missing: {})", io.node.name, missing.join(", "))
                }
            })
            .collect();
        return Err(ExecutorError::StuckGraph { remaining });
    }

    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;
    use crate::record::FieldSpec;

    fn noop_node(name: &str, inputs: &[&str], outputs: &[&str]) -> Arc<Node> {
        let mut spec = NodeSpec::new(name);
        for i in inputs {
            spec = spec.input(FieldSpec::new(*i, "any"));
        }
        for o in outputs {
            spec = spec.output(FieldSpec::new(*o, "any"));
        }
        Arc::new(Node::new_sync(spec, |_| Ok(vec![])))
    }

    #[test]
    fn plans_linear_chain_from_registry() {
        let mut nodes = FxHashMap::default();
        nodes.insert("producer".to_string(), noop_node("producer", &[], &["x"]));
        nodes.insert("consumer".to_string(), noop_node("consumer", &["x"], &["y"]));

        let (flow, graph_inputs, outputs) =
            plan_implicit_graph(&nodes, &ExecutorConfig::default()).unwrap();
        assert!(graph_inputs.is_empty());
        assert_eq!(flow.len(), 2);
        assert!(outputs.field("y").is_some());
        assert!(outputs.field("x").is_none());
    }

    #[test]
    fn root_node_gets_fresh_graph_inputs() {
        let mut nodes = FxHashMap::default();
        nodes.insert("lonely".to_string(), noop_node("lonely", &["m"], &["n"]));

        let (flow, graph_inputs, outputs) =
            plan_implicit_graph(&nodes, &ExecutorConfig::default()).unwrap();
        assert_eq!(graph_inputs.len(), 1);
        assert_eq!(graph_inputs[0].0, "m");
        assert_eq!(flow.len(), 2); // the synthetic input plus the node itself
        assert!(outputs.field("n").is_some());
    }

    #[test]
    fn ambiguous_exact_set_match_errors() {
        let mut nodes = FxHashMap::default();
        nodes.insert("p1".to_string(), noop_node("p1", &[], &["x"]));
        nodes.insert("p2".to_string(), noop_node("p2", &[], &["x"]));
        nodes.insert("consumer".to_string(), noop_node("consumer", &["x"], &[]));

        let err = plan_implicit_graph(&nodes, &ExecutorConfig::default()).unwrap_err();
        assert!(matches!(err, ExecutorError::AmbiguousTopology { .. }));
    }

    #[test]
    fn lenient_config_resolves_ambiguity_to_alphabetically_first_candidate() {
        let mut nodes = FxHashMap::default();
        nodes.insert("p1".to_string(), noop_node("p1", &[], &["x"]));
        nodes.insert("p2".to_string(), noop_node("p2", &[], &["x"]));
        nodes.insert("consumer".to_string(), noop_node("consumer", &["x"], &["y"]));

        let config = ExecutorConfig {
            strict_ambiguous_topology: false,
            ..ExecutorConfig::default()
        };
        let (flow, _, outputs) = plan_implicit_graph(&nodes, &config).unwrap();
        assert_eq!(flow.len(), 3);
        assert!(outputs.field("y").is_some());
    }

    #[test]
    fn build_waves_orders_producer_before_consumer() {
        let producer = noop_node("producer", &[], &["x"]);
        let consumer = noop_node("consumer", &["x"], &[]);
        let mut ios = IndexMap::new();
        let p_io = GraphIo::new(producer, FxHashMap::default());
        let p_id = p_io.id.clone();
        let mut c_io = GraphIo::new(consumer, FxHashMap::default());
        c_io.inputs.insert("x".to_string(), InputBinding::Edge(p_id.clone(), "x".to_string()));
        let c_id = c_io.id.clone();
        ios.insert(p_id.clone(), p_io);
        ios.insert(c_id.clone(), c_io);

        let empty_aggs = IndexMap::new();
        let waves = build_waves(&ios, &empty_aggs).unwrap();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0], vec![p_id]);
        assert_eq!(waves[1], vec![c_id]);
    }

    #[test]
    fn unresolvable_input_is_stuck() {
        let consumer = noop_node("consumer", &["missing"], &[]);
        let mut ios = IndexMap::new();
        let c_io = GraphIo::new(consumer, FxHashMap::default());
        ios.insert(c_io.id.clone(), c_io);

        let empty_aggs = IndexMap::new();
        let err = build_waves(&ios, &empty_aggs).unwrap_err();
        assert!(matches!(err, ExecutorError::StuckGraph { .. }));
    }
}
