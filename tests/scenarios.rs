//! End-to-end scenarios exercising `Graph::call`, implicit planning, fan-in/out, aggregators,
//! and a graph invoked from within another graph's node closure.

use flowloom::graph::{Graph, RunInput};
use flowloom::node::NodeSpec;
use flowloom::record::FieldSpec;
use flowloom::types::Value;
use rustc_hash::FxHashMap;
use serde_json::json;

fn int(v: i64) -> Value {
    Value::Json(json!(v))
}

fn as_i64(kwargs: &FxHashMap<String, Value>, field: &str) -> i64 {
    kwargs.get(field).unwrap().as_json().unwrap().as_i64().unwrap()
}

#[tokio::test]
async fn linear_sync_chain() {
    let mut graph = Graph::new();

    graph.add_node_sync(NodeSpec::new("return_one").output(FieldSpec::new("m", "int")), |_| {
        Ok(vec![int(1)])
    });
    let one = graph.call("return_one", vec![], vec![]).unwrap();

    graph.add_node_sync(
        NodeSpec::new("sub_1")
            .input(FieldSpec::new("m", "int"))
            .output(FieldSpec::new("p", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "m") - 1)]),
    );
    let p = graph.call("sub_1", vec![one.field("m").unwrap().into()], vec![]).unwrap();

    graph.add_node_sync(
        NodeSpec::new("mult_2")
            .input(FieldSpec::new("p", "int"))
            .output(FieldSpec::new("q", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "p") * 2)]),
    );
    let q = graph.call("mult_2", vec![p.field("p").unwrap().into()], vec![]).unwrap();

    graph.set_outputs(q);
    let result = graph.run(RunInput::Keyword(FxHashMap::default())).await.unwrap();
    assert_eq!(result.get("q"), int(0));
}

#[tokio::test]
async fn implicit_planning_resolves_chain_from_bare_registry() {
    let mut graph = Graph::new();

    graph.add_node_sync(
        NodeSpec::new("sub_1")
            .input(FieldSpec::new("m", "int"))
            .output(FieldSpec::new("p", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "m") - 1)]),
    );
    graph.add_node_sync(
        NodeSpec::new("add_1")
            .input(FieldSpec::new("p", "int"))
            .output(FieldSpec::new("n", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "p") + 1)]),
    );
    graph.add_node_sync(
        NodeSpec::new("mult_2")
            .input(FieldSpec::new("n", "int"))
            .output(FieldSpec::new("q", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "n") * 2)]),
    );

    let result = graph.run(RunInput::Positional(vec![int(5)])).await.unwrap();
    assert_eq!(result.get("q"), int(10));
}

#[tokio::test]
async fn fan_in_reverses_order() {
    let mut graph = Graph::new();
    let m = graph.input("m", "int");
    let n = graph.input("n", "int");

    graph.add_node_sync(
        NodeSpec::new("sub_1")
            .input(FieldSpec::new("m", "int"))
            .output(FieldSpec::new("p", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "m") - 1)]),
    );
    let p = graph.call("sub_1", vec![m.into()], vec![]).unwrap();

    graph.add_node_sync(
        NodeSpec::new("add_1")
            .input(FieldSpec::new("n", "int"))
            .output(FieldSpec::new("m_prime", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "n") + 1)]),
    );
    let m_prime = graph.call("add_1", vec![n.into()], vec![]).unwrap();

    graph.add_node_sync(
        NodeSpec::new("reverse_order")
            .input(FieldSpec::new("p", "int"))
            .input(FieldSpec::new("m_prime", "int"))
            .output(FieldSpec::new("t", "int"))
            .output(FieldSpec::new("s", "int")),
        |kwargs| {
            let p = as_i64(&kwargs, "p");
            let m_prime = as_i64(&kwargs, "m_prime");
            Ok(vec![int(m_prime), int(p)])
        },
    );
    let reversed = graph
        .call(
            "reverse_order",
            vec![],
            vec![
                ("p".to_string(), p.field("p").unwrap().into()),
                ("m_prime".to_string(), m_prime.field("m_prime").unwrap().into()),
            ],
        )
        .unwrap();

    graph.set_outputs(reversed);
    let result = graph
        .run(RunInput::Positional(vec![int(5), int(6)]))
        .await
        .unwrap();
    assert_eq!(result.get("s"), int(4));
    assert_eq!(result.get("t"), int(7));
}

#[tokio::test]
async fn fan_out_composes_two_consumers() {
    let mut graph = Graph::new();

    graph.add_node_sync(
        NodeSpec::new("add_1")
            .input(FieldSpec::new("n", "int"))
            .output(FieldSpec::new("m", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "n") + 1)]),
    );
    let m = graph.call("add_1", vec![], vec![]).unwrap();

    graph.add_node_sync(
        NodeSpec::new("mult_2")
            .input(FieldSpec::new("m", "int"))
            .output(FieldSpec::new("q", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "m") * 2)]),
    );
    let q = graph.call("mult_2", vec![m.field("m").unwrap().into()], vec![]).unwrap();

    graph.add_node_sync(
        NodeSpec::new("sub_1")
            .input(FieldSpec::new("m", "int"))
            .output(FieldSpec::new("p", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "m") - 1)]),
    );
    let p = graph.call("sub_1", vec![m.field("m").unwrap().into()], vec![]).unwrap();

    graph.set_outputs(q + p);
    let result = graph.run(RunInput::Positional(vec![int(1)])).await.unwrap();
    assert_eq!(result.get("q"), int(4));
    assert_eq!(result.get("p"), int(1));
    assert_eq!(result.fields().len(), 2);
}

#[tokio::test]
async fn aggregator_averages_fan_in_results() {
    let mut graph = Graph::new();

    graph.add_node_sync(
        NodeSpec::new("sub_1_a")
            .input(FieldSpec::new("m", "int"))
            .output(FieldSpec::new("p", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "m") - 1)]),
    );
    let a = graph.call("sub_1_a", vec![], vec![]).unwrap();

    graph.add_node_sync(
        NodeSpec::new("sub_1_b")
            .input(FieldSpec::new("m", "int"))
            .output(FieldSpec::new("p", "int")),
        |kwargs| Ok(vec![int(as_i64(&kwargs, "m") - 1)]),
    );
    let b = graph.call("sub_1_b", vec![], vec![]).unwrap();

    let mut agg = graph.aggregator("rows");
    agg += a.field("p").unwrap();
    agg += b.field("p").unwrap();

    graph.add_node_sync(
        NodeSpec::new("average_list")
            .input(FieldSpec::new("rows", "list"))
            .output(FieldSpec::new("avg", "int")),
        |kwargs| {
            let rows = kwargs.get("rows").unwrap().as_json().unwrap().as_array().unwrap().clone();
            let sum: i64 = rows.iter().map(|v| v.as_i64().unwrap()).sum();
            Ok(vec![int(sum / rows.len() as i64)])
        },
    );
    let avg = graph
        .call("average_list", vec![], vec![("rows".to_string(), agg.into())])
        .unwrap();

    graph.set_outputs(avg);
    let result = graph
        .run(RunInput::Keyword(FxHashMap::from_iter([("m".to_string(), int(5))])))
        .await
        .unwrap();
    assert_eq!(result.get("avg"), int(4));
}

#[tokio::test]
async fn graph_of_graphs_summarizes_inner_results() {
    let mut graph = Graph::new();

    graph.add_node_async(
        NodeSpec::new("inner_run")
            .input(FieldSpec::new("seed", "int"))
            .output(FieldSpec::new("line", "string")),
        |kwargs| async move {
            let seed = as_i64(&kwargs, "seed");
            let mut inner = Graph::new();
            let x = inner.input("x", "int");
            inner.add_node_sync(
                NodeSpec::new("double")
                    .input(FieldSpec::new("x", "int"))
                    .output(FieldSpec::new("doubled", "int")),
                |kwargs| Ok(vec![int(as_i64(&kwargs, "x") * 2)]),
            );
            let doubled = inner.call("double", vec![x.into()], vec![]).unwrap();
            inner.set_outputs(doubled);
            let out = inner.run(RunInput::Positional(vec![int(seed)])).await.unwrap();
            let doubled = out.get("doubled").as_json().unwrap().as_i64().unwrap();
            Ok(vec![Value::Json(json!(format!("seed={seed} doubled={doubled}")))])
        },
    );

    let mut lines = Vec::new();
    for i in 0..5 {
        let handle = graph
            .call(
                "inner_run",
                vec![],
                vec![("seed".to_string(), Value::Json(json!(i)).into())],
            )
            .unwrap();
        lines.push(handle);
    }

    let mut agg = graph.aggregator("lines");
    for handle in &lines {
        agg += handle.field("line").unwrap();
    }

    graph.add_node_sync(
        NodeSpec::new("summarize")
            .input(FieldSpec::new("lines", "list"))
            .output(FieldSpec::new("summary", "string")),
        |kwargs| {
            let lines = kwargs.get("lines").unwrap().as_json().unwrap().as_array().unwrap().clone();
            let joined = lines
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            Ok(vec![Value::Json(json!(format!("--- summary ---\n{joined}")))])
        },
    );
    let summary = graph
        .call("summarize", vec![], vec![("lines".to_string(), agg.into())])
        .unwrap();
    graph.set_outputs(summary);

    let result = graph.run(RunInput::Keyword(FxHashMap::default())).await.unwrap();
    let expected = (0..5i64)
        .map(|i| format!("seed={i} doubled={}", i * 2))
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(
        result.get("summary"),
        Value::Json(json!(format!("--- summary ---\n{expected}")))
    );
}
