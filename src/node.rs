//! Node execution primitives: wrapping a plain closure into a typed, invocable unit.
//!
//! Grounded on `weavegraph::node`: that crate wraps an `async fn run(snapshot, ctx)` behind the
//! `Node` trait; here a node wraps a closure directly (no snapshot/ctx, no trait object per node
//! author) because `SPEC_FULL.md` §1 replaces the docstring/annotation oracles with an explicit
//! [`NodeSpec`] supplied at registration time instead of a `#[async_trait] impl Node for MyType`
//! per node.

use std::future::Future;
use std::pin::Pin;

use rustc_hash::FxHashMap;

use crate::error::ExecutorError;
use crate::record::FieldSpec;
use crate::types::Value;

/// A boxed, `Send` future — the async node closures' return type.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether a node is dispatched inline (`Sync`) or concurrently as part of a wave (`Async`).
///
/// Matches `SPEC_FULL.md` §3's `Node.kind`; the idiomatic substitute for the `isAsync(fn)`
/// oracle is simply which `Graph::add_node_*` constructor the caller used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Sync,
    Async,
}

/// Explicit schema for a node, replacing the `parseParams`/`parseReturns` docstring oracles.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub name: String,
    pub inputs: Vec<FieldSpec>,
    pub outputs: Vec<FieldSpec>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        NodeSpec {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    #[must_use]
    pub fn input(mut self, field: FieldSpec) -> Self {
        self.inputs.push(field);
        self
    }

    #[must_use]
    pub fn output(mut self, field: FieldSpec) -> Self {
        self.outputs.push(field);
        self
    }
}

type SyncFn = dyn Fn(FxHashMap<String, Value>) -> Result<Vec<Value>, ExecutorError> + Send + Sync;
type AsyncFn = dyn Fn(FxHashMap<String, Value>) -> BoxFuture<'static, Result<Vec<Value>, ExecutorError>>
    + Send
    + Sync;

enum Invoker {
    Sync(Box<SyncFn>),
    Async(Box<AsyncFn>),
}

/// A registered node: an immutable name, input/output schema, and invocation contract.
///
/// Once built, a `Node` is wrapped in an `Arc` and shared by every [`crate::graphio::GraphIo`]
/// invocation of it, mirroring `weavegraph::graphs::GraphBuilder`'s `Arc<dyn Node>` registry.
pub struct Node {
    pub name: String,
    pub input_schema: Vec<FieldSpec>,
    pub output_schema: Vec<FieldSpec>,
    pub kind: NodeKind,
    invoker: Invoker,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Node {
    pub(crate) fn new_sync(
        spec: NodeSpec,
        f: impl Fn(FxHashMap<String, Value>) -> Result<Vec<Value>, ExecutorError> + Send + Sync + 'static,
    ) -> Self {
        Node {
            name: spec.name,
            input_schema: spec.inputs,
            output_schema: spec.outputs,
            kind: NodeKind::Sync,
            invoker: Invoker::Sync(Box::new(f)),
        }
    }

    pub(crate) fn new_async<F, Fut>(spec: NodeSpec, f: F) -> Self
    where
        F: Fn(FxHashMap<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Value>, ExecutorError>> + Send + 'static,
    {
        Node {
            name: spec.name,
            input_schema: spec.inputs,
            output_schema: spec.outputs,
            kind: NodeKind::Async,
            invoker: Invoker::Async(Box::new(move |kwargs| Box::pin(f(kwargs)))),
        }
    }

    /// Calls the wrapped closure synchronously. Panics if this node is async — the scheduler
    /// (the only caller) always checks `kind` first.
    pub(crate) fn invoke_sync(
        &self,
        kwargs: FxHashMap<String, Value>,
    ) -> Result<Vec<Value>, ExecutorError> {
        match &self.invoker {
            Invoker::Sync(f) => f(kwargs),
            Invoker::Async(_) => unreachable!("invoke_sync called on an async node"),
        }
    }

    /// Calls the wrapped closure, returning its future. Panics if this node is sync.
    pub(crate) fn invoke_async(
        &self,
        kwargs: FxHashMap<String, Value>,
    ) -> BoxFuture<'static, Result<Vec<Value>, ExecutorError>> {
        match &self.invoker {
            Invoker::Async(f) => f(kwargs),
            Invoker::Sync(_) => unreachable!("invoke_async called on a sync node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sync_node_invokes_closure() {
        let spec = NodeSpec::new("add_one")
            .input(FieldSpec::new("n", "any"))
            .output(FieldSpec::new("out", "any"));
        let node = Node::new_sync(spec, |kwargs| {
            let n = kwargs.get("n").unwrap().as_json().unwrap().as_i64().unwrap();
            Ok(vec![Value::Json(json!(n + 1))])
        });
        let mut kwargs = FxHashMap::default();
        kwargs.insert("n".to_string(), Value::Json(json!(41)));
        let result = node.invoke_sync(kwargs).unwrap();
        assert_eq!(result, vec![Value::Json(json!(42))]);
    }

    #[tokio::test]
    async fn async_node_invokes_closure() {
        let spec = NodeSpec::new("double").output(FieldSpec::new("out", "any"));
        let node = Node::new_async(spec, |kwargs| async move {
            let n = kwargs
                .get("n")
                .and_then(Value::as_json)
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            Ok(vec![Value::Json(json!(n * 2))])
        });
        let mut kwargs = FxHashMap::default();
        kwargs.insert("n".to_string(), Value::Json(json!(21)));
        let result = node.invoke_async(kwargs).await.unwrap();
        assert_eq!(result, vec![Value::Json(json!(42))]);
    }
}
