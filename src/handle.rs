//! Output handles: the caller-visible result of wiring a node into a graph.
//!
//! Grounded on `SPEC_FULL.md` §3/§4.D's `OutputHandle`/`FieldRef`. Composing two handles with
//! `+` (instead of a `combine`/`merge` method) mirrors the teacher's preference for small,
//! composable builder types (`weavegraph::graphs::builder::GraphBuilder` chains via `self`);
//! here the composition operator is `Add`/`AddAssign` rather than method chaining, since
//! `SPEC_FULL.md` explicitly calls out `iadd`-style composite assembly as behavior to preserve.

use std::ops::{Add, AddAssign};

use indexmap::IndexMap;

use crate::error::ExecutorError;
use crate::types::GraphIoId;

/// A reference to a single named output field of a particular node invocation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub graphio_id: GraphIoId,
    pub field: String,
}

impl FieldRef {
    pub fn new(graphio_id: GraphIoId, field: impl Into<String>) -> Self {
        FieldRef {
            graphio_id,
            field: field.into(),
        }
    }
}

/// The result of invoking a node: a named map of [`FieldRef`]s pointing back at that
/// invocation's output record.
///
/// Two handles may be combined with `+` to build a composite handle spanning several node
/// invocations, e.g. `let both = left_handle + right_handle;` — a `DoubleWrite`-style error is
/// raised at combine time if the two sides declare the same field name.
#[derive(Clone, Debug, Default)]
pub struct OutputHandle {
    fields: IndexMap<String, FieldRef>,
}

impl OutputHandle {
    pub fn new() -> Self {
        OutputHandle {
            fields: IndexMap::new(),
        }
    }

    pub(crate) fn single(graphio_id: GraphIoId, field_names: &[String]) -> Self {
        let mut fields = IndexMap::new();
        for name in field_names {
            fields.insert(name.clone(), FieldRef::new(graphio_id.clone(), name.clone()));
        }
        OutputHandle { fields }
    }

    /// Looks up the field reference for `name`, as `OutputHandle::field("out")` style access.
    pub fn field(&self, name: &str) -> Option<FieldRef> {
        self.fields.get(name).cloned()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRef)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn merge_from(&mut self, other: OutputHandle) -> Result<(), ExecutorError> {
        for (name, field_ref) in other.fields {
            if self.fields.contains_key(&name) {
                return Err(ExecutorError::DoubleWrite {
                    record: "<composite output>".to_string(),
                    field: name,
                });
            }
            self.fields.insert(name, field_ref);
        }
        Ok(())
    }
}

impl Add for OutputHandle {
    type Output = OutputHandle;

    /// Combines two handles' field maps. Panics on an overlapping field name — the
    /// infallible operator form mirrors the teacher's fallible-inside/infallible-outside
    /// split seen in `weavegraph::node::NodePartial`'s builder methods, which assert
    /// invariants the caller is expected to have already upheld by construction.
    fn add(mut self, rhs: OutputHandle) -> OutputHandle {
        self.merge_from(rhs)
            .expect("OutputHandle::add: overlapping field name between combined handles");
        self
    }
}

impl AddAssign for OutputHandle {
    fn add_assign(&mut self, rhs: OutputHandle) {
        self.merge_from(rhs)
            .expect("OutputHandle::add_assign: overlapping field name between combined handles");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(node: &str, fields: &[&str]) -> OutputHandle {
        let id = GraphIoId::new(node);
        OutputHandle::single(id, &fields.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn field_looks_up_by_name() {
        let h = handle("n1", &["out"]);
        assert!(h.field("out").is_some());
        assert!(h.field("missing").is_none());
    }

    #[test]
    fn add_combines_disjoint_handles() {
        let left = handle("n1", &["a"]);
        let right = handle("n2", &["b"]);
        let combined = left + right;
        assert!(combined.field("a").is_some());
        assert!(combined.field("b").is_some());
    }

    #[test]
    #[should_panic(expected = "overlapping field name")]
    fn add_panics_on_overlapping_field() {
        let left = handle("n1", &["a"]);
        let right = handle("n2", &["a"]);
        let _ = left + right;
    }

    #[test]
    fn add_assign_combines_in_place() {
        let mut left = handle("n1", &["a"]);
        let right = handle("n2", &["b"]);
        left += right;
        assert!(left.field("a").is_some());
        assert!(left.field("b").is_some());
    }
}
