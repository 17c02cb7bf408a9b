//! Core value and identifier types shared across the executor.
//!
//! Follows `weavegraph::types`: small, `Serialize`-able identifier newtypes plus the
//! fundamental domain value, kept separate from the larger structures ([`crate::record::Record`],
//! [`crate::graphio::GraphIo`]) that are built out of them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value held by a [`crate::record::Record`] field.
///
/// `Unset` is the dedicated sentinel for "not produced yet" (see `SPEC_FULL.md` §9): it is a
/// distinct enum variant, never confusable with a legitimate `Json(serde_json::Value::Null)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value has been written to this field yet.
    Unset,
    /// A produced value.
    Json(serde_json::Value),
}

impl Value {
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Unset => None,
            Value::Json(v) => Some(v),
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Value::Unset => None,
            Value::Json(v) => Some(v),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => write!(f, "<unset>"),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

/// Unique identifier for one invocation of a node within a [`crate::graph::Graph`].
///
/// Implemented as `"<node-name>-<uuid v4>"`, matching `weavegraph`'s `GraphIo` id convention
/// described in `SPEC_FULL.md` §3 — an arena key, not a pointer, so handles stay `'static`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphIoId(String);

impl GraphIoId {
    pub fn new(node_name: &str) -> Self {
        GraphIoId(format!("{node_name}-{}", Uuid::new_v4()))
    }

    /// Construct a synthetic id for a graph-level input record.
    pub fn for_input(name: &str) -> Self {
        GraphIoId(format!("input:{name}-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GraphIoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an [`crate::aggregator::Aggregator`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregatorId(String);

impl AggregatorId {
    pub fn new(name: &str) -> Self {
        AggregatorId(format!("agg:{name}-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collapses parametric generic type names to their lower-case concrete equivalents.
///
/// Applied to every [`crate::node::FieldSpec::type_name`] at registration time
/// (`SPEC_FULL.md` §6). Unknown names pass through unchanged.
pub fn normalize_type_name(name: &str) -> String {
    const TABLE: &[(&str, &str)] = &[
        ("Dict", "dict"),
        ("List", "list"),
        ("Set", "set"),
        ("Tuple", "tuple"),
        ("FrozenSet", "frozenset"),
        ("DefaultDict", "defaultdict"),
        ("OrderedDict", "ordereddict"),
        ("ChainMap", "chainmap"),
        ("Counter", "counter"),
        ("Deque", "deque"),
        ("NamedTuple", "namedtuple"),
    ];
    let base = name.split('[').next().unwrap_or(name).trim();
    for (generic, concrete) in TABLE {
        if base == *generic {
            return (*concrete).to_string();
        }
    }
    name.to_string()
}
