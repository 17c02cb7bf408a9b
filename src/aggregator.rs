//! Fan-in accumulation: collecting several field references into one ordered slot list.
//!
//! Grounded on `SPEC_FULL.md` §3/§4.D's `Aggregator`, which preserves the original's `iadd`
//! fan-in idiom (`agg += handle.field("x")`) as Rust `AddAssign`. Unlike
//! [`crate::handle::OutputHandle`]'s operator, which panics on misuse, an aggregator slot's
//! validity can't be checked until `Graph::call` resolves it against the flow graph — so the
//! type system here only enforces *what* can be added (a `FieldRef` or another `Aggregator`),
//! not whether the resulting wiring is sound.

use std::ops::AddAssign;

use crate::handle::FieldRef;
use crate::types::AggregatorId;

/// Accumulates named inputs destined for a single consumer field, preserving insertion order
/// (`SPEC_FULL.md` §4.D: aggregator slot order is load-bearing for the consumer's call site).
///
/// Each slot is named `"<result_name>_<n>"`, `n` counting up from the aggregator's own inputs
/// at the time of the append — this gives every fan-in edge a stable, recoverable name distinct
/// from its `FieldRef`.
#[derive(Clone, Debug)]
pub struct Aggregator {
    pub id: AggregatorId,
    pub result_name: String,
    pub inputs: Vec<(String, FieldRef)>,
}

impl Aggregator {
    pub fn new(result_name: impl Into<String>) -> Self {
        let result_name = result_name.into();
        Aggregator {
            id: AggregatorId::new(&result_name),
            result_name,
            inputs: Vec::new(),
        }
    }
}

impl AddAssign<FieldRef> for Aggregator {
    fn add_assign(&mut self, rhs: FieldRef) {
        let slot = format!("{}_{}", self.result_name, self.inputs.len());
        self.inputs.push((slot, rhs));
    }
}

impl AddAssign<Aggregator> for Aggregator {
    /// Splices another aggregator's inputs into this one, in order, then discards its identity.
    fn add_assign(&mut self, rhs: Aggregator) {
        self.inputs.extend(rhs.inputs);
    }
}
