//! Named-field value containers with an unset sentinel and a conflict-aware merge.
//!
//! Grounded on `weavegraph::state::VersionedState`/`StateSnapshot` (a typed container keyed by
//! named channels) but scoped down to `SPEC_FULL.md` §3/§4.A: a record here owns a flat,
//! caller-declared schema rather than three fixed channels.

use rustc_hash::FxHashMap;

use crate::error::ExecutorError;
use crate::types::{normalize_type_name, Value};

/// Declares one field of a node's input or output schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    pub default: Value,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        FieldSpec {
            name: name.into(),
            type_name: normalize_type_name(&type_name.into()),
            default: Value::Unset,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }
}

/// A named-field value container. Every field starts at [`Value::Unset`] and can be written
/// at most once to a concrete value (`SPEC_FULL.md` §4.A).
#[derive(Clone, Debug)]
pub struct Record {
    name: String,
    fields: FxHashMap<String, Value>,
    order: Vec<String>,
}

impl Record {
    /// Creates a record pre-populated with `schema`'s fields, each holding `Value::Unset`
    /// unless the field declares a non-unset default.
    pub fn new(name: impl Into<String>, schema: &[FieldSpec]) -> Self {
        let mut fields = FxHashMap::default();
        let mut order = Vec::with_capacity(schema.len());
        for spec in schema {
            fields.insert(spec.name.clone(), spec.default.clone());
            order.push(spec.name.clone());
        }
        Record {
            name: name.into(),
            fields,
            order,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, field: &str) -> Value {
        self.fields.get(field).cloned().unwrap_or(Value::Unset)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Writes `value` to `field`. Fails if the field does not exist, or if it is already set
    /// to a different value than `value` (`SPEC_FULL.md` §4.A).
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), ExecutorError> {
        let current = self
            .fields
            .get(field)
            .ok_or_else(|| ExecutorError::UnknownField {
                record: self.name.clone(),
                field: field.to_string(),
            })?;
        match current {
            Value::Unset => {
                self.fields.insert(field.to_string(), value);
                if !self.order.iter().any(|f| f == field) {
                    self.order.push(field.to_string());
                }
                Ok(())
            }
            existing if *existing == value => Ok(()),
            _ => Err(ExecutorError::DoubleWrite {
                record: self.name.clone(),
                field: field.to_string(),
            }),
        }
    }

    /// Resets every field back to [`Value::Unset`], keeping the schema.
    pub fn reset(&mut self) {
        for v in self.fields.values_mut() {
            *v = Value::Unset;
        }
    }

    /// Copies each field from `other` into `self`: fields unset in `self` are adopted, fields
    /// already set must agree, and fields absent from `self`'s schema are appended
    /// (`SPEC_FULL.md` §4.A — records allow extension for composite graph outputs).
    pub fn merge(&mut self, other: &Record) -> Result<(), ExecutorError> {
        for field in other.fields() {
            let incoming = other.get(field);
            if incoming.is_unset() {
                continue;
            }
            match self.fields.get(field) {
                None => {
                    self.fields.insert(field.clone(), incoming);
                    self.order.push(field.clone());
                }
                Some(Value::Unset) => {
                    self.fields.insert(field.clone(), incoming);
                }
                Some(existing) if *existing == incoming => {}
                Some(_) => {
                    return Err(ExecutorError::DoubleWrite {
                        record: self.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn as_map(&self) -> FxHashMap<String, Value> {
        self.fields.clone()
    }
}
