//! Per-row binding environment carried through plan steps.
//!
//! A [`BindingSet`] maps variable names to [`BindingValue`]s. Most queries
//! bind fewer than eight variables, so a flat vector of pairs beats a hash
//! map here. VectorSearchStep attaches similarity scores to a side-channel
//! keyed by variable, surfaced to projections as `<var>.similarity_score`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::{Edge, Node};
use crate::value::Value;

/// A value bound to a variable: a graph entity, a plain value, a list or a
/// sub-map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BindingValue {
    Node(Node),
    Edge(Edge),
    Value(Value),
    List(Vec<BindingValue>),
    Map(BTreeMap<String, BindingValue>),
}

impl BindingValue {
    pub fn null() -> BindingValue {
        BindingValue::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BindingValue::Value(Value::Null))
    }

    /// Project to a plain [`Value`]; graph entities, lists and maps have no
    /// value form and project to Null.
    pub fn as_value(&self) -> Value {
        match self {
            BindingValue::Value(v) => v.clone(),
            _ => Value::Null,
        }
    }

    /// Boolean coercion: Null is false, values coerce per
    /// [`Value::truthy`], nodes/edges/lists/maps are true.
    pub fn truthy(&self) -> bool {
        match self {
            BindingValue::Value(v) => v.truthy(),
            BindingValue::Node(_)
            | BindingValue::Edge(_)
            | BindingValue::List(_)
            | BindingValue::Map(_) => true,
        }
    }
}

impl From<Value> for BindingValue {
    fn from(value: Value) -> Self {
        BindingValue::Value(value)
    }
}

/// One query-evaluation row: an ordered name → value environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSet {
    entries: Vec<(String, BindingValue)>,
    vector_scores: Vec<(String, f64)>,
}

impl BindingSet {
    pub fn new() -> Self {
        BindingSet::default()
    }

    pub fn get(&self, name: &str) -> Option<&BindingValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Bind `name`, replacing any existing binding of the same name.
    pub fn set(&mut self, name: impl Into<String>, value: BindingValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindingValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn vector_score(&self, name: &str) -> Option<f64> {
        self.vector_scores
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| *s)
    }

    pub fn set_vector_score(&mut self, name: impl Into<String>, score: f64) {
        let name = name.into();
        match self.vector_scores.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = score,
            None => self.vector_scores.push((name, score)),
        }
    }
}
