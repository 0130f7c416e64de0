//! In-memory reference implementation of [`GraphStore`].
//!
//! Keeps adjacency lists, a label index, exact-match property indexes and
//! an optional brute-force vector index. Interior mutability through a
//! single `RwLock` so one instance can serve concurrent queries.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use crate::graph::{Edge, GraphStatistics, GraphStore, Node, StoreError, StoreResult};
use crate::value::Value;

#[derive(Default)]
struct MemoryGraphInner {
    nodes: BTreeMap<u64, Node>,
    edges: BTreeMap<u64, Edge>,
    outgoing: HashMap<u64, Vec<u64>>,
    incoming: HashMap<u64, Vec<u64>>,
    label_index: HashMap<String, BTreeSet<u64>>,
    indexed_properties: HashSet<String>,
    property_index: HashMap<String, HashMap<String, BTreeSet<u64>>>,
    vector_properties: HashSet<String>,
    next_node_id: u64,
    next_edge_id: u64,
}

/// Exact-match index key: tag-prefixed so `Int(1)` and `String("1")` never
/// collide.
fn index_key(value: &Value) -> String {
    format!("{}:{}", value.type_name(), value)
}

impl MemoryGraphInner {
    fn index_node_property(&mut self, key: &str, value: &Value, id: u64) {
        self.property_index
            .entry(key.to_string())
            .or_default()
            .entry(index_key(value))
            .or_default()
            .insert(id);
    }

    fn unindex_node(&mut self, node: &Node) {
        for (key, value) in &node.properties {
            if self.indexed_properties.contains(key) {
                if let Some(by_value) = self.property_index.get_mut(key) {
                    if let Some(ids) = by_value.get_mut(&index_key(value)) {
                        ids.remove(&node.id);
                    }
                }
            }
        }
    }

    fn index_node(&mut self, node: &Node) {
        let indexed: Vec<(String, Value)> = node
            .properties
            .iter()
            .filter(|(k, _)| self.indexed_properties.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in indexed {
            self.index_node_property(&key, &value, node.id);
        }
    }

    fn detach_edge(&mut self, edge: &Edge) {
        if let Some(out) = self.outgoing.get_mut(&edge.from) {
            out.retain(|&e| e != edge.id);
        }
        if let Some(inc) = self.incoming.get_mut(&edge.to) {
            inc.retain(|&e| e != edge.id);
        }
    }
}

pub struct MemoryGraph {
    inner: RwLock<MemoryGraphInner>,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        MemoryGraph {
            inner: RwLock::new(MemoryGraphInner::default()),
        }
    }

    /// Declare an exact-match index on a property key. Existing nodes are
    /// indexed immediately.
    pub fn create_property_index(&self, key: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.indexed_properties.insert(key.to_string());
        let entries: Vec<(u64, Value)> = inner
            .nodes
            .values()
            .filter_map(|n| n.properties.get(key).map(|v| (n.id, v.clone())))
            .collect();
        for (id, value) in entries {
            inner.index_node_property(key, &value, id);
        }
    }

    /// Declare a (brute-force) vector index on a property key holding
    /// `Value::Vector` embeddings.
    pub fn create_vector_index(&self, key: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.vector_properties.insert(key.to_string());
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 1.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        na += f64::from(*x) * f64::from(*x);
        nb += f64::from(*y) * f64::from(*y);
    }
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na.sqrt() * nb.sqrt())
}

impl GraphStore for MemoryGraph {
    fn get_node(&self, id: u64) -> StoreResult<Node> {
        let inner = self.inner.read().unwrap();
        inner.nodes.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn create_node(
        &self,
        labels: Vec<String>,
        properties: HashMap<String, Value>,
    ) -> StoreResult<Node> {
        let mut inner = self.inner.write().unwrap();
        inner.next_node_id += 1;
        let id = inner.next_node_id;
        let node = Node {
            id,
            labels,
            properties,
        };
        for label in &node.labels {
            inner.label_index.entry(label.clone()).or_default().insert(id);
        }
        inner.index_node(&node);
        inner.nodes.insert(id, node.clone());
        Ok(node)
    }

    fn update_node(&self, id: u64, properties: HashMap<String, Value>) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let old = inner.nodes.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        inner.unindex_node(&old);
        let mut node = old;
        node.properties = properties;
        inner.index_node(&node);
        inner.nodes.insert(id, node);
        Ok(())
    }

    fn update_node_labels(&self, id: u64, labels: Vec<String>) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let old = inner.nodes.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        for label in &old.labels {
            if let Some(ids) = inner.label_index.get_mut(label) {
                ids.remove(&id);
            }
        }
        for label in &labels {
            inner.label_index.entry(label.clone()).or_default().insert(id);
        }
        let mut node = old;
        node.labels = labels;
        inner.nodes.insert(id, node);
        Ok(())
    }

    fn delete_node(&self, id: u64) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let node = inner.nodes.remove(&id).ok_or(StoreError::NotFound(id))?;
        inner.unindex_node(&node);
        for label in &node.labels {
            if let Some(ids) = inner.label_index.get_mut(label) {
                ids.remove(&id);
            }
        }
        let incident: Vec<u64> = inner
            .outgoing
            .remove(&id)
            .unwrap_or_default()
            .into_iter()
            .chain(inner.incoming.remove(&id).unwrap_or_default())
            .collect();
        for edge_id in incident {
            if let Some(edge) = inner.edges.remove(&edge_id) {
                inner.detach_edge(&edge);
            }
        }
        Ok(())
    }

    fn create_edge(
        &self,
        from: u64,
        to: u64,
        edge_type: &str,
        properties: HashMap<String, Value>,
        weight: f64,
    ) -> StoreResult<Edge> {
        let mut inner = self.inner.write().unwrap();
        if !inner.nodes.contains_key(&from) {
            return Err(StoreError::NotFound(from));
        }
        if !inner.nodes.contains_key(&to) {
            return Err(StoreError::NotFound(to));
        }
        inner.next_edge_id += 1;
        let edge = Edge {
            id: inner.next_edge_id,
            from,
            to,
            edge_type: edge_type.to_string(),
            properties,
            weight,
        };
        inner.outgoing.entry(from).or_default().push(edge.id);
        inner.incoming.entry(to).or_default().push(edge.id);
        inner.edges.insert(edge.id, edge.clone());
        Ok(edge)
    }

    fn get_outgoing_edges(&self, id: u64) -> StoreResult<Vec<Edge>> {
        let inner = self.inner.read().unwrap();
        if !inner.nodes.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(inner
            .outgoing
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|e| inner.edges.get(e).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_incoming_edges(&self, id: u64) -> StoreResult<Vec<Edge>> {
        let inner = self.inner.read().unwrap();
        if !inner.nodes.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(inner
            .incoming
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|e| inner.edges.get(e).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_nodes_by_label(&self, label: &str) -> StoreResult<Vec<Node>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .label_index
            .get(label)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.nodes.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_nodes_by_property_indexed(&self, key: &str, value: &Value) -> StoreResult<Vec<Node>> {
        let inner = self.inner.read().unwrap();
        if inner.indexed_properties.contains(key) {
            return Ok(inner
                .property_index
                .get(key)
                .and_then(|by_value| by_value.get(&index_key(value)))
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| inner.nodes.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default());
        }
        // No index declared: fall back to a scan.
        Ok(inner
            .nodes
            .values()
            .filter(|n| n.properties.get(key).is_some_and(|v| v.strict_eq(value)))
            .cloned()
            .collect())
    }

    fn has_property_index(&self, key: &str) -> bool {
        self.inner.read().unwrap().indexed_properties.contains(key)
    }

    fn get_statistics(&self) -> GraphStatistics {
        GraphStatistics {
            node_count: self.inner.read().unwrap().next_node_id,
        }
    }

    fn has_vector_index(&self, property: &str) -> bool {
        self.inner.read().unwrap().vector_properties.contains(property)
    }

    fn vector_search(
        &self,
        property: &str,
        query: &[f32],
        k: usize,
        _ef: usize,
    ) -> StoreResult<Vec<(u64, f64)>> {
        let inner = self.inner.read().unwrap();
        if !inner.vector_properties.contains(property) {
            return Err(StoreError::IndexUnavailable(property.to_string()));
        }
        let mut scored: Vec<(u64, f64)> = inner
            .nodes
            .values()
            .filter_map(|n| match n.properties.get(property) {
                Some(Value::Vector(v)) => Some((n.id, cosine_distance(v, query))),
                _ => None,
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
