//! Graph store interface.
//!
//! The engine never owns storage: every read and write goes through the
//! [`GraphStore`] trait, and nodes/edges cross the boundary as owned
//! snapshots. [`MemoryGraph`] is an indexed in-memory implementation used
//! by the test suites and for embedding without a backing store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

pub mod memory;

pub use memory::MemoryGraph;

/// Traversal/pattern direction relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Owned snapshot of a stored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub labels: Vec<String>,
    pub properties: HashMap<String, Value>,
}

impl Node {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Owned snapshot of a stored edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: u64,
    pub from: u64,
    pub to: u64,
    pub edge_type: String,
    pub properties: HashMap<String, Value>,
    pub weight: f64,
}

impl Edge {
    /// The endpoint opposite `node_id`. Self-loops return `node_id`.
    pub fn other_endpoint(&self, node_id: u64) -> u64 {
        if self.from == node_id {
            self.to
        } else {
            self.from
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    /// Highest node id ever assigned. Node ids are dense 1..N over a
    /// monotonic counter; deleted ids stay unassigned, so scans over
    /// `1..=node_count` skip NotFound holes.
    pub node_count: u64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("node {0} not found")]
    NotFound(u64),

    #[error("edge {0} not found")]
    EdgeNotFound(u64),

    #[error("no index available for property '{0}'")]
    IndexUnavailable(String),

    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),

    #[error("storage failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Narrow storage interface consumed by the engine.
///
/// Implementations must be safe to share across concurrently running
/// queries; the engine itself never caches nodes or edges across steps.
pub trait GraphStore: Send + Sync {
    fn get_node(&self, id: u64) -> StoreResult<Node>;

    fn create_node(&self, labels: Vec<String>, properties: HashMap<String, Value>)
        -> StoreResult<Node>;

    /// Replace the node's property map.
    fn update_node(&self, id: u64, properties: HashMap<String, Value>) -> StoreResult<()>;

    /// Replace the node's label set. Backs `REMOVE n:Label`; stores without
    /// mutable labels may leave the default in place.
    fn update_node_labels(&self, _id: u64, _labels: Vec<String>) -> StoreResult<()> {
        Err(StoreError::Unsupported("update_node_labels"))
    }

    /// Delete the node and all incident edges.
    fn delete_node(&self, id: u64) -> StoreResult<()>;

    fn create_edge(
        &self,
        from: u64,
        to: u64,
        edge_type: &str,
        properties: HashMap<String, Value>,
        weight: f64,
    ) -> StoreResult<Edge>;

    fn get_outgoing_edges(&self, id: u64) -> StoreResult<Vec<Edge>>;

    fn get_incoming_edges(&self, id: u64) -> StoreResult<Vec<Edge>>;

    fn find_nodes_by_label(&self, label: &str) -> StoreResult<Vec<Node>>;

    /// Indexed property lookup. Stores without an index on `key` fall back
    /// to a scan; the optimizer only plans this path when
    /// [`GraphStore::has_property_index`] reports true.
    fn find_nodes_by_property_indexed(&self, key: &str, value: &Value) -> StoreResult<Vec<Node>>;

    fn has_property_index(&self, key: &str) -> bool;

    fn get_statistics(&self) -> GraphStatistics;

    /// Whether a vector index exists on `property`. Absent means the
    /// vector-search plan rewrite is disabled; brute-force
    /// `vector.similarity()` over a scan still works.
    fn has_vector_index(&self, _property: &str) -> bool {
        false
    }

    /// kNN over the vector index on `property`; returns (node id, distance)
    /// pairs, nearest first.
    fn vector_search(
        &self,
        property: &str,
        _query: &[f32],
        _k: usize,
        _ef: usize,
    ) -> StoreResult<Vec<(u64, f64)>> {
        Err(StoreError::IndexUnavailable(property.to_string()))
    }
}
