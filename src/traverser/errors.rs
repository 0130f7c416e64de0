use thiserror::Error;

use crate::graph::StoreError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TraversalError {
    #[error("invalid traversal depth {depth} (must be at most {max})")]
    InvalidTraversalDepth { depth: u32, max: u32 },

    #[error("invalid max results {requested} (must be between 1 and {max})")]
    InvalidMaxResults { requested: usize, max: usize },

    #[error("no path from node {from} to node {to}")]
    NoPath { from: u64, to: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
