//! quiver - Cypher-dialect graph query engine
//!
//! This crate turns a textual query into a materialized result set against
//! a pluggable graph store:
//! - Hand-written lexer and recursive-descent parser
//! - Expression evaluator with dynamic value semantics
//! - Physical plan builder with a rule-based optimizer
//! - Step interpreter for MATCH / OPTIONAL MATCH / WHERE / WITH / UNWIND /
//!   MERGE / UNION / SET / DELETE / CREATE / RETURN
//! - Traversal primitives (BFS, DFS, shortest path, all paths)
//! - Aggregation, grouping, DISTINCT / ORDER BY / SKIP / LIMIT
//! - Parameter binding, EXPLAIN / PROFILE, and a compiled-plan cache

pub mod binding;
pub mod config;
pub mod cypher_parser;
pub mod errors;
pub mod evaluator;
pub mod executor;
pub mod functions;
pub mod graph;
pub mod planner;
pub mod traverser;
pub mod value;

pub use binding::{BindingSet, BindingValue};
pub use config::EngineConfig;
pub use errors::EngineError;
pub use executor::context::CancellationToken;
pub use executor::result::{ProfileEntry, ResultSet};
pub use executor::{Executor, SearchIndex, VectorProvider};
pub use graph::{Direction, Edge, GraphStore, MemoryGraph, Node};
pub use traverser::{TraversalOptions, Traverser};
pub use value::Value;
