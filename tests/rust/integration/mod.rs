//! Integration tests: full query pipeline over the in-memory store.

mod cancellation_tests;
mod optimizer_equivalence_tests;
mod query_scenario_tests;

use std::collections::HashMap;
use std::sync::Arc;

use quiver::{Executor, GraphStore, MemoryGraph, Value};

/// Alice (30, Eng, 80000), Bob (25, Sales, 60000), Charlie (35, Eng,
/// 90000); Alice KNOWS Bob, Alice KNOWS Charlie.
pub(crate) fn people_graph() -> Arc<MemoryGraph> {
    let graph = Arc::new(MemoryGraph::new());
    let mut make = |name: &str, age: i64, dept: &str, salary: i64| {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), Value::String(name.to_string()));
        properties.insert("age".to_string(), Value::Int(age));
        properties.insert("dept".to_string(), Value::String(dept.to_string()));
        properties.insert("salary".to_string(), Value::Int(salary));
        graph
            .create_node(vec!["Person".to_string()], properties)
            .unwrap()
    };
    let alice = make("Alice", 30, "Eng", 80_000);
    let bob = make("Bob", 25, "Sales", 60_000);
    let charlie = make("Charlie", 35, "Eng", 90_000);
    graph
        .create_edge(alice.id, bob.id, "KNOWS", HashMap::new(), 1.0)
        .unwrap();
    graph
        .create_edge(alice.id, charlie.id, "KNOWS", HashMap::new(), 1.0)
        .unwrap();
    graph
}

pub(crate) fn executor() -> Executor {
    let _ = env_logger::builder().is_test(true).try_init();
    Executor::new(people_graph())
}
