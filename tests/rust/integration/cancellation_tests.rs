//! Cancellation and timeout behavior.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quiver::{CancellationToken, Executor, GraphStore, MemoryGraph, Value};

use crate::executor;

fn big_graph(nodes: u64) -> Arc<MemoryGraph> {
    let graph = Arc::new(MemoryGraph::new());
    for i in 0..nodes {
        let mut properties = HashMap::new();
        properties.insert("i".to_string(), Value::Int(i as i64));
        graph
            .create_node(vec!["Item".to_string()], properties)
            .unwrap();
    }
    graph
}

#[test]
fn test_pre_cancelled_query_returns_cancelled() {
    let exec = executor();
    let token = CancellationToken::new();
    token.cancel();
    let err = exec
        .execute_with_options("MATCH (n:Person) RETURN n.name", &HashMap::new(), None, Some(token))
        .unwrap_err();
    assert!(err.to_string().contains("cancelled"), "{}", err);
}

#[test]
fn test_cancelled_mutation_leaves_store_untouched() {
    let graph = big_graph(3);
    let exec = Executor::new(Arc::clone(&graph) as Arc<dyn GraphStore>);
    let before = graph.get_statistics().node_count;

    let token = CancellationToken::new();
    token.cancel();
    let err = exec
        .execute_with_options("CREATE (n:Item {i: 999})", &HashMap::new(), None, Some(token))
        .unwrap_err();
    assert!(err.to_string().contains("cancelled"), "{}", err);
    assert_eq!(graph.get_statistics().node_count, before);
}

#[test]
fn test_tight_timeout_aborts_scan() {
    // A cartesian self-join over 30k nodes cannot finish in a
    // millisecond; the deadline check fires between rows.
    let graph = big_graph(30_000);
    let exec = Executor::new(graph);
    let err = exec
        .execute_with_options(
            "MATCH (a:Item), (b:Item) RETURN COUNT(*)",
            &HashMap::new(),
            Some(Duration::from_millis(1)),
            None,
        )
        .unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("timed out") || message.contains("cartesian"),
        "{}",
        message
    );
}
