//! Optimization equivalence: the same query over the same data yields the
//! same result set whether or not indexes enable plan rewrites.

use std::collections::HashMap;
use std::sync::Arc;

use quiver::{BindingValue, Executor, GraphStore, MemoryGraph, ResultSet, Value};

fn seeded_graph(indexed: bool) -> Arc<MemoryGraph> {
    let graph = Arc::new(MemoryGraph::new());
    if indexed {
        graph.create_property_index("name");
    }
    for (name, age) in [("Alice", 30), ("Bob", 25), ("Charlie", 35), ("Alice", 52)] {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), Value::String(name.to_string()));
        properties.insert("age".to_string(), Value::Int(age));
        graph
            .create_node(vec!["Person".to_string()], properties)
            .unwrap();
    }
    graph
}

fn sorted_cells(result: &ResultSet, column: &str) -> Vec<String> {
    let mut cells: Vec<String> = result
        .rows
        .iter()
        .map(|row| format!("{:?}", row.get(column).map(BindingValue::as_value)))
        .collect();
    cells.sort();
    cells
}

#[test]
fn test_index_lookup_rewrite_is_observably_equivalent() {
    let queries = [
        "MATCH (n:Person) WHERE n.name = 'Alice' RETURN n.age",
        "MATCH (n:Person) WHERE n.name = 'Alice' AND n.age > 40 RETURN n.age",
        "MATCH (n) WHERE n.name = 'Nobody' RETURN n.age",
    ];
    for query in queries {
        let plain = Executor::new(seeded_graph(false)).execute(query).unwrap();
        let indexed = Executor::new(seeded_graph(true)).execute(query).unwrap();
        assert_eq!(
            sorted_cells(&plain, "n.age"),
            sorted_cells(&indexed, "n.age"),
            "for {}",
            query
        );
        assert_eq!(plain.count, indexed.count, "for {}", query);
    }
}

#[test]
fn test_indexed_plan_actually_uses_the_index() {
    let exec = Executor::new(seeded_graph(true));
    let explain = exec
        .execute("EXPLAIN MATCH (n:Person) WHERE n.name = 'Alice' RETURN n.age")
        .unwrap();
    let steps: Vec<String> = explain
        .rows
        .iter()
        .map(|row| match row.get("step").map(BindingValue::as_value) {
            Some(Value::String(s)) => s,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert!(steps.contains(&"IndexLookupStep".to_string()), "{:?}", steps);
    assert!(!steps.contains(&"MatchStep".to_string()), "{:?}", steps);
}

#[test]
fn test_vector_search_rewrite_is_observably_equivalent() {
    let build = |indexed: bool| {
        let graph = Arc::new(MemoryGraph::new());
        if indexed {
            graph.create_vector_index("embedding");
        }
        for (i, v) in [
            vec![1.0f32, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
        ]
        .into_iter()
        .enumerate()
        {
            let mut properties = HashMap::new();
            properties.insert("i".to_string(), Value::Int(i as i64));
            properties.insert("embedding".to_string(), Value::Vector(v));
            graph.create_node(vec!["Doc".to_string()], properties).unwrap();
        }
        Executor::new(graph)
    };
    let mut params = HashMap::new();
    params.insert("q".to_string(), Value::Vector(vec![1.0, 0.0]));
    let query =
        "MATCH (n:Doc) WHERE vector.similarity(n.embedding, $q) > 0.8 RETURN n.i";

    let plain = build(false).execute_with_params(query, &params).unwrap();
    let indexed = build(true).execute_with_params(query, &params).unwrap();
    assert_eq!(sorted_cells(&plain, "n.i"), sorted_cells(&indexed, "n.i"));
    assert_eq!(plain.count, 2);
}
