//! End-to-end tests: the executor facade with profiling, caching,
//! collaborator registration and resource guards.

use std::collections::HashMap;
use std::sync::Arc;

use quiver::evaluator::errors::EvalError;
use quiver::functions::ScalarFunction;
use quiver::graph::StoreError;
use quiver::{
    BindingValue, Direction, EngineConfig, Executor, GraphStore, MemoryGraph, Node, SearchIndex,
    TraversalOptions, Value, VectorProvider,
};

fn people() -> Arc<MemoryGraph> {
    let graph = Arc::new(MemoryGraph::new());
    for (name, age) in [("Alice", 30), ("Bob", 25), ("Charlie", 35)] {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), Value::String(name.to_string()));
        properties.insert("age".to_string(), Value::Int(age));
        properties.insert(
            "bio".to_string(),
            Value::String(format!("{} writes graph engines", name)),
        );
        graph
            .create_node(vec!["Person".to_string()], properties)
            .unwrap();
    }
    graph.create_edge(1, 2, "KNOWS", HashMap::new(), 1.0).unwrap();
    graph.create_edge(1, 3, "KNOWS", HashMap::new(), 1.0).unwrap();
    graph
}

fn cell(result: &quiver::ResultSet, index: usize, column: &str) -> Value {
    result
        .cell(index, column)
        .map(BindingValue::as_value)
        .unwrap_or(Value::Null)
}

#[test]
fn test_profile_attaches_step_timeline() {
    let exec = Executor::new(people());
    let result = exec
        .execute("PROFILE MATCH (n:Person) WHERE n.age > 25 RETURN n.name")
        .unwrap();
    assert_eq!(result.count, 2);
    let profile = result.profile.expect("PROFILE attaches a timeline");
    let steps: Vec<&str> = profile.iter().map(|p| p.step.as_str()).collect();
    assert_eq!(steps, vec!["MatchStep", "FilterStep", "ReturnStep"]);
    // The filter saw three rows and kept two.
    assert_eq!(profile[1].rows_in, 3);
    assert_eq!(profile[1].rows_out, 2);
}

#[test]
fn test_explain_does_not_execute() {
    let graph = people();
    let exec = Executor::new(Arc::clone(&graph) as Arc<dyn GraphStore>);
    let before = graph.get_statistics().node_count;
    let result = exec.execute("EXPLAIN CREATE (n:Person {name: 'X'})").unwrap();
    assert_eq!(graph.get_statistics().node_count, before);
    assert!(result
        .rows
        .iter()
        .any(|row| matches!(row.get("step").map(BindingValue::as_value), Some(Value::String(s)) if s == "CreateStep")));
}

#[test]
fn test_plan_cache_hits_on_repeat() {
    let exec = Executor::new(people());
    let query = "MATCH (n:Person)   RETURN n.name";
    exec.execute(query).unwrap();
    // Different whitespace, same normalized key.
    exec.execute("MATCH (n:Person) RETURN n.name").unwrap();
    let metrics = exec.plan_cache_metrics();
    assert_eq!(metrics.size, 1);
    assert!(metrics.hits >= 1, "{:?}", metrics);
}

#[test]
fn test_cached_plan_reexecutes_with_fresh_parameters() {
    let exec = Executor::new(people());
    let query = "MATCH (n:Person {name: $name}) RETURN n.age";
    let mut params = HashMap::new();
    params.insert("name".to_string(), Value::String("Alice".to_string()));
    let first = exec.execute_with_params(query, &params).unwrap();
    assert_eq!(cell(&first, 0, "n.age"), Value::Int(30));

    params.insert("name".to_string(), Value::String("Bob".to_string()));
    let second = exec.execute_with_params(query, &params).unwrap();
    assert_eq!(cell(&second, 0, "n.age"), Value::Int(25));
}

#[test]
fn test_cartesian_guard_trips() {
    let config = EngineConfig {
        max_cartesian_product_results: 4,
        ..Default::default()
    };
    let exec = Executor::with_config(people(), config);
    let err = exec
        .execute("MATCH (a:Person), (b:Person), (c:Person) RETURN COUNT(*)")
        .unwrap_err();
    assert!(err.to_string().contains("cartesian"), "{}", err);
}

#[test]
fn test_custom_scalar_function() {
    let exec = Executor::new(people());
    let double: ScalarFunction = Arc::new(|args| match args {
        [Value::Int(i)] => Ok(Value::Int(i * 2)),
        _ => Err(EvalError::InvalidArgument("double() takes one Int".into())),
    });
    exec.functions().register("double", double);
    let result = exec
        .execute("MATCH (n:Person {name: 'Bob'}) RETURN double(n.age) AS d")
        .unwrap();
    assert_eq!(cell(&result, 0, "d"), Value::Int(50));
}

#[test]
fn test_unknown_function_surfaces() {
    let exec = Executor::new(people());
    let err = exec
        .execute("MATCH (n:Person) RETURN mystery(n.age) AS x")
        .unwrap_err();
    assert!(err.to_string().contains("unknown function"), "{}", err);
}

struct StaticIndex;
impl SearchIndex for StaticIndex {}

#[test]
fn test_search_function_requires_registration() {
    let exec = Executor::new(people());
    assert!(!exec.has_search_index());
    assert!(exec
        .execute("MATCH (n:Person) WHERE search(n.bio, 'graph engines') > 0.5 RETURN n.name")
        .unwrap()
        .rows
        .is_empty());

    exec.set_search_index(Arc::new(StaticIndex));
    assert!(exec.has_search_index());
    let result = exec
        .execute("MATCH (n:Person) WHERE search(n.bio, 'graph engines') > 0.5 RETURN n.name")
        .unwrap();
    assert_eq!(result.count, 3);
}

/// Provider that inverts the store's scoring so routing is observable.
struct EchoProvider {
    graph: Arc<MemoryGraph>,
}

impl VectorProvider for EchoProvider {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        if a == b {
            1.0
        } else {
            0.0
        }
    }

    fn has_index(&self, property: &str) -> bool {
        property == "embedding"
    }

    fn search(
        &self,
        _property: &str,
        _query: &[f32],
        _k: usize,
        _ef: usize,
    ) -> Result<Vec<(u64, f64)>, StoreError> {
        Ok(vec![(1, 0.0)])
    }

    fn get_node(&self, id: u64) -> Result<Node, StoreError> {
        self.graph.get_node(id)
    }
}

#[test]
fn test_vector_provider_hooks_route_similarity() {
    let graph = people();
    let exec = Executor::new(Arc::clone(&graph) as Arc<dyn GraphStore>);
    exec.set_vector_search(Arc::new(EchoProvider {
        graph: Arc::clone(&graph),
    }));
    let mut params = HashMap::new();
    params.insert("q".to_string(), Value::Vector(vec![1.0, 2.0]));
    let result = exec
        .execute_with_params(
            "MATCH (n:Person {name: 'Alice'}) RETURN vector.similarity($q, $q) AS s",
            &params,
        )
        .unwrap();
    assert_eq!(cell(&result, 0, "s"), Value::Float(1.0));
}

#[test]
fn test_similarity_score_projection() {
    let graph = Arc::new(MemoryGraph::new());
    graph.create_vector_index("embedding");
    for v in [vec![1.0f32, 0.0], vec![0.0, 1.0]] {
        let mut properties = HashMap::new();
        properties.insert("embedding".to_string(), Value::Vector(v));
        graph.create_node(vec!["Doc".to_string()], properties).unwrap();
    }
    let exec = Executor::new(graph);
    let mut params = HashMap::new();
    params.insert("q".to_string(), Value::Vector(vec![1.0, 0.0]));
    let result = exec
        .execute_with_params(
            "MATCH (n:Doc) WHERE vector.similarity(n.embedding, $q) > 0.9 \
             RETURN n.similarity_score AS score",
            &params,
        )
        .unwrap();
    assert_eq!(result.count, 1);
    match cell(&result, 0, "score") {
        Value::Float(score) => assert!(score > 0.9, "{}", score),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_traverser_through_executor() {
    let exec = Executor::new(people());
    let traverser = exec.traverser();
    let mut options = TraversalOptions::new(1);
    options.direction = Direction::Outgoing;
    let result = traverser.bfs(&options).unwrap();
    assert_eq!(result.nodes.len(), 3);

    let path = traverser.find_shortest_path(1, 3, &[], None).unwrap();
    assert_eq!(path.hops(), 1);
}

#[test]
fn test_result_set_serializes_to_json() -> anyhow::Result<()> {
    let exec = Executor::new(people());
    let result = exec.execute("MATCH (n:Person {name: 'Alice'}) RETURN n.name, n.age")?;
    let json = serde_json::to_value(&result)?;
    assert_eq!(json["count"], 1);
    assert_eq!(json["rows"][0]["n.name"], serde_json::json!({"String": "Alice"}));
    assert_eq!(json["rows"][0]["n.age"], serde_json::json!({"Int": 30}));
    Ok(())
}
