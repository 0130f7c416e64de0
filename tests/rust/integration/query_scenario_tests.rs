//! End-to-end query scenarios over the people graph.

use std::collections::HashMap;

use quiver::{BindingValue, GraphStore, ResultSet, Value};

use crate::{executor, people_graph};

fn column_values(result: &ResultSet, column: &str) -> Vec<Value> {
    result
        .rows
        .iter()
        .map(|row| row.get(column).map(BindingValue::as_value).unwrap_or(Value::Null))
        .collect()
}

fn strings(values: Vec<Value>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            Value::Null => "<null>".to_string(),
            other => other.to_string(),
        })
        .collect()
}

#[test]
fn test_match_where_order_by() {
    let exec = executor();
    let result = exec
        .execute("MATCH (n:Person) WHERE n.age > 25 RETURN n.name ORDER BY n.age")
        .unwrap();
    assert_eq!(result.columns, vec!["n.name".to_string()]);
    assert_eq!(
        strings(column_values(&result, "n.name")),
        vec!["Alice".to_string(), "Charlie".to_string()]
    );
}

#[test]
fn test_group_by_aggregation() {
    let exec = executor();
    let result = exec
        .execute(
            "MATCH (n:Person) RETURN n.dept, COUNT(n) AS c, AVG(n.salary) AS avg GROUP BY n.dept",
        )
        .unwrap();
    assert_eq!(result.count, 2);

    let mut by_dept: HashMap<String, (Value, Value)> = HashMap::new();
    for row in &result.rows {
        let dept = match row.get("n.dept").map(BindingValue::as_value) {
            Some(Value::String(s)) => s,
            other => panic!("unexpected dept {:?}", other),
        };
        by_dept.insert(
            dept,
            (
                row.get("c").unwrap().as_value(),
                row.get("avg").unwrap().as_value(),
            ),
        );
    }
    assert_eq!(by_dept["Eng"], (Value::Int(2), Value::Float(85_000.0)));
    assert_eq!(by_dept["Sales"], (Value::Int(1), Value::Float(60_000.0)));
}

#[test]
fn test_optional_match_pads_with_null() {
    let exec = executor();
    let result = exec
        .execute("MATCH (a:Person) OPTIONAL MATCH (a)-[:KNOWS]->(b) RETURN a.name, b.name")
        .unwrap();
    assert_eq!(result.count, 4);
    let mut pairs: Vec<(String, String)> = result
        .rows
        .iter()
        .map(|row| {
            let a = strings(vec![row.get("a.name").unwrap().as_value()]).remove(0);
            let b = strings(vec![row.get("b.name").unwrap().as_value()]).remove(0);
            (a, b)
        })
        .collect();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("Alice".to_string(), "Bob".to_string()),
            ("Alice".to_string(), "Charlie".to_string()),
            ("Bob".to_string(), "<null>".to_string()),
            ("Charlie".to_string(), "<null>".to_string()),
        ]
    );
}

#[test]
fn test_parameter_binding_and_injection_safety() {
    let exec = executor();
    let mut params = HashMap::new();
    params.insert("name".to_string(), Value::String("Alice".to_string()));
    let result = exec
        .execute_with_params("MATCH (n:Person {name: $name}) RETURN n.age", &params)
        .unwrap();
    assert_eq!(result.count, 1);
    assert_eq!(column_values(&result, "n.age"), vec![Value::Int(30)]);

    // A hostile parameter value stays a literal.
    let mut params = HashMap::new();
    params.insert(
        "name".to_string(),
        Value::String("\" OR 1=1 RETURN n --".to_string()),
    );
    let result = exec
        .execute_with_params("MATCH (n:Person {name: $name}) RETURN n.age", &params)
        .unwrap();
    assert_eq!(result.count, 0);
}

#[test]
fn test_missing_parameter_is_reported() {
    let exec = executor();
    let err = exec
        .execute("MATCH (n:Person {name: $name}) RETURN n.age")
        .unwrap_err();
    assert!(err.to_string().contains("missing parameter"), "{}", err);
}

#[test]
fn test_case_expression_tiers() {
    let exec = executor();
    let result = exec
        .execute(
            "MATCH (n:Person) RETURN CASE WHEN n.age > 30 THEN 'senior' ELSE 'junior' END AS tier \
             ORDER BY n.age",
        )
        .unwrap();
    assert_eq!(
        strings(column_values(&result, "tier")),
        vec!["junior".to_string(), "junior".to_string(), "senior".to_string()]
    );
}

#[test]
fn test_explain_lists_steps_in_order() {
    let exec = executor();
    let result = exec
        .execute("EXPLAIN MATCH (n:Person) WHERE n.age>25 RETURN n.name")
        .unwrap();
    assert_eq!(
        result.columns,
        vec!["step".to_string(), "detail".to_string()]
    );
    let steps = strings(column_values(&result, "step"));
    let match_pos = steps.iter().position(|s| s == "MatchStep").unwrap();
    let filter_pos = steps.iter().position(|s| s == "FilterStep").unwrap();
    let return_pos = steps.iter().position(|s| s == "ReturnStep").unwrap();
    assert!(match_pos < filter_pos && filter_pos < return_pos);
}

#[test]
fn test_relationship_match() {
    let exec = executor();
    let result = exec
        .execute("MATCH (a:Person)-[:KNOWS]->(b:Person) RETURN b.name ORDER BY b.name")
        .unwrap();
    assert_eq!(
        strings(column_values(&result, "b.name")),
        vec!["Bob".to_string(), "Charlie".to_string()]
    );
}

#[test]
fn test_incoming_and_undirected_match() {
    let exec = executor();
    let incoming = exec
        .execute("MATCH (b)<-[:KNOWS]-(a) RETURN b.name ORDER BY b.name")
        .unwrap();
    assert_eq!(
        strings(column_values(&incoming, "b.name")),
        vec!["Bob".to_string(), "Charlie".to_string()]
    );

    let undirected = exec
        .execute("MATCH (a {name: 'Bob'})-[:KNOWS]-(b) RETURN b.name")
        .unwrap();
    assert_eq!(
        strings(column_values(&undirected, "b.name")),
        vec!["Alice".to_string()]
    );
}

#[test]
fn test_variable_length_path() {
    let graph = people_graph();
    // Extend the chain: Charlie KNOWS Bob, so Alice reaches Bob two ways.
    graph.create_edge(3, 2, "KNOWS", HashMap::new(), 1.0).unwrap();
    let exec = quiver::Executor::new(graph);
    let result = exec
        .execute(
            "MATCH (a:Person {name: 'Alice'})-[:KNOWS*1..2]->(b) RETURN b.name ORDER BY b.name",
        )
        .unwrap();
    assert_eq!(
        strings(column_values(&result, "b.name")),
        vec!["Bob".to_string(), "Bob".to_string(), "Charlie".to_string()]
    );
}

#[test]
fn test_create_set_delete_roundtrip() {
    let exec = executor();
    exec.execute("CREATE (n:Person {name: 'Dave', age: 40, dept: 'Ops', salary: 70000})")
        .unwrap();
    let result = exec
        .execute("MATCH (n:Person {name: 'Dave'}) RETURN n.age")
        .unwrap();
    assert_eq!(column_values(&result, "n.age"), vec![Value::Int(40)]);

    exec.execute("MATCH (n:Person {name: 'Dave'}) SET n.age = 41")
        .unwrap();
    let result = exec
        .execute("MATCH (n:Person {name: 'Dave'}) RETURN n.age")
        .unwrap();
    assert_eq!(column_values(&result, "n.age"), vec![Value::Int(41)]);

    exec.execute("MATCH (n:Person {name: 'Dave'}) DETACH DELETE n")
        .unwrap();
    let result = exec
        .execute("MATCH (n:Person {name: 'Dave'}) RETURN n.age")
        .unwrap();
    assert_eq!(result.count, 0);
}

#[test]
fn test_create_relationship_between_matched_nodes() {
    let exec = executor();
    exec.execute("MATCH (a:Person {name: 'Bob'}) CREATE (a)-[:KNOWS]->(c:Person {name: 'Eve'})")
        .unwrap();
    let result = exec
        .execute("MATCH (a:Person {name: 'Bob'})-[:KNOWS]->(b) RETURN b.name")
        .unwrap();
    assert_eq!(
        strings(column_values(&result, "b.name")),
        vec!["Eve".to_string()]
    );
}

#[test]
fn test_merge_matches_then_creates() {
    let exec = executor();
    // Existing node: ON MATCH fires.
    exec.execute("MERGE (n:Person {name: 'Alice'}) ON MATCH SET n.seen = 1 ON CREATE SET n.created = 1")
        .unwrap();
    let result = exec
        .execute("MATCH (n:Person {name: 'Alice'}) RETURN n.seen, n.created")
        .unwrap();
    assert_eq!(column_values(&result, "n.seen"), vec![Value::Int(1)]);
    assert_eq!(column_values(&result, "n.created"), vec![Value::Null]);

    // Unknown node: created with ON CREATE applied.
    exec.execute("MERGE (n:Person {name: 'Zed'}) ON MATCH SET n.seen = 1 ON CREATE SET n.created = 1")
        .unwrap();
    let result = exec
        .execute("MATCH (n:Person {name: 'Zed'}) RETURN n.created")
        .unwrap();
    assert_eq!(column_values(&result, "n.created"), vec![Value::Int(1)]);
}

#[test]
fn test_unwind() {
    let exec = executor();
    let result = exec.execute("UNWIND [1, 2, 3] AS x RETURN x").unwrap();
    assert_eq!(
        column_values(&result, "x"),
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[test]
fn test_with_chaining_filters_intermediate_rows() {
    let exec = executor();
    let result = exec
        .execute(
            "MATCH (n:Person) WITH n.name AS name, n.age AS age WHERE age > 25 \
             RETURN name ORDER BY name",
        )
        .unwrap();
    assert_eq!(
        strings(column_values(&result, "name")),
        vec!["Alice".to_string(), "Charlie".to_string()]
    );
}

#[test]
fn test_union_and_union_all() {
    let exec = executor();
    let distinct = exec
        .execute("MATCH (n:Person {name: 'Alice'}) RETURN n.name UNION MATCH (m:Person {name: 'Alice'}) RETURN m.name")
        .unwrap();
    // The left side names the columns; the right side's rows remap onto
    // them, so the duplicate Alice row collapses.
    assert_eq!(distinct.count, 1);
    assert_eq!(distinct.columns, vec!["n.name".to_string()]);

    let all = exec
        .execute("MATCH (n:Person) RETURN n.name UNION ALL MATCH (m:Person) RETURN m.name")
        .unwrap();
    assert_eq!(all.count, 6);
}

#[test]
fn test_distinct_skip_limit() {
    let exec = executor();
    let result = exec
        .execute("MATCH (n:Person) RETURN DISTINCT n.dept ORDER BY n.dept")
        .unwrap();
    assert_eq!(
        strings(column_values(&result, "n.dept")),
        vec!["Eng".to_string(), "Sales".to_string()]
    );

    let result = exec
        .execute("MATCH (n:Person) RETURN n.name ORDER BY n.name SKIP 1 LIMIT 1")
        .unwrap();
    assert_eq!(
        strings(column_values(&result, "n.name")),
        vec!["Bob".to_string()]
    );
}

#[test]
fn test_remove_property() {
    let exec = executor();
    exec.execute("MATCH (n:Person {name: 'Bob'}) REMOVE n.salary")
        .unwrap();
    let result = exec
        .execute("MATCH (n:Person {name: 'Bob'}) RETURN n.salary")
        .unwrap();
    assert_eq!(column_values(&result, "n.salary"), vec![Value::Null]);
}

#[test]
fn test_remove_label() {
    let exec = executor();
    exec.execute("MATCH (n:Person {name: 'Bob'}) REMOVE n:Person")
        .unwrap();
    let result = exec.execute("MATCH (n:Person) RETURN n.name").unwrap();
    assert_eq!(result.count, 2);
}

#[test]
fn test_sanitizer_rejects_misuse() {
    let exec = executor();
    assert!(exec.execute("").is_err());
    assert!(exec.execute("<script>alert(1)</script>").is_err());
    assert!(exec
        .execute("MATCH (n) RETURN n UNION SELECT password")
        .is_err());
}

#[test]
fn test_lenient_filter_drops_bad_rows() {
    let exec = executor();
    // n.name + 1 is a type mismatch for every row; lenient mode drops
    // them all instead of failing the query.
    let result = exec
        .execute("MATCH (n:Person) WHERE n.name + 1 = 2 RETURN n.name")
        .unwrap();
    assert_eq!(result.count, 0);
}

#[test]
fn test_count_star() {
    let exec = executor();
    let result = exec.execute("MATCH (n:Person) RETURN COUNT(*)").unwrap();
    assert_eq!(result.columns, vec!["COUNT(*)".to_string()]);
    assert_eq!(column_values(&result, "COUNT(*)"), vec![Value::Int(3)]);
}

#[test]
fn test_collect_preserves_order() {
    let exec = executor();
    let result = exec
        .execute("MATCH (n:Person) RETURN COLLECT(n.name) AS names")
        .unwrap();
    match result.rows[0].get("names").unwrap() {
        BindingValue::List(items) => {
            let names: Vec<Value> = items.iter().map(BindingValue::as_value).collect();
            assert_eq!(
                names,
                vec![
                    Value::String("Alice".to_string()),
                    Value::String("Bob".to_string()),
                    Value::String("Charlie".to_string()),
                ]
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}
