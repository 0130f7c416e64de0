//! Parser totality: any byte sequence either parses or returns a
//! positioned error, never a panic.

use proptest::prelude::*;
use quiver::cypher_parser::{parse_query, errors::ParserError};

/// Malformed queries must fail gracefully, not panic.
#[test]
fn test_malformed_queries_no_panic() {
    let malformed_queries = vec![
        "",
        "MATCH",
        "MATCH (",
        "MATCH )",
        "MATCH (n",
        "MATCH n)",
        "MATCH (n-",
        "MATCH (n)-[",
        "MATCH (n)-[]",
        "MATCH (n)-[]-",
        "RETURN",
        "WHERE",
        "SET",
        "DELETE",
        "MERGE",
        "UNWIND",
        "UNWIND [1,2]",
        "WITH",
        "MATCH (n) RETURN n WHERE",
        "MATCH (n) BANANA n",
        "MATCH (n) RETURN n EXTRA",
        "MATCH (n) WHERE (n.a RETURN n",
        "MATCH (n) RETURN n ORDER",
        "MATCH (n) RETURN n GROUP",
        "CASE WHEN END",
        "MATCH (a)-[:*]->(b) RETURN a",
        "MATCH (a)<-[:X]->(b) RETURN a",
        "RETURN 'unterminated",
        "RETURN $",
        "RETURN $1",
        "RETURN 99999999999999999999999",
    ];

    for query in malformed_queries {
        let result = parse_query(query);
        assert!(result.is_err(), "expected error for {:?}", query);
    }
}

/// Valid queries across the whole clause surface.
#[test]
fn test_valid_queries_parse() {
    let valid_queries = vec![
        "MATCH (n) RETURN n",
        "MATCH (n:User) RETURN n.name",
        "MATCH (n)-[:FOLLOWS]->(m) RETURN n, m",
        "MATCH (n)-[r]->(m) RETURN r",
        "MATCH (a)-[:KNOWS*1..3]->(b) RETURN b",
        "MATCH (n) WHERE n.age > 25 RETURN n",
        "MATCH (n) WHERE n.name STARTS WITH 'A' AND NOT n.banned RETURN n",
        "MATCH (n) RETURN n LIMIT 10",
        "MATCH (n) RETURN n ORDER BY n.name DESC SKIP 2 LIMIT 3",
        "MATCH (n) RETURN n.name AS name",
        "MATCH (n) RETURN DISTINCT n.dept",
        "MATCH (n) RETURN COUNT(*)",
        "MATCH (n) RETURN n.dept, AVG(n.salary) GROUP BY n.dept",
        "MATCH (n) WITH n.name AS name WHERE name != '' RETURN name",
        "MATCH (n) RETURN n.name UNION ALL MATCH (m) RETURN m.name",
        "OPTIONAL MATCH (a)-[:X]->(b) RETURN b",
        "CREATE (n:Person {name: 'Ada', age: 36})",
        "CREATE (a:X)-[:REL {weight: 2.5}]->(b:Y)",
        "MERGE (n:Person {name: 'Ada'}) ON CREATE SET n.created = 1",
        "MATCH (n) SET n.seen = true",
        "MATCH (n) REMOVE n.stale",
        "MATCH (n) REMOVE n:Temp",
        "MATCH (n) DETACH DELETE n",
        "UNWIND [1, 2, 3] AS x RETURN x",
        "EXPLAIN MATCH (n) RETURN n",
        "PROFILE MATCH (n) RETURN n",
        "MATCH (n) WHERE n.age IN [25, 30] RETURN n",
        "MATCH (n) RETURN CASE WHEN n.age > 30 THEN 'senior' ELSE 'junior' END AS tier",
        "MATCH (n) WHERE vector.similarity(n.embedding, $q) > 0.8 RETURN n",
        "MATCH (n) RETURN n;",
        "match (n) where n.x = 1 return n",
    ];

    for query in valid_queries {
        let result = parse_query(query);
        assert!(result.is_ok(), "failed to parse {:?}: {:?}", query, result);
    }
}

/// Every parse failure carries a position.
#[test]
fn test_errors_are_positioned() {
    for query in ["MATCH (n RETURN n", "RETURN 'oops", "MATCH (n) %%"] {
        match parse_query(query) {
            Err(ParserError::Parse(e)) => assert!(e.line >= 1 && e.column >= 1),
            Err(ParserError::Lexical(e)) => assert!(e.line >= 1 && e.column >= 1),
            Ok(_) => panic!("expected error for {:?}", query),
        }
    }
}

proptest! {
    /// Arbitrary bytes never panic the lexer or parser.
    #[test]
    fn prop_parser_is_total_over_arbitrary_input(input in any::<Vec<u8>>()) {
        let text = String::from_utf8_lossy(&input);
        let _ = parse_query(&text);
    }

    /// Grammar-shaped fragments stitched together never panic either; this
    /// reaches much deeper into the parser than raw bytes do.
    #[test]
    fn prop_parser_is_total_over_fragment_soup(
        fragments in proptest::collection::vec(
            prop_oneof![
                Just("MATCH"), Just("OPTIONAL"), Just("WHERE"), Just("RETURN"),
                Just("WITH"), Just("UNION"), Just("CREATE"), Just("MERGE"),
                Just("SET"), Just("DELETE"), Just("UNWIND"), Just("AS"),
                Just("("), Just(")"), Just("["), Just("]"), Just("{"), Just("}"),
                Just("-"), Just("->"), Just("<-"), Just(":"), Just(","), Just("."),
                Just("*"), Just(".."), Just("n"), Just("m"), Just("Person"),
                Just("KNOWS"), Just("name"), Just("'x'"), Just("1"), Just("1.5"),
                Just("$p"), Just("="), Just(">"), Just("AND"), Just("NOT"),
                Just("COUNT"), Just("CASE"), Just("WHEN"), Just("THEN"), Just("END"),
            ],
            0..24,
        )
    ) {
        let text = fragments.join(" ");
        let _ = parse_query(&text);
    }
}
