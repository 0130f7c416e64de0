//! Vector-search promotion.
//!
//! A filter conjunct `vector.similarity(var.prop, q) > threshold` over a
//! property the store has a vector index on plants a VectorSearchStep in
//! front of the MatchStep that binds `var`. The step materializes kNN
//! candidates and attaches similarity scores to the binding side-channel;
//! the original predicate stays in the filter because the index may be
//! approximate.

use super::{split_conjuncts, OptimizerPass};
use crate::cypher_parser::ast::{BinaryOp, Expression};
use crate::graph::GraphStore;
use crate::planner::plan::{Plan, Step, VectorSearchStep};
use crate::value::Value;

pub struct VectorSearchPromotion {
    k: usize,
    ef: usize,
}

impl VectorSearchPromotion {
    pub fn new(k: usize, ef: usize) -> Self {
        VectorSearchPromotion { k, ef }
    }
}

struct SimilarityPredicate {
    variable: String,
    property: String,
    query: Expression,
    threshold: f64,
}

fn similarity_predicate(conjunct: &Expression) -> Option<SimilarityPredicate> {
    let Expression::Binary {
        op: BinaryOp::Gt,
        left,
        right,
    } = conjunct
    else {
        return None;
    };
    let Expression::FunctionCall { name, args } = left.as_ref() else {
        return None;
    };
    if name != "vector.similarity" || args.len() != 2 {
        return None;
    }
    let Expression::Property { variable, property } = &args[0] else {
        return None;
    };
    if property.is_empty() {
        return None;
    }
    let threshold = match right.as_ref() {
        Expression::Literal(Value::Float(x)) => *x,
        Expression::Literal(Value::Int(i)) => *i as f64,
        _ => return None,
    };
    Some(SimilarityPredicate {
        variable: variable.clone(),
        property: property.clone(),
        query: args[1].clone(),
        threshold,
    })
}

fn match_binds_variable(step: &Step, variable: &str) -> bool {
    match step {
        Step::Match(m) => m
            .patterns
            .iter()
            .any(|p| p.variables().contains(&variable)),
        _ => false,
    }
}

impl OptimizerPass for VectorSearchPromotion {
    fn name(&self) -> &'static str {
        "VectorSearchPromotion"
    }

    fn apply(&self, plan: Plan, graph: &dyn GraphStore) -> Plan {
        // Idempotence: a plan that already searches the index is final.
        if plan
            .steps
            .iter()
            .any(|s| matches!(s, Step::VectorSearch(_)))
        {
            return plan;
        }

        let predicate = plan.steps.iter().find_map(|step| match step {
            Step::Filter(f) => split_conjuncts(&f.predicate)
                .iter()
                .find_map(similarity_predicate),
            _ => None,
        });
        let Some(predicate) = predicate else {
            return plan;
        };
        if !graph.has_vector_index(&predicate.property) {
            return plan;
        }
        let Some(match_index) = plan
            .steps
            .iter()
            .position(|s| match_binds_variable(s, &predicate.variable))
        else {
            return plan;
        };

        log::debug!(
            "promoting vector.similarity({}.{}) to index search (k={}, ef={})",
            predicate.variable,
            predicate.property,
            self.k,
            self.ef
        );
        let mut steps = plan.steps;
        steps.insert(
            match_index,
            Step::VectorSearch(VectorSearchStep {
                variable: predicate.variable,
                property: predicate.property,
                query: predicate.query,
                k: self.k,
                ef: self.ef,
                threshold: predicate.threshold,
            }),
        );
        Plan { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher_parser::parse_query;
    use crate::graph::MemoryGraph;
    use crate::planner::PlanBuilder;

    fn plan_for(query: &str) -> Plan {
        PlanBuilder::build(&parse_query(query).unwrap())
    }

    const QUERY: &str =
        "MATCH (n:Doc) WHERE vector.similarity(n.embedding, $q) > 0.8 RETURN n";

    #[test]
    fn test_promotes_when_index_exists() {
        let graph = MemoryGraph::new();
        graph.create_vector_index("embedding");
        let optimized = VectorSearchPromotion::new(64, 128).apply(plan_for(QUERY), &graph);
        let names: Vec<&str> = optimized.steps.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["VectorSearchStep", "MatchStep", "FilterStep", "ReturnStep"]
        );
        match &optimized.steps[0] {
            Step::VectorSearch(s) => {
                assert_eq!(s.variable, "n");
                assert_eq!(s.property, "embedding");
                assert_eq!(s.k, 64);
                assert_eq!(s.ef, 128);
                assert!((s.threshold - 0.8).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other.name()),
        }
    }

    #[test]
    fn test_predicate_is_kept_for_post_verification() {
        let graph = MemoryGraph::new();
        graph.create_vector_index("embedding");
        let optimized = VectorSearchPromotion::new(64, 128).apply(plan_for(QUERY), &graph);
        assert!(optimized
            .steps
            .iter()
            .any(|s| matches!(s, Step::Filter(_))));
    }

    #[test]
    fn test_no_index_no_rewrite() {
        let graph = MemoryGraph::new();
        let optimized = VectorSearchPromotion::new(64, 128).apply(plan_for(QUERY), &graph);
        assert_eq!(optimized.steps[0].name(), "MatchStep");
    }

    #[test]
    fn test_idempotent() {
        let graph = MemoryGraph::new();
        graph.create_vector_index("embedding");
        let pass = VectorSearchPromotion::new(64, 128);
        let once = pass.apply(plan_for(QUERY), &graph);
        let twice = pass.apply(once.clone(), &graph);
        assert_eq!(once, twice);
    }
}
