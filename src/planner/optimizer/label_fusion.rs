//! Label filter fusion.
//!
//! An IndexLookupStep validates its label set when emitting bindings.
//! Downstream pattern nodes that re-mention the same variable with the
//! same labels would recheck them against an already-validated binding,
//! so the duplicate label lists are cleared.

use std::collections::HashMap;

use super::OptimizerPass;
use crate::graph::GraphStore;
use crate::planner::plan::{Plan, Step};

pub struct LabelFilterFusion;

fn same_label_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|l| b.contains(l))
}

impl OptimizerPass for LabelFilterFusion {
    fn name(&self) -> &'static str {
        "LabelFilterFusion"
    }

    fn apply(&self, plan: Plan, _graph: &dyn GraphStore) -> Plan {
        let mut enforced: HashMap<String, Vec<String>> = HashMap::new();
        let mut steps = Vec::with_capacity(plan.steps.len());

        for mut step in plan.steps {
            match &mut step {
                Step::IndexLookup(lookup) => {
                    enforced.insert(lookup.variable.clone(), lookup.labels.clone());
                }
                Step::Match(m) => {
                    for pattern in &mut m.patterns {
                        for node in &mut pattern.nodes {
                            let Some(variable) = &node.variable else { continue };
                            if let Some(labels) = enforced.get(variable) {
                                if same_label_set(&node.labels, labels) {
                                    node.labels.clear();
                                }
                            }
                        }
                    }
                }
                Step::OptionalMatch(m) => {
                    for pattern in &mut m.patterns {
                        for node in &mut pattern.nodes {
                            let Some(variable) = &node.variable else { continue };
                            if let Some(labels) = enforced.get(variable) {
                                if same_label_set(&node.labels, labels) {
                                    node.labels.clear();
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
            steps.push(step);
        }

        Plan { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher_parser::parse_query;
    use crate::graph::MemoryGraph;
    use crate::planner::optimizer::IndexLookupPromotion;
    use crate::planner::PlanBuilder;

    #[test]
    fn test_drops_labels_already_enforced_by_lookup() {
        let graph = MemoryGraph::new();
        graph.create_property_index("name");
        let ast = parse_query(
            "MATCH (n:Person) WHERE n.name = 'Alice' OPTIONAL MATCH (n:Person)-[:KNOWS]->(m) RETURN n",
        )
        .unwrap();
        let plan = IndexLookupPromotion.apply(PlanBuilder::build(&ast), &graph);
        let fused = LabelFilterFusion.apply(plan, &graph);

        let optional = fused
            .steps
            .iter()
            .find_map(|s| match s {
                Step::OptionalMatch(m) => Some(m),
                _ => None,
            })
            .unwrap();
        assert!(optional.patterns[0].nodes[0].labels.is_empty());
        // The unrelated variable keeps its (absent) labels untouched.
        assert!(optional.patterns[0].nodes[1].labels.is_empty());
    }

    #[test]
    fn test_different_label_set_is_kept() {
        let graph = MemoryGraph::new();
        graph.create_property_index("name");
        let ast = parse_query(
            "MATCH (n:Person) WHERE n.name = 'Alice' OPTIONAL MATCH (n:Admin)-[:KNOWS]->(m) RETURN n",
        )
        .unwrap();
        let plan = IndexLookupPromotion.apply(PlanBuilder::build(&ast), &graph);
        let fused = LabelFilterFusion.apply(plan, &graph);
        let optional = fused
            .steps
            .iter()
            .find_map(|s| match s {
                Step::OptionalMatch(m) => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(optional.patterns[0].nodes[0].labels, vec!["Admin".to_string()]);
    }
}
