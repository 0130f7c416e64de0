//! Index lookup promotion.
//!
//! A MatchStep over a single bare node pattern, immediately followed by a
//! FilterStep whose conjunction contains `var.prop = literal` on a
//! property the store indexes, is rewritten into an IndexLookupStep. The
//! matched conjunct is consumed; remaining conjuncts stay behind as a
//! smaller FilterStep.

use super::{join_conjuncts, split_conjuncts, OptimizerPass};
use crate::cypher_parser::ast::{BinaryOp, Expression, NodePattern};
use crate::graph::GraphStore;
use crate::planner::plan::{FilterStep, IndexLookupStep, Plan, Step};
use crate::value::Value;

pub struct IndexLookupPromotion;

/// `var.prop = literal` (either operand order) → (prop, literal).
fn indexed_equality<'e>(
    conjunct: &'e Expression,
    variable: &str,
    graph: &dyn GraphStore,
) -> Option<(&'e str, &'e Value)> {
    let Expression::Binary {
        op: BinaryOp::Eq,
        left,
        right,
    } = conjunct
    else {
        return None;
    };
    let extract = |a: &'e Expression, b: &'e Expression| -> Option<(&'e str, &'e Value)> {
        match (a, b) {
            (
                Expression::Property {
                    variable: v,
                    property,
                },
                Expression::Literal(value),
            ) if v == variable && !property.is_empty() => Some((property.as_str(), value)),
            _ => None,
        }
    };
    extract(left, right)
        .or_else(|| extract(right, left))
        .filter(|(property, _)| graph.has_property_index(property))
}

/// Only a bare single-node pattern qualifies: one named node, no
/// relationships, no inline property constraints.
fn promotable_node(step: &Step) -> Option<&NodePattern> {
    let Step::Match(m) = step else { return None };
    if m.patterns.len() != 1 {
        return None;
    }
    let pattern = &m.patterns[0];
    if !pattern.relationships.is_empty() || pattern.nodes.len() != 1 {
        return None;
    }
    let node = &pattern.nodes[0];
    if node.variable.is_none() || !node.properties.is_empty() {
        return None;
    }
    Some(node)
}

impl OptimizerPass for IndexLookupPromotion {
    fn name(&self) -> &'static str {
        "IndexLookupPromotion"
    }

    fn apply(&self, plan: Plan, graph: &dyn GraphStore) -> Plan {
        let mut steps = Vec::with_capacity(plan.steps.len());
        let mut input = plan.steps.into_iter().peekable();

        while let Some(step) = input.next() {
            let Some(node) = promotable_node(&step) else {
                steps.push(step);
                continue;
            };
            let Some(Step::Filter(_)) = input.peek() else {
                steps.push(step);
                continue;
            };

            let variable = node.variable.clone().expect("checked by promotable_node");
            let Some(Step::Filter(filter)) = input.next() else {
                unreachable!("peeked above");
            };

            let mut conjuncts = split_conjuncts(&filter.predicate);
            let hit = conjuncts
                .iter()
                .position(|c| indexed_equality(c, &variable, graph).is_some());
            match hit {
                Some(position) => {
                    let conjunct = conjuncts.remove(position);
                    let (property, value) = indexed_equality(&conjunct, &variable, graph)
                        .expect("position found above");
                    log::debug!(
                        "promoting {}.{} equality to index lookup",
                        variable,
                        property
                    );
                    steps.push(Step::IndexLookup(IndexLookupStep {
                        variable,
                        labels: node.labels.clone(),
                        property: property.to_string(),
                        value: value.clone(),
                    }));
                    if let Some(remaining) = join_conjuncts(conjuncts) {
                        steps.push(Step::Filter(FilterStep {
                            predicate: remaining,
                            strict: filter.strict,
                        }));
                    }
                }
                None => {
                    steps.push(step);
                    steps.push(Step::Filter(filter));
                }
            }
        }

        Plan { steps }
    }
}
