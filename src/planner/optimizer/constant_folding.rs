//! Constant folding.
//!
//! Fully-literal sub-expressions are evaluated once at plan time.
//! Function calls are never folded (they may read the clock or depend on
//! registration), and expressions whose evaluation errors are left in
//! place so the error surfaces at execution with its usual semantics.

use super::OptimizerPass;
use crate::binding::BindingSet;
use crate::cypher_parser::ast::{CaseExpression, Expression};
use crate::evaluator::Evaluator;
use crate::functions::FunctionRegistry;
use crate::graph::GraphStore;
use crate::planner::plan::{Plan, Step};

pub struct ConstantFolding;

fn is_constant(expr: &Expression) -> bool {
    match expr {
        Expression::Literal(_) => true,
        Expression::Parameter(_)
        | Expression::Property { .. }
        | Expression::FunctionCall { .. } => false,
        Expression::List(items) => items.iter().all(is_constant),
        Expression::Binary { left, right, .. } | Expression::Arithmetic { left, right, .. } => {
            is_constant(left) && is_constant(right)
        }
        Expression::Unary { operand, .. } => is_constant(operand),
        Expression::Case(case) => {
            case.operand.as_deref().map(is_constant).unwrap_or(true)
                && case
                    .when_then
                    .iter()
                    .all(|(w, t)| is_constant(w) && is_constant(t))
                && case.else_expr.as_deref().map(is_constant).unwrap_or(true)
        }
    }
}

fn fold(expr: &Expression, evaluator: &Evaluator, empty: &BindingSet) -> Expression {
    if !matches!(expr, Expression::Literal(_) | Expression::List(_)) && is_constant(expr) {
        if let Ok(value) = evaluator.eval_value(expr, empty) {
            return Expression::Literal(value);
        }
        return expr.clone();
    }
    match expr {
        Expression::Binary { op, left, right } => Expression::Binary {
            op: *op,
            left: Box::new(fold(left, evaluator, empty)),
            right: Box::new(fold(right, evaluator, empty)),
        },
        Expression::Arithmetic { op, left, right } => Expression::Arithmetic {
            op: *op,
            left: Box::new(fold(left, evaluator, empty)),
            right: Box::new(fold(right, evaluator, empty)),
        },
        Expression::Unary { op, operand } => Expression::Unary {
            op: *op,
            operand: Box::new(fold(operand, evaluator, empty)),
        },
        Expression::List(items) => {
            Expression::List(items.iter().map(|i| fold(i, evaluator, empty)).collect())
        }
        Expression::FunctionCall { name, args } => Expression::FunctionCall {
            name: name.clone(),
            args: args.iter().map(|a| fold(a, evaluator, empty)).collect(),
        },
        Expression::Case(case) => Expression::Case(CaseExpression {
            operand: case
                .operand
                .as_ref()
                .map(|o| Box::new(fold(o, evaluator, empty))),
            when_then: case
                .when_then
                .iter()
                .map(|(w, t)| (fold(w, evaluator, empty), fold(t, evaluator, empty)))
                .collect(),
            else_expr: case
                .else_expr
                .as_ref()
                .map(|e| Box::new(fold(e, evaluator, empty))),
        }),
        other => other.clone(),
    }
}

impl OptimizerPass for ConstantFolding {
    fn name(&self) -> &'static str {
        "ConstantFolding"
    }

    fn apply(&self, plan: Plan, _graph: &dyn GraphStore) -> Plan {
        // Constant expressions never reach a function, so a throwaway
        // registry satisfies the evaluator.
        let registry = FunctionRegistry::new();
        let evaluator = Evaluator::new(&registry);
        let empty = BindingSet::new();
        let f = |e: &Expression| fold(e, &evaluator, &empty);

        let steps = plan
            .steps
            .into_iter()
            .map(|step| match step {
                Step::Filter(mut s) => {
                    s.predicate = f(&s.predicate);
                    Step::Filter(s)
                }
                Step::OptionalMatch(mut s) => {
                    if let Some(filter) = &mut s.filter {
                        filter.predicate = f(&filter.predicate);
                    }
                    Step::OptionalMatch(s)
                }
                Step::Unwind(mut s) => {
                    s.expression = f(&s.expression);
                    Step::Unwind(s)
                }
                Step::Set(mut s) => {
                    for item in &mut s.items {
                        item.value = f(&item.value);
                    }
                    Step::Set(s)
                }
                Step::VectorSearch(mut s) => {
                    s.query = f(&s.query);
                    Step::VectorSearch(s)
                }
                other => other,
            })
            .collect();
        Plan { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher_parser::parse_query;
    use crate::graph::MemoryGraph;
    use crate::planner::PlanBuilder;
    use crate::value::Value;

    fn folded_filter(query: &str) -> Expression {
        let graph = MemoryGraph::new();
        let plan = PlanBuilder::build(&parse_query(query).unwrap());
        let optimized = ConstantFolding.apply(plan, &graph);
        optimized
            .steps
            .iter()
            .find_map(|s| match s {
                Step::Filter(f) => Some(f.predicate.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_folds_literal_arithmetic() {
        let expr = folded_filter("MATCH (n) WHERE n.age > 2 * 10 + 5 RETURN n");
        match expr {
            Expression::Binary { right, .. } => {
                assert_eq!(*right, Expression::Literal(Value::Int(25)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_leaves_nonconstant_subtrees() {
        let expr = folded_filter("MATCH (n) WHERE n.age + 1 > 5 RETURN n");
        match expr {
            Expression::Binary { left, .. } => {
                assert!(matches!(*left, Expression::Arithmetic { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_division_by_zero_is_left_for_runtime() {
        let expr = folded_filter("MATCH (n) WHERE n.age > 1 / 0 RETURN n");
        match expr {
            Expression::Binary { right, .. } => {
                assert!(matches!(*right, Expression::Arithmetic { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_folds_inside_function_arguments() {
        let graph = MemoryGraph::new();
        let plan = PlanBuilder::build(
            &parse_query("MATCH (n) WHERE toUpper('a' + 'b') = n.name RETURN n").unwrap(),
        );
        let optimized = ConstantFolding.apply(plan, &graph);
        let Some(Step::Filter(f)) = optimized.steps.iter().find(|s| matches!(s, Step::Filter(_)))
        else {
            panic!("no filter step");
        };
        let Expression::Binary { left, .. } = &f.predicate else {
            panic!("unexpected shape");
        };
        let Expression::FunctionCall { args, .. } = left.as_ref() else {
            panic!("expected function call");
        };
        assert_eq!(args[0], Expression::Literal(Value::String("ab".into())));
    }
}
