//! Property tests for value comparison and evaluator laws.

use proptest::prelude::*;
use quiver::binding::{BindingSet, BindingValue};
use quiver::cypher_parser::ast::{ArithmeticOp, Expression};
use quiver::evaluator::{coerce_to_bool, Evaluator};
use quiver::functions::FunctionRegistry;
use quiver::value::Value;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        ".{0,12}".prop_map(Value::String),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Timestamp),
        Just(Value::Null),
    ]
}

fn arithmetic(op: ArithmeticOp, left: Value, right: Value) -> Expression {
    Expression::Arithmetic {
        op,
        left: Box::new(Expression::Literal(left)),
        right: Box::new(Expression::Literal(right)),
    }
}

proptest! {
    /// Total comparison is symmetric: compare(a, b) == compare(b, a)
    /// reversed.
    #[test]
    fn prop_cmp_total_symmetry(a in arb_value(), b in arb_value()) {
        prop_assert_eq!(a.cmp_total(&b), b.cmp_total(&a).reverse());
    }

    /// eval_bool agrees with coercing the eval result.
    #[test]
    fn prop_eval_bool_is_coerced_eval(v in arb_value()) {
        let registry = FunctionRegistry::new();
        let evaluator = Evaluator::new(&registry);
        let expr = Expression::Literal(v);
        let bindings = BindingSet::new();
        let direct = evaluator.eval_bool(&expr, &bindings).unwrap();
        let coerced = coerce_to_bool(&evaluator.eval(&expr, &bindings).unwrap());
        prop_assert_eq!(direct, coerced);
    }

    /// Int arithmetic round-trips: (x / y) * y + (x % y) == x for y != 0.
    #[test]
    fn prop_int_division_identity(x in any::<i64>(), y in any::<i64>().prop_filter("nonzero", |y| *y != 0)) {
        let registry = FunctionRegistry::new();
        let evaluator = Evaluator::new(&registry);
        let bindings = BindingSet::new();

        let div = evaluator
            .eval_value(&arithmetic(ArithmeticOp::Divide, Value::Int(x), Value::Int(y)), &bindings)
            .unwrap();
        let rem = evaluator
            .eval_value(&arithmetic(ArithmeticOp::Modulo, Value::Int(x), Value::Int(y)), &bindings)
            .unwrap();
        let (Value::Int(q), Value::Int(r)) = (div, rem) else {
            return Err(TestCaseError::fail("expected Int results"));
        };
        prop_assert_eq!(q.wrapping_mul(y).wrapping_add(r), x);
    }

    /// Null on either side of any arithmetic operator yields Null.
    #[test]
    fn prop_null_propagates_through_arithmetic(
        v in arb_value(),
        op in prop_oneof![
            Just(ArithmeticOp::Add),
            Just(ArithmeticOp::Subtract),
            Just(ArithmeticOp::Multiply),
            Just(ArithmeticOp::Divide),
            Just(ArithmeticOp::Modulo),
        ],
        null_on_left in any::<bool>(),
    ) {
        let registry = FunctionRegistry::new();
        let evaluator = Evaluator::new(&registry);
        let bindings = BindingSet::new();
        let expr = if null_on_left {
            arithmetic(op, Value::Null, v)
        } else {
            arithmetic(op, v, Value::Null)
        };
        prop_assert_eq!(evaluator.eval_value(&expr, &bindings).unwrap(), Value::Null);
    }

    /// Strict equality implies the total order reports Equal.
    #[test]
    fn prop_strict_eq_consistent_with_cmp(a in arb_value(), b in arb_value()) {
        if a.strict_eq(&b) && a.comparable_with(&b) {
            prop_assert_eq!(a.cmp_total(&b), std::cmp::Ordering::Equal);
        }
    }
}

/// Bare variables pass whole bindings through an empty property name.
#[test]
fn test_variable_pass_through() {
    let registry = FunctionRegistry::new();
    let evaluator = Evaluator::new(&registry);
    let mut bindings = BindingSet::new();
    bindings.set(
        "xs",
        BindingValue::List(vec![
            BindingValue::Value(Value::Int(1)),
            BindingValue::Value(Value::Int(2)),
        ]),
    );
    let expr = Expression::variable("xs");
    match evaluator.eval(&expr, &bindings).unwrap() {
        BindingValue::List(items) => assert_eq!(items.len(), 2),
        other => panic!("unexpected {:?}", other),
    }
}
