//! Aggregation and grouping.
//!
//! An aggregate reduces the column of values an expression produces over a
//! group of bindings; Nulls are dropped before reduction. Without GROUP BY
//! the whole input is one group (one output row even for empty input);
//! with GROUP BY bindings partition by a composite key in first-seen
//! order. Determinism: COUNT/SUM/AVG/MIN/MAX are order-insensitive,
//! COLLECT preserves input order.

use crate::binding::{BindingSet, BindingValue};
use crate::cypher_parser::ast::{Aggregate, Expression};
use crate::evaluator::Evaluator;
use crate::executor::errors::ExecError;
use crate::value::Value;

/// Sentinel standing in for Null in composite group keys.
const NULL_KEY: &str = "<null>";

/// Composite key: group-by values joined by the NUL byte, Null rendered as
/// the sentinel. Tag-prefixed so Int 1 and String "1" land in different
/// groups.
pub(crate) fn group_key(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| {
            if v.is_null() {
                NULL_KEY.to_string()
            } else {
                format!("{}:{}", v.type_name(), v)
            }
        })
        .collect::<Vec<String>>()
        .join("\0")
}

/// Partition bindings by the group-by expressions, preserving first-seen
/// group order. An empty expression list yields one group holding all
/// bindings (even when there are none).
pub(crate) fn group_bindings<'a>(
    bindings: &'a [BindingSet],
    group_by: &[Expression],
    evaluator: &Evaluator,
) -> Result<Vec<Vec<&'a BindingSet>>, ExecError> {
    if group_by.is_empty() {
        return Ok(vec![bindings.iter().collect()]);
    }
    let mut order: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<&BindingSet>> = Vec::new();
    for binding in bindings {
        let mut key_values = Vec::with_capacity(group_by.len());
        for expr in group_by {
            key_values.push(evaluator.eval_value(expr, binding)?);
        }
        let key = group_key(&key_values);
        match order.iter().position(|k| *k == key) {
            Some(index) => groups[index].push(binding),
            None => {
                order.push(key);
                groups.push(vec![binding]);
            }
        }
    }
    Ok(groups)
}

/// Reduce one aggregate over a group. A missing expression is COUNT(*):
/// the number of bindings in the group.
pub(crate) fn reduce(
    aggregate: Aggregate,
    expression: Option<&Expression>,
    group: &[&BindingSet],
    evaluator: &Evaluator,
) -> Result<BindingValue, ExecError> {
    let Some(expression) = expression else {
        return Ok(BindingValue::Value(Value::Int(group.len() as i64)));
    };

    let mut values: Vec<Value> = Vec::with_capacity(group.len());
    for binding in group {
        let value = evaluator.eval_value(expression, binding)?;
        if !value.is_null() {
            values.push(value);
        }
    }

    let result = match aggregate {
        Aggregate::Count => BindingValue::Value(Value::Int(values.len() as i64)),
        Aggregate::Sum => BindingValue::Value(sum(&values)),
        Aggregate::Avg => {
            if values.is_empty() {
                BindingValue::Value(Value::Null)
            } else {
                let total: f64 = values.iter().filter_map(Value::as_f64).sum();
                BindingValue::Value(Value::Float(total / values.len() as f64))
            }
        }
        Aggregate::Min => extremum(&values, std::cmp::Ordering::Less),
        Aggregate::Max => extremum(&values, std::cmp::Ordering::Greater),
        Aggregate::Collect => {
            BindingValue::List(values.into_iter().map(BindingValue::Value).collect())
        }
    };
    Ok(result)
}

/// Int when every input is Int, Float as soon as one is; empty sums to
/// Int 0.
fn sum(values: &[Value]) -> Value {
    let all_int = values.iter().all(|v| matches!(v, Value::Int(_)));
    if all_int {
        Value::Int(
            values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => *i,
                    _ => 0,
                })
                .fold(0i64, i64::wrapping_add),
        )
    } else {
        Value::Float(values.iter().filter_map(Value::as_f64).sum())
    }
}

fn extremum(values: &[Value], keep: std::cmp::Ordering) -> BindingValue {
    let mut best: Option<&Value> = None;
    for value in values {
        match best {
            None => best = Some(value),
            Some(current) => {
                if value.cmp_total(current) == keep {
                    best = Some(value);
                }
            }
        }
    }
    BindingValue::Value(best.cloned().unwrap_or(Value::Null))
}
