//! Parameter binding.
//!
//! Parameters arrive as a name → Value map. Binding is non-destructive:
//! the compiled plan is cloned with every `PatternValue::Parameter` in
//! Match/Create/Merge property maps replaced by its literal, so the cached
//! plan can be re-executed with different parameters. Expression trees
//! keep their ParameterExpression nodes — those read the `$name` entries
//! injected into the initial binding — but every referenced name is
//! verified up front so a missing parameter fails before execution.

use std::collections::HashMap;

use crate::binding::{BindingSet, BindingValue};
use crate::cypher_parser::ast::{
    Expression, PathPattern, PatternValue, Query, SetClause,
};
use crate::executor::errors::ExecError;
use crate::executor::CompiledQuery;
use crate::planner::plan::Step;
use crate::value::Value;

/// Clone `compiled` with pattern parameters substituted and all
/// expression parameters validated.
pub(crate) fn bind(
    compiled: &CompiledQuery,
    params: &HashMap<String, Value>,
) -> Result<CompiledQuery, ExecError> {
    validate_query(&compiled.query, params)?;

    let mut bound = compiled.clone();
    substitute_plan(&mut bound.plan.steps, params)?;
    if let Some(next) = bound.next.take() {
        bound.next = Some(Box::new(bind(&next, params)?));
    }
    if let Some((all, union)) = bound.union.take() {
        bound.union = Some((all, Box::new(bind(&union, params)?)));
    }
    Ok(bound)
}

/// Seed binding carrying each parameter under the key `"$" + name`.
pub(crate) fn initial_binding(params: &HashMap<String, Value>) -> BindingSet {
    let mut binding = BindingSet::new();
    for (name, value) in params {
        binding.set(format!("${}", name), BindingValue::Value(value.clone()));
    }
    binding
}

fn substitute_plan(steps: &mut [Step], params: &HashMap<String, Value>) -> Result<(), ExecError> {
    for step in steps {
        match step {
            Step::Match(s) => substitute_patterns(&mut s.patterns, params)?,
            Step::OptionalMatch(s) => substitute_patterns(&mut s.patterns, params)?,
            Step::Create(s) => substitute_patterns(&mut s.patterns, params)?,
            Step::Merge(s) => {
                substitute_patterns(std::slice::from_mut(&mut s.pattern), params)?
            }
            _ => {}
        }
    }
    Ok(())
}

fn substitute_patterns(
    patterns: &mut [PathPattern],
    params: &HashMap<String, Value>,
) -> Result<(), ExecError> {
    for pattern in patterns {
        for node in &mut pattern.nodes {
            substitute_properties(&mut node.properties, params)?;
        }
        for rel in &mut pattern.relationships {
            substitute_properties(&mut rel.properties, params)?;
        }
    }
    Ok(())
}

fn substitute_properties(
    properties: &mut [(String, PatternValue)],
    params: &HashMap<String, Value>,
) -> Result<(), ExecError> {
    for (_, value) in properties {
        if let PatternValue::Parameter(name) = value {
            let resolved = params
                .get(name.as_str())
                .ok_or_else(|| ExecError::MissingParameter(name.clone()))?;
            *value = PatternValue::Literal(resolved.clone());
        }
    }
    Ok(())
}

/// Verify every ParameterExpression in the query's expression trees has a
/// matching entry.
fn validate_query(query: &Query, params: &HashMap<String, Value>) -> Result<(), ExecError> {
    let mut check = |expr: &Expression| validate_expression(expr, params);

    if let Some(e) = &query.where_clause {
        check(e)?;
    }
    for optional in &query.optional_match_clauses {
        if let Some(e) = &optional.where_clause {
            check(e)?;
        }
    }
    if let Some(ret) = &query.return_clause {
        for item in &ret.items {
            if let Some(e) = &item.expression {
                check(e)?;
            }
        }
        for e in &ret.group_by {
            check(e)?;
        }
    }
    if let Some(with) = &query.with_clause {
        for item in &with.items {
            check(&item.expression)?;
        }
        if let Some(e) = &with.where_clause {
            check(e)?;
        }
    }
    if let Some(order_by) = &query.order_by {
        for item in &order_by.items {
            check(&item.expression)?;
        }
    }
    if let Some(unwind) = &query.unwind_clause {
        check(&unwind.expression)?;
    }
    if let Some(set) = &query.set_clause {
        validate_set_clause(set, params)?;
    }
    if let Some(merge) = &query.merge_clause {
        if let Some(set) = &merge.on_create_set {
            validate_set_clause(set, params)?;
        }
        if let Some(set) = &merge.on_match_set {
            validate_set_clause(set, params)?;
        }
    }
    Ok(())
}

fn validate_set_clause(
    set: &SetClause,
    params: &HashMap<String, Value>,
) -> Result<(), ExecError> {
    for item in &set.items {
        validate_expression(&item.value, params)?;
    }
    Ok(())
}

fn validate_expression(
    expr: &Expression,
    params: &HashMap<String, Value>,
) -> Result<(), ExecError> {
    match expr {
        Expression::Parameter(name) => {
            if params.contains_key(name.as_str()) {
                Ok(())
            } else {
                Err(ExecError::MissingParameter(name.clone()))
            }
        }
        Expression::Literal(_) | Expression::Property { .. } => Ok(()),
        Expression::List(items) => items.iter().try_for_each(|e| validate_expression(e, params)),
        Expression::FunctionCall { args, .. } => {
            args.iter().try_for_each(|e| validate_expression(e, params))
        }
        Expression::Binary { left, right, .. } | Expression::Arithmetic { left, right, .. } => {
            validate_expression(left, params)?;
            validate_expression(right, params)
        }
        Expression::Unary { operand, .. } => validate_expression(operand, params),
        Expression::Case(case) => {
            if let Some(operand) = &case.operand {
                validate_expression(operand, params)?;
            }
            for (when, then) in &case.when_then {
                validate_expression(when, params)?;
                validate_expression(then, params)?;
            }
            if let Some(else_expr) = &case.else_expr {
                validate_expression(else_expr, params)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_initial_binding_injects_dollar_keys() {
        let mut params = HashMap::new();
        params.insert("name".to_string(), Value::String("Alice".into()));
        let binding = initial_binding(&params);
        assert_eq!(
            binding.get("$name"),
            Some(&BindingValue::Value(Value::String("Alice".into())))
        );
    }

    #[test]
    fn test_validate_reports_missing_parameter() {
        let expr = Expression::Parameter("who".to_string());
        let err = validate_expression(&expr, &HashMap::new()).unwrap_err();
        assert_eq!(err, ExecError::MissingParameter("who".to_string()));
    }
}
