//! Expression evaluator with dynamic value semantics.
//!
//! Every expression evaluates in two modes: [`Evaluator::eval_value`]
//! returns a plain [`Value`] (Null on missing lookups) and
//! [`Evaluator::eval_bool`] coerces the result to a boolean. The internal
//! domain is [`BindingValue`] so bare variables pass whole nodes, edges
//! and lists through (e.g. into UNWIND and WITH projections).
//!
//! Semantics:
//! - AND/OR short-circuit left to right; NOT flips the coerced bool.
//! - Null propagates through arithmetic; `Null = Null` is true.
//! - `+` concatenates two Strings; String plus non-String is a type
//!   mismatch; otherwise operands promote to Float unless both are Int.
//! - `/` and `%` fail on a zero divisor; Int division truncates.
//! - Ordered comparisons on incomparable tags are false.

pub mod errors;

use std::cmp::Ordering;

use crate::binding::{BindingSet, BindingValue};
use crate::cypher_parser::ast::{
    ArithmeticOp, BinaryOp, CaseExpression, Expression, UnaryOp,
};
use crate::functions::FunctionRegistry;
use crate::value::Value;

use errors::EvalError;

/// The synthetic property surfacing a binding's vector side-channel score.
pub const SIMILARITY_SCORE_PROPERTY: &str = "similarity_score";

/// Boolean coercion over the binding domain: Null is false, Bool is
/// itself, numbers are nonzero, strings are nonempty, graph entities,
/// lists and maps are true.
pub fn coerce_to_bool(value: &BindingValue) -> bool {
    value.truthy()
}

pub struct Evaluator<'a> {
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Evaluator { functions }
    }

    pub fn eval_value(&self, expr: &Expression, bindings: &BindingSet) -> Result<Value, EvalError> {
        Ok(self.eval(expr, bindings)?.as_value())
    }

    pub fn eval_bool(&self, expr: &Expression, bindings: &BindingSet) -> Result<bool, EvalError> {
        Ok(coerce_to_bool(&self.eval(expr, bindings)?))
    }

    pub fn eval(
        &self,
        expr: &Expression,
        bindings: &BindingSet,
    ) -> Result<BindingValue, EvalError> {
        match expr {
            Expression::Literal(value) => Ok(BindingValue::Value(value.clone())),
            Expression::Parameter(name) => Ok(bindings
                .get(&format!("${}", name))
                .cloned()
                .unwrap_or_else(BindingValue::null)),
            Expression::Property { variable, property } => {
                Ok(self.lookup_property(variable, property, bindings))
            }
            Expression::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item, bindings)?);
                }
                Ok(BindingValue::List(out))
            }
            Expression::FunctionCall { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_value(arg, bindings)?);
                }
                Ok(BindingValue::Value(self.functions.call(name, &values)?))
            }
            Expression::Binary { op, left, right } => self.eval_binary(*op, left, right, bindings),
            Expression::Arithmetic { op, left, right } => {
                let l = self.eval_value(left, bindings)?;
                let r = self.eval_value(right, bindings)?;
                Ok(BindingValue::Value(eval_arithmetic(*op, &l, &r)?))
            }
            Expression::Unary { op, operand } => self.eval_unary(*op, operand, bindings),
            Expression::Case(case) => self.eval_case(case, bindings),
        }
    }

    fn lookup_property(
        &self,
        variable: &str,
        property: &str,
        bindings: &BindingSet,
    ) -> BindingValue {
        let Some(bound) = bindings.get(variable) else {
            return BindingValue::null();
        };
        // An empty property name yields the whole bound value.
        if property.is_empty() {
            return bound.clone();
        }
        if property == SIMILARITY_SCORE_PROPERTY {
            if let Some(score) = bindings.vector_score(variable) {
                return BindingValue::Value(Value::Float(score));
            }
        }
        match bound {
            BindingValue::Node(node) => node
                .properties
                .get(property)
                .cloned()
                .map(BindingValue::Value)
                .unwrap_or_else(BindingValue::null),
            BindingValue::Edge(edge) => edge
                .properties
                .get(property)
                .cloned()
                .map(BindingValue::Value)
                .unwrap_or_else(BindingValue::null),
            BindingValue::Map(map) => map
                .get(property)
                .cloned()
                .unwrap_or_else(BindingValue::null),
            BindingValue::Value(_) | BindingValue::List(_) => BindingValue::null(),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        bindings: &BindingSet,
    ) -> Result<BindingValue, EvalError> {
        match op {
            // Short-circuit: the right operand is not evaluated when the
            // left already decides.
            BinaryOp::And => {
                if !self.eval_bool(left, bindings)? {
                    return Ok(BindingValue::Value(Value::Bool(false)));
                }
                let b = self.eval_bool(right, bindings)?;
                Ok(BindingValue::Value(Value::Bool(b)))
            }
            BinaryOp::Or => {
                if self.eval_bool(left, bindings)? {
                    return Ok(BindingValue::Value(Value::Bool(true)));
                }
                let b = self.eval_bool(right, bindings)?;
                Ok(BindingValue::Value(Value::Bool(b)))
            }
            BinaryOp::Eq => {
                let l = self.eval(left, bindings)?;
                let r = self.eval(right, bindings)?;
                Ok(BindingValue::Value(Value::Bool(binding_eq(&l, &r))))
            }
            BinaryOp::Neq => {
                let l = self.eval(left, bindings)?;
                let r = self.eval(right, bindings)?;
                Ok(BindingValue::Value(Value::Bool(!binding_eq(&l, &r))))
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let l = self.eval_value(left, bindings)?;
                let r = self.eval_value(right, bindings)?;
                let result = if l.comparable_with(&r) {
                    match (op, l.cmp_total(&r)) {
                        (BinaryOp::Lt, Ordering::Less) => true,
                        (BinaryOp::Lte, Ordering::Less | Ordering::Equal) => true,
                        (BinaryOp::Gt, Ordering::Greater) => true,
                        (BinaryOp::Gte, Ordering::Greater | Ordering::Equal) => true,
                        _ => false,
                    }
                } else {
                    false
                };
                Ok(BindingValue::Value(Value::Bool(result)))
            }
            BinaryOp::In => {
                let needle = self.eval(left, bindings)?;
                match self.eval(right, bindings)? {
                    BindingValue::List(items) => {
                        let found = items.iter().any(|item| binding_eq(&needle, item));
                        Ok(BindingValue::Value(Value::Bool(found)))
                    }
                    BindingValue::Value(Value::Null) => Ok(BindingValue::null()),
                    _ => Err(EvalError::TypeMismatch(
                        "IN expects a list on the right".to_string(),
                    )),
                }
            }
            BinaryOp::StartsWith | BinaryOp::EndsWith | BinaryOp::Contains => {
                let l = self.eval_value(left, bindings)?;
                let r = self.eval_value(right, bindings)?;
                if l.is_null() || r.is_null() {
                    return Ok(BindingValue::null());
                }
                match (&l, &r) {
                    (Value::String(a), Value::String(b)) => {
                        let result = match op {
                            BinaryOp::StartsWith => a.starts_with(b.as_str()),
                            BinaryOp::EndsWith => a.ends_with(b.as_str()),
                            _ => a.contains(b.as_str()),
                        };
                        Ok(BindingValue::Value(Value::Bool(result)))
                    }
                    _ => Err(EvalError::TypeMismatch(format!(
                        "{} expects String operands, got {} and {}",
                        op,
                        l.type_name(),
                        r.type_name()
                    ))),
                }
            }
        }
    }

    fn eval_unary(
        &self,
        op: UnaryOp,
        operand: &Expression,
        bindings: &BindingSet,
    ) -> Result<BindingValue, EvalError> {
        match op {
            UnaryOp::Not => {
                let b = self.eval_bool(operand, bindings)?;
                Ok(BindingValue::Value(Value::Bool(!b)))
            }
            UnaryOp::Minus => match self.eval_value(operand, bindings)? {
                Value::Int(i) => Ok(BindingValue::Value(Value::Int(i.wrapping_neg()))),
                Value::Float(x) => Ok(BindingValue::Value(Value::Float(-x))),
                Value::Null => Ok(BindingValue::null()),
                other => Err(EvalError::TypeMismatch(format!(
                    "unary '-' expects a number, got {}",
                    other.type_name()
                ))),
            },
            UnaryOp::IsNull => {
                let v = self.eval(operand, bindings)?;
                Ok(BindingValue::Value(Value::Bool(v.is_null())))
            }
            UnaryOp::IsNotNull => {
                let v = self.eval(operand, bindings)?;
                Ok(BindingValue::Value(Value::Bool(!v.is_null())))
            }
        }
    }

    fn eval_case(
        &self,
        case: &CaseExpression,
        bindings: &BindingSet,
    ) -> Result<BindingValue, EvalError> {
        match &case.operand {
            Some(operand) => {
                // Simple form: match each WHEN value against the operand;
                // a Null operand matches nothing.
                let subject = self.eval_value(operand, bindings)?;
                for (when, then) in &case.when_then {
                    let candidate = self.eval_value(when, bindings)?;
                    if !subject.is_null() && subject.cmp_total(&candidate) == Ordering::Equal {
                        return self.eval(then, bindings);
                    }
                }
            }
            None => {
                for (when, then) in &case.when_then {
                    if self.eval_bool(when, bindings)? {
                        return self.eval(then, bindings);
                    }
                }
            }
        }
        match &case.else_expr {
            Some(else_expr) => self.eval(else_expr, bindings),
            None => Ok(BindingValue::null()),
        }
    }
}

/// Equality over the binding domain: values use strict equality, nodes and
/// edges compare by id, lists element-wise. Mixed shapes are unequal.
pub fn binding_eq(left: &BindingValue, right: &BindingValue) -> bool {
    match (left, right) {
        (BindingValue::Value(a), BindingValue::Value(b)) => a.strict_eq(b),
        (BindingValue::Node(a), BindingValue::Node(b)) => a.id == b.id,
        (BindingValue::Edge(a), BindingValue::Edge(b)) => a.id == b.id,
        (BindingValue::List(a), BindingValue::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| binding_eq(x, y))
        }
        (BindingValue::Map(a), BindingValue::Map(b)) => {
            a.len() == b.len()
                && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                    ka == kb && binding_eq(va, vb)
                })
        }
        _ => false,
    }
}

fn eval_arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if op == ArithmeticOp::Add {
        match (left, right) {
            (Value::String(a), Value::String(b)) => {
                return Ok(Value::String(format!("{}{}", a, b)));
            }
            (Value::String(_), _) | (_, Value::String(_)) => {
                return Err(EvalError::TypeMismatch(format!(
                    "cannot add {} and {}",
                    left.type_name(),
                    right.type_name()
                )));
            }
            _ => {}
        }
    }

    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let a = *a;
            let b = *b;
            let result = match op {
                ArithmeticOp::Add => a.wrapping_add(b),
                ArithmeticOp::Subtract => a.wrapping_sub(b),
                ArithmeticOp::Multiply => a.wrapping_mul(b),
                ArithmeticOp::Divide => {
                    if b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    // Truncates toward zero.
                    a.wrapping_div(b)
                }
                ArithmeticOp::Modulo => {
                    if b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a.wrapping_rem(b)
                }
            };
            Ok(Value::Int(result))
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(EvalError::TypeMismatch(format!(
                    "arithmetic '{}' expects numbers, got {} and {}",
                    op,
                    left.type_name(),
                    right.type_name()
                )));
            };
            let result = match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Subtract => a - b,
                ArithmeticOp::Multiply => a * b,
                ArithmeticOp::Divide => {
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a / b
                }
                ArithmeticOp::Modulo => {
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a % b
                }
            };
            Ok(Value::Float(result))
        }
    }
}
