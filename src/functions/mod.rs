//! Scalar function registry.
//!
//! Functions take a slice of already-evaluated [`Value`]s and return a
//! Value; each function validates its own arity, so dynamic-arity
//! functions like `coalesce` need no special casing. The registry is
//! written during engine setup and read concurrently afterwards, guarded
//! by a reader/writer lock. Lookup is case-sensitive.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use lazy_static::lazy_static;

use crate::evaluator::errors::EvalError;
use crate::value::Value;

pub type ScalarFunction = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

fn expect_arity(name: &str, args: &[Value], arity: usize) -> Result<(), EvalError> {
    if args.len() != arity {
        return Err(EvalError::InvalidArgument(format!(
            "{}() takes {} argument(s), got {}",
            name,
            arity,
            args.len()
        )));
    }
    Ok(())
}

/// Single-string-argument helper: Null propagates, non-strings fail.
fn string_arg<'a>(name: &str, args: &'a [Value]) -> Result<Option<&'a str>, EvalError> {
    expect_arity(name, args, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        other => Err(EvalError::TypeMismatch(format!(
            "{}() expects a String, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn numeric_arg(name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    expect_arity(name, args, 1)?;
    match &args[0] {
        v @ (Value::Int(_) | Value::Float(_)) => Ok(Some(v.clone())),
        Value::Null => Ok(None),
        other => Err(EvalError::TypeMismatch(format!(
            "{}() expects a number, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Cosine similarity of two embedding vectors, in [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        na += f64::from(*x) * f64::from(*x);
        nb += f64::from(*y) * f64::from(*y);
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Full-text relevance: whitespace-split, lowercased, fraction of query
/// terms found in the text. Registered as `search(text, query)` once a
/// search index is attached to the executor.
pub fn search_score(text: &str, query: &str) -> f64 {
    let haystack = text.to_lowercase();
    let terms: Vec<&str> = query.split_whitespace().collect();
    if terms.is_empty() {
        return 0.0;
    }
    let found = terms
        .iter()
        .filter(|t| haystack.contains(&t.to_lowercase()))
        .count();
    found as f64 / terms.len() as f64
}

pub fn search_scalar() -> ScalarFunction {
    Arc::new(|args| {
        expect_arity("search", args, 2)?;
        match (&args[0], &args[1]) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::String(text), Value::String(query)) => {
                Ok(Value::Float(search_score(text, query)))
            }
            _ => Err(EvalError::TypeMismatch(
                "search() expects (String, String)".to_string(),
            )),
        }
    })
}

lazy_static! {
    /// Built-in scalar function table, copied into every new registry.
    static ref BUILTINS: Vec<(&'static str, ScalarFunction)> = {
        let mut table: Vec<(&'static str, ScalarFunction)> = Vec::new();

        table.push(("toUpper", Arc::new(|args: &[Value]| {
            Ok(match string_arg("toUpper", args)? {
                Some(s) => Value::String(s.to_uppercase()),
                None => Value::Null,
            })
        })));

        table.push(("toLower", Arc::new(|args: &[Value]| {
            Ok(match string_arg("toLower", args)? {
                Some(s) => Value::String(s.to_lowercase()),
                None => Value::Null,
            })
        })));

        table.push(("trim", Arc::new(|args: &[Value]| {
            Ok(match string_arg("trim", args)? {
                Some(s) => Value::String(s.trim().to_string()),
                None => Value::Null,
            })
        })));

        table.push(("size", Arc::new(|args: &[Value]| {
            expect_arity("size", args, 1)?;
            match &args[0] {
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Vector(v) => Ok(Value::Int(v.len() as i64)),
                Value::Null => Ok(Value::Null),
                other => Err(EvalError::TypeMismatch(format!(
                    "size() expects a String or Vector, got {}",
                    other.type_name()
                ))),
            }
        })));

        table.push(("substring", Arc::new(|args: &[Value]| {
            if args.len() < 2 || args.len() > 3 {
                return Err(EvalError::InvalidArgument(format!(
                    "substring() takes 2 or 3 arguments, got {}",
                    args.len()
                )));
            }
            let s = match &args[0] {
                Value::String(s) => s,
                Value::Null => return Ok(Value::Null),
                other => {
                    return Err(EvalError::TypeMismatch(format!(
                        "substring() expects a String, got {}",
                        other.type_name()
                    )))
                }
            };
            let start = match &args[1] {
                Value::Int(i) if *i >= 0 => *i as usize,
                Value::Null => return Ok(Value::Null),
                _ => {
                    return Err(EvalError::InvalidArgument(
                        "substring() start must be a non-negative Int".to_string(),
                    ))
                }
            };
            let chars: Vec<char> = s.chars().collect();
            let end = match args.get(2) {
                Some(Value::Int(len)) if *len >= 0 => (start + *len as usize).min(chars.len()),
                Some(Value::Null) => return Ok(Value::Null),
                Some(_) => {
                    return Err(EvalError::InvalidArgument(
                        "substring() length must be a non-negative Int".to_string(),
                    ))
                }
                None => chars.len(),
            };
            if start >= chars.len() {
                return Ok(Value::String(String::new()));
            }
            Ok(Value::String(chars[start..end].iter().collect()))
        })));

        table.push(("abs", Arc::new(|args: &[Value]| {
            Ok(match numeric_arg("abs", args)? {
                Some(Value::Int(i)) => Value::Int(i.wrapping_abs()),
                Some(Value::Float(x)) => Value::Float(x.abs()),
                _ => Value::Null,
            })
        })));

        table.push(("floor", Arc::new(|args: &[Value]| {
            Ok(match numeric_arg("floor", args)? {
                Some(v) => Value::Float(v.as_f64().unwrap_or(0.0).floor()),
                None => Value::Null,
            })
        })));

        table.push(("ceil", Arc::new(|args: &[Value]| {
            Ok(match numeric_arg("ceil", args)? {
                Some(v) => Value::Float(v.as_f64().unwrap_or(0.0).ceil()),
                None => Value::Null,
            })
        })));

        table.push(("round", Arc::new(|args: &[Value]| {
            Ok(match numeric_arg("round", args)? {
                Some(v) => Value::Float(v.as_f64().unwrap_or(0.0).round()),
                None => Value::Null,
            })
        })));

        table.push(("toString", Arc::new(|args: &[Value]| {
            expect_arity("toString", args, 1)?;
            Ok(match &args[0] {
                Value::Null => Value::Null,
                v => Value::String(v.to_string()),
            })
        })));

        table.push(("toInteger", Arc::new(|args: &[Value]| {
            expect_arity("toInteger", args, 1)?;
            Ok(match &args[0] {
                Value::Int(i) => Value::Int(*i),
                Value::Float(x) => Value::Int(*x as i64),
                Value::String(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
                Value::Bool(b) => Value::Int(i64::from(*b)),
                _ => Value::Null,
            })
        })));

        table.push(("toFloat", Arc::new(|args: &[Value]| {
            expect_arity("toFloat", args, 1)?;
            Ok(match &args[0] {
                Value::Int(i) => Value::Float(*i as f64),
                Value::Float(x) => Value::Float(*x),
                Value::String(s) => s.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
                _ => Value::Null,
            })
        })));

        table.push(("coalesce", Arc::new(|args: &[Value]| {
            Ok(args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null))
        })));

        table.push(("timestamp", Arc::new(|args: &[Value]| {
            expect_arity("timestamp", args, 0)?;
            Ok(Value::Timestamp(Utc::now().timestamp()))
        })));

        // Brute-force similarity works without a vector index; the
        // optimizer only changes how candidates are produced.
        table.push(("vector.similarity", Arc::new(|args: &[Value]| {
            expect_arity("vector.similarity", args, 2)?;
            match (&args[0], &args[1]) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::Vector(a), Value::Vector(b)) => {
                    Ok(Value::Float(cosine_similarity(a, b)))
                }
                _ => Err(EvalError::TypeMismatch(
                    "vector.similarity() expects (Vector, Vector)".to_string(),
                )),
            }
        })));

        table
    };
}

/// Name → scalar function mapping. One writer during setup, many readers
/// during execution.
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, ScalarFunction>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Registry pre-populated with the built-in table.
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        for (name, f) in BUILTINS.iter() {
            functions.insert((*name).to_string(), Arc::clone(f));
        }
        FunctionRegistry {
            functions: RwLock::new(functions),
        }
    }

    pub fn register(&self, name: impl Into<String>, function: ScalarFunction) {
        self.functions.write().unwrap().insert(name.into(), function);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().unwrap().contains_key(name)
    }

    /// Invoke by case-sensitive name. The function is cloned out of the
    /// lock so slow functions never block registration or other callers.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let function = self
            .functions
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        function(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.contains("toUpper"));
        assert!(!registry.contains("toupper"));
        assert_eq!(
            registry.call("TOUPPER", &[Value::String("x".into())]),
            Err(EvalError::UnknownFunction("TOUPPER".to_string()))
        );
    }

    #[test]
    fn test_string_functions() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            registry.call("toUpper", &[Value::String("abc".into())]),
            Ok(Value::String("ABC".into()))
        );
        assert_eq!(registry.call("toLower", &[Value::Null]), Ok(Value::Null));
        assert_eq!(
            registry.call("trim", &[Value::String("  x ".into())]),
            Ok(Value::String("x".into()))
        );
        assert_eq!(
            registry.call("substring", &[Value::String("hello".into()), Value::Int(1), Value::Int(3)]),
            Ok(Value::String("ell".into()))
        );
    }

    #[test]
    fn test_coalesce_is_dynamic_arity() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            registry.call("coalesce", &[Value::Null, Value::Null, Value::Int(7)]),
            Ok(Value::Int(7))
        );
        assert_eq!(registry.call("coalesce", &[]), Ok(Value::Null));
    }

    #[test]
    fn test_arity_errors() {
        let registry = FunctionRegistry::new();
        assert!(matches!(
            registry.call("toUpper", &[]),
            Err(EvalError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.call("toUpper", &[Value::Int(1)]),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_vector_similarity() {
        let registry = FunctionRegistry::new();
        let a = Value::Vector(vec![1.0, 0.0]);
        let b = Value::Vector(vec![1.0, 0.0]);
        match registry.call("vector.similarity", &[a, b]) {
            Ok(Value::Float(s)) => assert!((s - 1.0).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_search_score_fraction_of_terms() {
        assert_eq!(search_score("The Quick Brown Fox", "quick fox"), 1.0);
        assert_eq!(search_score("The Quick Brown Fox", "quick cat"), 0.5);
        assert_eq!(search_score("anything", ""), 0.0);
    }

    #[test]
    fn test_custom_registration() {
        let registry = FunctionRegistry::new();
        registry.register(
            "double",
            Arc::new(|args| match args {
                [Value::Int(i)] => Ok(Value::Int(i * 2)),
                _ => Err(EvalError::InvalidArgument("double() takes one Int".into())),
            }),
        );
        assert_eq!(registry.call("double", &[Value::Int(21)]), Ok(Value::Int(42)));
    }
}
