//! Physical execution plan: a flat, ordered sequence of steps.
//!
//! Steps are tagged variants, not trait objects, so dispatch is a match
//! and exhaustiveness is compiler-checked. A plan is immutable after
//! optimization and may be cached and executed concurrently; all mutable
//! state lives in the per-invocation execution context.

use crate::cypher_parser::ast::{
    Expression, PathPattern, RemoveItem, SetClause, SetItem,
};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchStep {
    pub patterns: Vec<PathPattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionalMatchStep {
    pub patterns: Vec<PathPattern>,
    /// WHERE attached to the OPTIONAL MATCH; applies within the optional
    /// fan-out, before the Null-carrying binding is emitted.
    pub filter: Option<FilterStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    pub predicate: Expression,
    /// Strict mode aborts on the first evaluation error; lenient (the
    /// default) drops the row and records a warning.
    pub strict: bool,
}

impl FilterStep {
    pub fn lenient(predicate: Expression) -> Self {
        FilterStep {
            predicate,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexLookupStep {
    pub variable: String,
    pub labels: Vec<String>,
    pub property: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearchStep {
    pub variable: String,
    pub property: String,
    /// Query vector expression, evaluated once per execution.
    pub query: Expression,
    pub k: usize,
    pub ef: usize,
    /// Similarity threshold from the promoted predicate; kept for EXPLAIN.
    /// The original predicate stays in the filter for post-verification.
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateStep {
    pub patterns: Vec<PathPattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeStep {
    pub pattern: PathPattern,
    pub on_create_set: Option<SetClause>,
    pub on_match_set: Option<SetClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwindStep {
    pub expression: Expression,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetStep {
    pub items: Vec<SetItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveStep {
    pub items: Vec<RemoveItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStep {
    pub detach: bool,
    pub variables: Vec<String>,
}

/// Marker step: projection, aggregation, ordering and pagination happen in
/// the result builder so they compose with grouping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnStep;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Match(MatchStep),
    OptionalMatch(OptionalMatchStep),
    Filter(FilterStep),
    IndexLookup(IndexLookupStep),
    VectorSearch(VectorSearchStep),
    Create(CreateStep),
    Merge(MergeStep),
    Unwind(UnwindStep),
    Set(SetStep),
    Remove(RemoveStep),
    Delete(DeleteStep),
    Return(ReturnStep),
}

fn pattern_summary(patterns: &[PathPattern]) -> String {
    let vars: Vec<&str> = patterns.iter().flat_map(|p| p.variables()).collect();
    format!("patterns={} vars=[{}]", patterns.len(), vars.join(", "))
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Match(_) => "MatchStep",
            Step::OptionalMatch(_) => "OptionalMatchStep",
            Step::Filter(_) => "FilterStep",
            Step::IndexLookup(_) => "IndexLookupStep",
            Step::VectorSearch(_) => "VectorSearchStep",
            Step::Create(_) => "CreateStep",
            Step::Merge(_) => "MergeStep",
            Step::Unwind(_) => "UnwindStep",
            Step::Set(_) => "SetStep",
            Step::Remove(_) => "RemoveStep",
            Step::Delete(_) => "DeleteStep",
            Step::Return(_) => "ReturnStep",
        }
    }

    /// Human-readable description for EXPLAIN output.
    pub fn detail(&self) -> String {
        match self {
            Step::Match(s) => pattern_summary(&s.patterns),
            Step::OptionalMatch(s) => {
                let mut detail = pattern_summary(&s.patterns);
                if let Some(filter) = &s.filter {
                    detail.push_str(&format!(" where={}", filter.predicate));
                }
                detail
            }
            Step::Filter(s) => format!("predicate={}", s.predicate),
            Step::IndexLookup(s) => format!(
                "{}.{} = {} labels=[{}]",
                s.variable,
                s.property,
                s.value,
                s.labels.join(", ")
            ),
            Step::VectorSearch(s) => format!(
                "{}.{} k={} ef={} threshold={}",
                s.variable, s.property, s.k, s.ef, s.threshold
            ),
            Step::Create(s) => pattern_summary(&s.patterns),
            Step::Merge(s) => pattern_summary(std::slice::from_ref(&s.pattern)),
            Step::Unwind(s) => format!("{} AS {}", s.expression, s.alias),
            Step::Set(s) => format!("assignments={}", s.items.len()),
            Step::Remove(s) => format!("items={}", s.items.len()),
            Step::Delete(s) => format!(
                "detach={} vars=[{}]",
                s.detach,
                s.variables.join(", ")
            ),
            Step::Return(_) => String::new(),
        }
    }
}

/// Ordered steps for one query segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub steps: Vec<Step>,
}
