//! Plan builder: deterministic translation from a parsed query segment to
//! an ordered list of steps.
//!
//! Step order is fixed: MATCH, OPTIONAL MATCH (in clause order), FILTER,
//! then mutations (CREATE, MERGE, UNWIND, SET, REMOVE, DELETE), then the
//! RETURN marker. The optimizer may rewrite the read side but never
//! reorders mutations.

pub mod optimizer;
pub mod plan;

use crate::cypher_parser::ast::Query;

use plan::{
    CreateStep, DeleteStep, FilterStep, MatchStep, MergeStep, OptionalMatchStep, Plan,
    RemoveStep, ReturnStep, SetStep, Step, UnwindStep,
};

pub struct PlanBuilder;

impl PlanBuilder {
    /// Build the physical plan for one query segment. WITH/UNION
    /// continuations are compiled separately by the executor.
    pub fn build(query: &Query) -> Plan {
        let mut steps = Vec::new();

        if let Some(match_clause) = &query.match_clause {
            steps.push(Step::Match(MatchStep {
                patterns: match_clause.patterns.clone(),
            }));
        }

        for optional in &query.optional_match_clauses {
            steps.push(Step::OptionalMatch(OptionalMatchStep {
                patterns: optional.patterns.clone(),
                filter: optional
                    .where_clause
                    .clone()
                    .map(FilterStep::lenient),
            }));
        }

        if let Some(predicate) = &query.where_clause {
            steps.push(Step::Filter(FilterStep::lenient(predicate.clone())));
        }

        if let Some(create) = &query.create_clause {
            steps.push(Step::Create(CreateStep {
                patterns: create.patterns.clone(),
            }));
        }

        if let Some(merge) = &query.merge_clause {
            steps.push(Step::Merge(MergeStep {
                pattern: merge.pattern.clone(),
                on_create_set: merge.on_create_set.clone(),
                on_match_set: merge.on_match_set.clone(),
            }));
        }

        if let Some(unwind) = &query.unwind_clause {
            steps.push(Step::Unwind(UnwindStep {
                expression: unwind.expression.clone(),
                alias: unwind.alias.clone(),
            }));
        }

        if let Some(set) = &query.set_clause {
            steps.push(Step::Set(SetStep {
                items: set.items.clone(),
            }));
        }

        if let Some(remove) = &query.remove_clause {
            steps.push(Step::Remove(RemoveStep {
                items: remove.items.clone(),
            }));
        }

        if let Some(delete) = &query.delete_clause {
            steps.push(Step::Delete(DeleteStep {
                detach: delete.detach,
                variables: delete.variables.clone(),
            }));
        }

        if query.return_clause.is_some() {
            steps.push(Step::Return(ReturnStep));
        }

        Plan { steps }
    }
}
