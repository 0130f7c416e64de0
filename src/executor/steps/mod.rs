//! Step interpreters.
//!
//! Shared contract: a step reads `ctx.results`, writes a new
//! `ctx.results`, checks cancellation at least every 1024 input rows and
//! propagates errors upward. Dispatch is a plain match over the step
//! variants.

mod create_step;
mod filter_step;
mod lookup_steps;
mod match_step;
mod merge_step;
mod mutation_steps;
mod unwind_step;

use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::planner::plan::Step;

pub(crate) fn execute_step(step: &Step, ctx: &mut ExecutionContext) -> Result<(), ExecError> {
    match step {
        Step::Match(s) => match_step::execute_match(ctx, &s.patterns),
        Step::OptionalMatch(s) => {
            match_step::execute_optional_match(ctx, &s.patterns, s.filter.as_ref())
        }
        Step::Filter(s) => filter_step::execute_filter(ctx, s),
        Step::IndexLookup(s) => lookup_steps::execute_index_lookup(ctx, s),
        Step::VectorSearch(s) => lookup_steps::execute_vector_search(ctx, s),
        Step::Create(s) => create_step::execute_create(ctx, &s.patterns),
        Step::Merge(s) => merge_step::execute_merge(ctx, s),
        Step::Unwind(s) => unwind_step::execute_unwind(ctx, s),
        Step::Set(s) => mutation_steps::execute_set_items(ctx, &s.items),
        Step::Remove(s) => mutation_steps::execute_remove_items(ctx, &s.items),
        Step::Delete(s) => mutation_steps::execute_delete(ctx, s),
        // Projection and post-processing live in the result builder.
        Step::Return(_) => Ok(()),
    }
}
