//! MERGE: match the pattern in isolation; on any match the current rows
//! become the matched rows and ON MATCH SET runs, otherwise the pattern is
//! created and ON CREATE SET runs.

use crate::binding::BindingSet;
use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::executor::steps::{create_step, match_step, mutation_steps};
use crate::planner::plan::MergeStep;

pub(crate) fn execute_merge(ctx: &mut ExecutionContext, step: &MergeStep) -> Result<(), ExecError> {
    // Isolated empty context for the embedded match, seeded with the
    // `$param` entries so ON CREATE / ON MATCH SET expressions can still
    // read parameters.
    let seed = parameter_seed(ctx.results.first());
    let matched =
        match_step::match_patterns(ctx, &seed, std::slice::from_ref(&step.pattern))?;

    if !matched.is_empty() {
        log::debug!("merge matched {} row(s)", matched.len());
        ctx.results = matched;
        if let Some(set) = &step.on_match_set {
            mutation_steps::execute_set_items(ctx, &set.items)?;
        }
        return Ok(());
    }

    log::debug!("merge matched nothing; creating pattern");
    ctx.results = vec![seed];
    create_step::create_pattern(ctx, &step.pattern)?;
    if let Some(set) = &step.on_create_set {
        mutation_steps::execute_set_items(ctx, &set.items)?;
    }
    Ok(())
}

fn parameter_seed(binding: Option<&BindingSet>) -> BindingSet {
    let mut seed = BindingSet::new();
    if let Some(binding) = binding {
        for (name, value) in binding.iter() {
            if name.starts_with('$') {
                seed.set(name, value.clone());
            }
        }
    }
    seed
}
