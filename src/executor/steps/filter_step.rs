//! WHERE filtering with lenient/strict evaluation modes.

use crate::binding::BindingSet;
use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::planner::plan::FilterStep;

pub(crate) fn execute_filter(
    ctx: &mut ExecutionContext,
    step: &FilterStep,
) -> Result<(), ExecError> {
    let incoming = std::mem::take(&mut ctx.results);
    let kept = filter_rows(ctx, incoming, step)?;
    ctx.results = kept;
    Ok(())
}

/// Keep rows whose predicate coerces to true. Lenient mode (the default)
/// drops rows whose evaluation errors and records a warning; strict mode
/// aborts on the first error.
pub(crate) fn filter_rows(
    ctx: &mut ExecutionContext,
    rows: Vec<BindingSet>,
    step: &FilterStep,
) -> Result<Vec<BindingSet>, ExecError> {
    let evaluator = ctx.evaluator();
    let mut kept = Vec::with_capacity(rows.len());
    let mut warnings = Vec::new();
    for binding in rows {
        ctx.check_cancellation()?;
        match evaluator.eval_bool(&step.predicate, &binding) {
            Ok(true) => kept.push(binding),
            Ok(false) => {}
            Err(e) if step.strict => return Err(e.into()),
            Err(e) => {
                log::warn!("filter dropped row: {} ({})", e, step.predicate);
                warnings.push(format!("filter dropped row: {}", e));
            }
        }
    }
    ctx.warnings.extend(warnings);
    Ok(kept)
}
