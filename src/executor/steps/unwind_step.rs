//! UNWIND: expand a list-valued expression into one row per element.
//!
//! Null yields zero rows; a scalar is treated as a singleton list.

use crate::binding::BindingValue;
use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::planner::plan::UnwindStep;

pub(crate) fn execute_unwind(
    ctx: &mut ExecutionContext,
    step: &UnwindStep,
) -> Result<(), ExecError> {
    let evaluator = ctx.evaluator();
    let incoming = std::mem::take(&mut ctx.results);
    let mut out = Vec::new();
    for binding in incoming {
        ctx.check_cancellation()?;
        match evaluator.eval(&step.expression, &binding)? {
            BindingValue::Value(crate::value::Value::Null) => {}
            BindingValue::List(items) => {
                for item in items {
                    let mut extended = binding.clone();
                    extended.set(step.alias.clone(), item);
                    out.push(extended);
                }
            }
            scalar => {
                let mut extended = binding.clone();
                extended.set(step.alias.clone(), scalar);
                out.push(extended);
            }
        }
    }
    ctx.results = out;
    Ok(())
}
