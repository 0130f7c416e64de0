//! Index-backed candidate production: property index lookups and vector
//! kNN search.

use crate::binding::BindingValue;
use crate::evaluator::errors::EvalError;
use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::graph::Node;
use crate::planner::plan::{IndexLookupStep, VectorSearchStep};
use crate::value::Value;

pub(crate) fn execute_index_lookup(
    ctx: &mut ExecutionContext,
    step: &IndexLookupStep,
) -> Result<(), ExecError> {
    let nodes: Vec<Node> = ctx
        .graph
        .find_nodes_by_property_indexed(&step.property, &step.value)?
        .into_iter()
        .filter(|n| step.labels.iter().all(|label| n.has_label(label)))
        .collect();

    let incoming = std::mem::take(&mut ctx.results);
    let mut out = Vec::new();
    for binding in &incoming {
        for node in &nodes {
            ctx.check_cancellation()?;
            // A bound variable pins the candidate set to that node.
            match binding.get(&step.variable) {
                Some(BindingValue::Node(bound)) => {
                    if bound.id != node.id {
                        continue;
                    }
                    out.push(binding.clone());
                }
                Some(_) => continue,
                None => {
                    let mut extended = binding.clone();
                    extended.set(step.variable.clone(), BindingValue::Node(node.clone()));
                    out.push(extended);
                }
            }
        }
    }
    ctx.results = out;
    Ok(())
}

pub(crate) fn execute_vector_search(
    ctx: &mut ExecutionContext,
    step: &VectorSearchStep,
) -> Result<(), ExecError> {
    // The query vector may reference $params carried in the seed binding.
    let seed = ctx.results.first().cloned().unwrap_or_default();
    let evaluator = ctx.evaluator();
    let query = match evaluator.eval_value(&step.query, &seed)? {
        Value::Vector(v) => v,
        other => {
            return Err(EvalError::TypeMismatch(format!(
                "vector search query must be a Vector, got {}",
                other.type_name()
            ))
            .into())
        }
    };

    let hits = match ctx.vector {
        Some(provider) => provider.search(&step.property, &query, step.k, step.ef)?,
        None => ctx
            .graph
            .vector_search(&step.property, &query, step.k, step.ef)?,
    };
    log::debug!(
        "vector search on {} returned {} candidate(s)",
        step.property,
        hits.len()
    );

    let incoming = std::mem::take(&mut ctx.results);
    let mut out = Vec::new();
    for binding in &incoming {
        for (id, distance) in &hits {
            ctx.check_cancellation()?;
            let node = match ctx.vector {
                Some(provider) => provider.get_node(*id)?,
                None => ctx.graph.get_node(*id)?,
            };
            let mut extended = binding.clone();
            extended.set(step.variable.clone(), BindingValue::Node(node));
            // Distance from the index becomes a similarity score in the
            // side-channel, projectable as `<var>.similarity_score`.
            extended.set_vector_score(step.variable.clone(), 1.0 - distance);
            out.push(extended);
        }
    }
    ctx.results = out;
    Ok(())
}
