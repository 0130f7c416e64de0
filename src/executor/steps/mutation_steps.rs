//! SET, REMOVE and DELETE.
//!
//! Property updates go through an immutable merge: the node's map is
//! cloned, modified and handed to the store's update operation; the
//! binding is refreshed so later steps observe the new value. Partial
//! effects from an aborted mutation stay committed (no transactional
//! rollback).

use std::collections::HashSet;

use crate::binding::BindingValue;
use crate::cypher_parser::ast::{RemoveItem, SetItem};
use crate::evaluator::errors::EvalError;
use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::graph::{Node, StoreError};
use crate::planner::plan::DeleteStep;

fn resolve_node_target(
    binding: &crate::binding::BindingSet,
    variable: &str,
) -> Result<Node, ExecError> {
    match binding.get(variable) {
        Some(BindingValue::Node(node)) => Ok(node.clone()),
        Some(_) => Err(EvalError::TypeMismatch(format!(
            "{} is not bound to a node",
            variable
        ))
        .into()),
        None => Err(ExecError::UnboundVariable(variable.to_string())),
    }
}

pub(crate) fn execute_set_items(
    ctx: &mut ExecutionContext,
    items: &[SetItem],
) -> Result<(), ExecError> {
    let evaluator = ctx.evaluator();
    let mut rows = std::mem::take(&mut ctx.results);
    for binding in &mut rows {
        ctx.check_cancellation()?;
        for item in items {
            let value = evaluator.eval_value(&item.value, binding)?;
            let node = resolve_node_target(binding, &item.variable)?;
            let mut properties = node.properties.clone();
            properties.insert(item.property.clone(), value);
            ctx.graph.update_node(node.id, properties.clone())?;
            let mut updated = node;
            updated.properties = properties;
            binding.set(item.variable.clone(), BindingValue::Node(updated));
        }
    }
    ctx.results = rows;
    Ok(())
}

pub(crate) fn execute_remove_items(
    ctx: &mut ExecutionContext,
    items: &[RemoveItem],
) -> Result<(), ExecError> {
    let mut rows = std::mem::take(&mut ctx.results);
    for binding in &mut rows {
        ctx.check_cancellation()?;
        for item in items {
            match item {
                RemoveItem::Property { variable, property } => {
                    let node = resolve_node_target(binding, variable)?;
                    let mut properties = node.properties.clone();
                    properties.remove(property);
                    ctx.graph.update_node(node.id, properties.clone())?;
                    let mut updated = node;
                    updated.properties = properties;
                    binding.set(variable.clone(), BindingValue::Node(updated));
                }
                RemoveItem::Label { variable, label } => {
                    let node = resolve_node_target(binding, variable)?;
                    let labels: Vec<String> = node
                        .labels
                        .iter()
                        .filter(|l| *l != label)
                        .cloned()
                        .collect();
                    ctx.graph.update_node_labels(node.id, labels.clone())?;
                    let mut updated = node;
                    updated.labels = labels;
                    binding.set(variable.clone(), BindingValue::Node(updated));
                }
            }
        }
    }
    ctx.results = rows;
    Ok(())
}

pub(crate) fn execute_delete(
    ctx: &mut ExecutionContext,
    step: &DeleteStep,
) -> Result<(), ExecError> {
    let rows = ctx.results.clone();
    let mut deleted: HashSet<u64> = HashSet::new();
    for binding in &rows {
        ctx.check_cancellation()?;
        for variable in &step.variables {
            match binding.get(variable) {
                Some(BindingValue::Node(node)) => {
                    if !deleted.insert(node.id) {
                        continue;
                    }
                    match ctx.graph.delete_node(node.id) {
                        Ok(()) => {
                            log::debug!("deleted node {} (detach={})", node.id, step.detach);
                        }
                        // Another row already deleted it.
                        Err(StoreError::NotFound(_)) => {
                            ctx.warnings
                                .push(format!("node {} already deleted", node.id));
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                // Non-node variables are silently skipped.
                _ => {}
            }
        }
    }
    Ok(())
}
