//! CREATE: materialize nodes first, then relationships.
//!
//! Node patterns whose variable is already bound in the first current
//! binding reuse that node; everything else is created. Variable bindings
//! for newly-created nodes and edges propagate to every current binding.
//! Relationship endpoints must be resolvable from the first current
//! binding, otherwise the step fails with UnboundVariable.

use std::collections::HashMap;

use crate::binding::{BindingSet, BindingValue};
use crate::cypher_parser::ast::{PathPattern, PatternValue};
use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::graph::{Direction, Node};
use crate::value::Value;

pub(crate) fn execute_create(
    ctx: &mut ExecutionContext,
    patterns: &[PathPattern],
) -> Result<(), ExecError> {
    for pattern in patterns {
        ctx.check_cancellation()?;
        create_pattern(ctx, pattern)?;
    }
    Ok(())
}

pub(crate) fn create_pattern(
    ctx: &mut ExecutionContext,
    pattern: &PathPattern,
) -> Result<(), ExecError> {
    let first = ctx.results.first().cloned().unwrap_or_default();

    // Nodes first: one per pattern position, reused when already bound.
    let mut nodes: Vec<Node> = Vec::with_capacity(pattern.nodes.len());
    let mut new_bindings: Vec<(String, BindingValue)> = Vec::new();
    for node_pattern in &pattern.nodes {
        if let Some(variable) = &node_pattern.variable {
            match first.get(variable) {
                Some(BindingValue::Node(bound)) => {
                    nodes.push(bound.clone());
                    continue;
                }
                Some(_) => return Err(ExecError::UnboundVariable(variable.clone())),
                None => {}
            }
        }
        let properties = resolve_properties(&node_pattern.properties)?;
        let node = ctx
            .graph
            .create_node(node_pattern.labels.clone(), properties)?;
        log::debug!("created node {}", node.id);
        if let Some(variable) = &node_pattern.variable {
            new_bindings.push((variable.clone(), BindingValue::Node(node.clone())));
        }
        nodes.push(node);
    }

    // Then relationships between consecutive positions.
    for (index, relationship) in pattern.relationships.iter().enumerate() {
        let rel_type = relationship.rel_type.as_deref().ok_or_else(|| {
            ExecError::ExecutionFailure("CREATE requires a relationship type".to_string())
        })?;
        let (from, to) = match relationship.direction {
            Direction::Outgoing | Direction::Both => (nodes[index].id, nodes[index + 1].id),
            Direction::Incoming => (nodes[index + 1].id, nodes[index].id),
        };
        let properties = resolve_properties(&relationship.properties)?;
        let weight = properties
            .get("weight")
            .and_then(Value::as_f64)
            .unwrap_or(1.0);
        let edge = ctx
            .graph
            .create_edge(from, to, rel_type, properties, weight)?;
        log::debug!("created edge {} ({} -> {})", edge.id, from, to);
        if let Some(variable) = &relationship.variable {
            new_bindings.push((variable.clone(), BindingValue::Edge(edge)));
        }
    }

    // Propagate new bindings to every current row.
    if ctx.results.is_empty() {
        ctx.results.push(BindingSet::new());
    }
    for binding in &mut ctx.results {
        for (name, value) in &new_bindings {
            binding.set(name.clone(), value.clone());
        }
    }
    Ok(())
}

/// Coerce pattern property values to store values; parameters must have
/// been substituted by the binder.
fn resolve_properties(
    properties: &[(String, PatternValue)],
) -> Result<HashMap<String, Value>, ExecError> {
    let mut out = HashMap::with_capacity(properties.len());
    for (key, value) in properties {
        match value {
            PatternValue::Literal(v) => {
                out.insert(key.clone(), v.clone());
            }
            PatternValue::Parameter(name) => {
                return Err(ExecError::MissingParameter(name.clone()));
            }
        }
    }
    Ok(out)
}
