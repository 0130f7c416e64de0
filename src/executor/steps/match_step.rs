//! MATCH / OPTIONAL MATCH pattern evaluation.
//!
//! For each incoming binding and each path pattern, enumerate the
//! subgraphs matching the pattern extended by that binding. Single-node
//! patterns scan (label index when available, id scan otherwise) or
//! validate an already-bound node; path patterns extend node by node
//! along relationship constraints; multiple patterns in one MATCH form a
//! guarded cartesian product. Variable-length segments expand through the
//! traverser and bind the relationship variable to the list of edges
//! walked.

use crate::binding::{BindingSet, BindingValue};
use crate::cypher_parser::ast::{NodePattern, PathPattern, PatternValue, RelationshipPattern};
use crate::executor::context::ExecutionContext;
use crate::executor::errors::ExecError;
use crate::executor::steps::filter_step;
use crate::graph::{Direction, Edge, Node, StoreError};
use crate::planner::plan::FilterStep;
use crate::traverser::Traverser;

pub(crate) fn execute_match(
    ctx: &mut ExecutionContext,
    patterns: &[PathPattern],
) -> Result<(), ExecError> {
    let incoming = std::mem::take(&mut ctx.results);
    let mut out = Vec::new();
    for binding in &incoming {
        ctx.check_cancellation()?;
        out.extend(match_patterns(ctx, binding, patterns)?);
    }
    ctx.results = out;
    Ok(())
}

pub(crate) fn execute_optional_match(
    ctx: &mut ExecutionContext,
    patterns: &[PathPattern],
    filter: Option<&FilterStep>,
) -> Result<(), ExecError> {
    let incoming = std::mem::take(&mut ctx.results);
    let mut out = Vec::new();
    for binding in &incoming {
        ctx.check_cancellation()?;
        let mut rows = match_patterns(ctx, binding, patterns)?;
        if let Some(filter) = filter {
            // The attached WHERE applies within the optional fan-out,
            // before the Null-carrying binding is emitted.
            rows = filter_step::filter_rows(ctx, rows, filter)?;
        }
        if rows.is_empty() {
            let mut padded = binding.clone();
            for pattern in patterns {
                for variable in pattern.variables() {
                    if !padded.contains(variable) {
                        padded.set(variable, BindingValue::null());
                    }
                }
            }
            out.push(padded);
        } else {
            out.extend(rows);
        }
    }
    ctx.results = out;
    Ok(())
}

/// Evaluate a pattern list against one binding: each pattern extends the
/// rows the previous one produced, with the cartesian guard applied to
/// the growing product.
pub(crate) fn match_patterns(
    ctx: &ExecutionContext,
    binding: &BindingSet,
    patterns: &[PathPattern],
) -> Result<Vec<BindingSet>, ExecError> {
    let limit = ctx.config.max_cartesian_product_results;
    let mut rows = vec![binding.clone()];
    for pattern in patterns {
        let mut next = Vec::new();
        for row in &rows {
            ctx.check_cancellation()?;
            next.extend(match_single_pattern(ctx, row, pattern)?);
            if next.len() > limit {
                return Err(ExecError::CartesianLimit {
                    size: next.len(),
                    limit,
                });
            }
        }
        rows = next;
    }
    Ok(rows)
}

fn match_single_pattern(
    ctx: &ExecutionContext,
    binding: &BindingSet,
    pattern: &PathPattern,
) -> Result<Vec<BindingSet>, ExecError> {
    if pattern.nodes.is_empty() {
        return Ok(vec![binding.clone()]);
    }

    // (binding, current path endpoint)
    let mut states = node_candidates(ctx, binding, &pattern.nodes[0])?;
    for (index, relationship) in pattern.relationships.iter().enumerate() {
        let target_pattern = &pattern.nodes[index + 1];
        let mut next_states = Vec::new();
        for (state, node) in &states {
            ctx.check_cancellation()?;
            if relationship.is_variable_length() {
                extend_variable_length(
                    ctx,
                    state,
                    node,
                    relationship,
                    target_pattern,
                    &mut next_states,
                )?;
            } else {
                extend_single_hop(
                    ctx,
                    state,
                    node,
                    relationship,
                    target_pattern,
                    &mut next_states,
                )?;
            }
        }
        states = next_states;
    }
    Ok(states.into_iter().map(|(binding, _)| binding).collect())
}

/// Candidate (binding, node) pairs for the first node of a pattern.
fn node_candidates(
    ctx: &ExecutionContext,
    binding: &BindingSet,
    pattern: &NodePattern,
) -> Result<Vec<(BindingSet, Node)>, ExecError> {
    // Already-bound variable: validate instead of scanning.
    if let Some(variable) = &pattern.variable {
        if let Some(bound) = binding.get(variable) {
            return match bound {
                BindingValue::Node(node) => {
                    if node_matches(node, pattern)? {
                        Ok(vec![(binding.clone(), node.clone())])
                    } else {
                        Ok(Vec::new())
                    }
                }
                _ => Ok(Vec::new()),
            };
        }
    }

    let mut candidates = Vec::new();
    let mut push = |node: Node, candidates: &mut Vec<(BindingSet, Node)>| {
        let mut extended = binding.clone();
        if let Some(variable) = &pattern.variable {
            extended.set(variable.clone(), BindingValue::Node(node.clone()));
        }
        candidates.push((extended, node));
    };

    if let Some(first_label) = pattern.labels.first() {
        for node in ctx.graph.find_nodes_by_label(first_label)? {
            ctx.check_cancellation()?;
            if node_matches(&node, pattern)? {
                push(node, &mut candidates);
            }
        }
    } else {
        let node_count = ctx.graph.get_statistics().node_count;
        for id in 1..=node_count {
            ctx.check_cancellation()?;
            let node = match ctx.graph.get_node(id) {
                Ok(node) => node,
                // Ids are monotonic, so deleted ids leave holes in a scan.
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            if node_matches(&node, pattern)? {
                push(node, &mut candidates);
            }
        }
    }
    Ok(candidates)
}

fn extend_single_hop(
    ctx: &ExecutionContext,
    binding: &BindingSet,
    node: &Node,
    relationship: &RelationshipPattern,
    target_pattern: &NodePattern,
    out: &mut Vec<(BindingSet, Node)>,
) -> Result<(), ExecError> {
    for edge in edges_by_direction(ctx, node.id, relationship.direction)? {
        ctx.check_cancellation()?;
        if !edge_matches(&edge, relationship)? {
            continue;
        }
        // A bound relationship variable pins the edge.
        if let Some(variable) = &relationship.variable {
            if let Some(BindingValue::Edge(bound)) = binding.get(variable) {
                if bound.id != edge.id {
                    continue;
                }
            }
        }
        let target_id = match relationship.direction {
            Direction::Outgoing => edge.to,
            Direction::Incoming => edge.from,
            Direction::Both => edge.other_endpoint(node.id),
        };
        let target = ctx.graph.get_node(target_id)?;
        let Some(mut extended) = bind_target(binding, &target, target_pattern)? else {
            continue;
        };
        if let Some(variable) = &relationship.variable {
            extended.set(variable.clone(), BindingValue::Edge(edge.clone()));
        }
        out.push((extended, target));
    }
    Ok(())
}

fn extend_variable_length(
    ctx: &ExecutionContext,
    binding: &BindingSet,
    node: &Node,
    relationship: &RelationshipPattern,
    target_pattern: &NodePattern,
    out: &mut Vec<(BindingSet, Node)>,
) -> Result<(), ExecError> {
    let min = relationship.min_hops.unwrap_or(1);
    let max = relationship
        .max_hops
        .unwrap_or(ctx.config.max_traversal_depth)
        .min(ctx.config.max_traversal_depth);
    let traverser = Traverser::new(ctx.graph);
    let paths = traverser.expand_variable_length(
        node.id,
        relationship.direction,
        relationship.rel_type.as_deref(),
        min,
        max,
    )?;
    for path in paths {
        ctx.check_cancellation()?;
        let mut ok = true;
        for edge in &path.edges {
            if !properties_match(&edge.properties, &relationship.properties)? {
                ok = false;
                break;
            }
        }
        if !ok {
            continue;
        }
        let end = path.end().clone();
        let Some(mut extended) = bind_target(binding, &end, target_pattern)? else {
            continue;
        };
        if let Some(variable) = &relationship.variable {
            extended.set(
                variable.clone(),
                BindingValue::List(path.edges.iter().cloned().map(BindingValue::Edge).collect()),
            );
        }
        out.push((extended, end));
    }
    Ok(())
}

/// Validate `target` against the pattern node and produce the extended
/// binding, or None when the node does not fit.
fn bind_target(
    binding: &BindingSet,
    target: &Node,
    pattern: &NodePattern,
) -> Result<Option<BindingSet>, ExecError> {
    if !node_matches(target, pattern)? {
        return Ok(None);
    }
    if let Some(variable) = &pattern.variable {
        match binding.get(variable) {
            Some(BindingValue::Node(bound)) => {
                if bound.id != target.id {
                    return Ok(None);
                }
                return Ok(Some(binding.clone()));
            }
            Some(_) => return Ok(None),
            None => {
                let mut extended = binding.clone();
                extended.set(variable.clone(), BindingValue::Node(target.clone()));
                return Ok(Some(extended));
            }
        }
    }
    Ok(Some(binding.clone()))
}

pub(crate) fn edges_by_direction(
    ctx: &ExecutionContext,
    id: u64,
    direction: Direction,
) -> Result<Vec<Edge>, ExecError> {
    let edges = match direction {
        Direction::Outgoing => ctx.graph.get_outgoing_edges(id)?,
        Direction::Incoming => ctx.graph.get_incoming_edges(id)?,
        Direction::Both => {
            let mut edges = ctx.graph.get_outgoing_edges(id)?;
            edges.extend(ctx.graph.get_incoming_edges(id)?);
            edges
        }
    };
    Ok(edges)
}

pub(crate) fn node_matches(node: &Node, pattern: &NodePattern) -> Result<bool, ExecError> {
    if !pattern.labels.iter().all(|label| node.has_label(label)) {
        return Ok(false);
    }
    properties_match(&node.properties, &pattern.properties)
}

fn edge_matches(edge: &Edge, pattern: &RelationshipPattern) -> Result<bool, ExecError> {
    if let Some(rel_type) = &pattern.rel_type {
        if edge.edge_type != *rel_type {
            return Ok(false);
        }
    }
    properties_match(&edge.properties, &pattern.properties)
}

/// Pattern property equality uses storage Value equality after coercion.
/// Unresolved parameters mean the binder was skipped for a parameterized
/// plan.
pub(crate) fn properties_match(
    properties: &std::collections::HashMap<String, crate::value::Value>,
    constraints: &[(String, PatternValue)],
) -> Result<bool, ExecError> {
    for (key, constraint) in constraints {
        let expected = match constraint {
            PatternValue::Literal(value) => value,
            PatternValue::Parameter(name) => {
                return Err(ExecError::MissingParameter(name.clone()));
            }
        };
        match properties.get(key) {
            Some(actual) if actual.strict_eq(expected) => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}
