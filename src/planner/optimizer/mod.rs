//! Rule-based plan optimizer.
//!
//! Passes implement [`OptimizerPass`] and run in a fixed order:
//!
//! 1. [`IndexLookupPromotion`] — single-node MATCH + equality filter on an
//!    indexed property becomes an IndexLookupStep.
//! 2. [`VectorSearchPromotion`] — a `vector.similarity(...) > t` filter
//!    over a vector-indexed property gets a VectorSearchStep planted in
//!    front of the MATCH; the predicate stays for post-verification.
//! 3. [`LabelFilterFusion`] — label checks already enforced by a lookup
//!    step are dropped from downstream patterns.
//! 4. [`ConstantFolding`] — fully-literal sub-expressions are evaluated
//!    once.
//!
//! Every pass is idempotent and none reorders mutations, so the optimizer
//! never changes observable semantics beyond how candidates are produced.

mod constant_folding;
mod index_lookup;
mod label_fusion;
mod vector_search;

pub use constant_folding::ConstantFolding;
pub use index_lookup::IndexLookupPromotion;
pub use label_fusion::LabelFilterFusion;
pub use vector_search::VectorSearchPromotion;

use crate::config::EngineConfig;
use crate::cypher_parser::ast::{BinaryOp, Expression};
use crate::graph::GraphStore;
use crate::planner::plan::Plan;

pub trait OptimizerPass {
    fn name(&self) -> &'static str;

    fn apply(&self, plan: Plan, graph: &dyn GraphStore) -> Plan;
}

pub struct Optimizer {
    passes: Vec<Box<dyn OptimizerPass + Send + Sync>>,
}

impl Optimizer {
    pub fn new(config: &EngineConfig) -> Self {
        Optimizer {
            passes: vec![
                Box::new(IndexLookupPromotion),
                Box::new(VectorSearchPromotion::new(
                    config.vector_search_k,
                    config.vector_search_ef,
                )),
                Box::new(LabelFilterFusion),
                Box::new(ConstantFolding),
            ],
        }
    }

    pub fn optimize(&self, mut plan: Plan, graph: &dyn GraphStore) -> Plan {
        for pass in &self.passes {
            let before = plan.steps.len();
            plan = pass.apply(plan, graph);
            log::debug!(
                "optimizer pass {}: {} -> {} steps",
                pass.name(),
                before,
                plan.steps.len()
            );
        }
        plan
    }
}

/// Flatten an AND tree into its conjuncts.
pub(crate) fn split_conjuncts(expr: &Expression) -> Vec<Expression> {
    match expr {
        Expression::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            let mut out = split_conjuncts(left);
            out.extend(split_conjuncts(right));
            out
        }
        other => vec![other.clone()],
    }
}

/// Rebuild an AND tree; None when no conjuncts remain.
pub(crate) fn join_conjuncts(mut conjuncts: Vec<Expression>) -> Option<Expression> {
    let first = if conjuncts.is_empty() {
        return None;
    } else {
        conjuncts.remove(0)
    };
    Some(conjuncts.into_iter().fold(first, |acc, next| {
        Expression::Binary {
            op: BinaryOp::And,
            left: Box::new(acc),
            right: Box::new(next),
        }
    }))
}
