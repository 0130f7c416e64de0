use thiserror::Error;

use crate::evaluator::errors::EvalError;
use crate::graph::StoreError;
use crate::traverser::errors::TraversalError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecError {
    #[error("missing parameter: ${0}")]
    MissingParameter(String),

    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    #[error("cartesian product limit exceeded ({size} rows, limit {limit})")]
    CartesianLimit { size: usize, limit: usize },

    #[error("query cancelled")]
    Cancelled,

    #[error("query timed out")]
    Timeout,

    #[error("execution failure: {0}")]
    ExecutionFailure(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),
}
