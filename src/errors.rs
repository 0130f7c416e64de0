//! Crate-level error union: everything [`crate::executor::Executor`] can
//! return.

use thiserror::Error;

use crate::config::ConfigError;
use crate::cypher_parser::errors::ParserError;
use crate::evaluator::errors::EvalError;
use crate::executor::errors::ExecError;
use crate::executor::sanitize::SanitizeError;
use crate::graph::StoreError;
use crate::traverser::errors::TraversalError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
