//! Per-invocation execution state.
//!
//! The context owns the current row list, the graph handle and the
//! cancellation token. It is created per execution and never shared;
//! cached plans stay free of per-invocation state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::binding::BindingSet;
use crate::config::EngineConfig;
use crate::evaluator::Evaluator;
use crate::executor::errors::ExecError;
use crate::executor::VectorProvider;
use crate::functions::FunctionRegistry;
use crate::graph::GraphStore;

/// Cooperative cancellation: an atomic flag plus an optional deadline.
/// Cloning shares the flag; the deadline is per-clone.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

pub struct ExecutionContext<'a> {
    /// Current row set; every step consumes and replaces it.
    pub results: Vec<BindingSet>,
    pub graph: &'a dyn GraphStore,
    pub functions: &'a FunctionRegistry,
    pub config: &'a EngineConfig,
    pub vector: Option<&'a dyn VectorProvider>,
    pub cancel: CancellationToken,
    /// Lenient-mode diagnostics (dropped filter rows, tolerated deletes).
    pub warnings: Vec<String>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        graph: &'a dyn GraphStore,
        functions: &'a FunctionRegistry,
        config: &'a EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        ExecutionContext {
            // A single empty row lets scans and CREATE run without MATCH.
            results: vec![BindingSet::new()],
            graph,
            functions,
            config,
            vector: None,
            cancel,
            warnings: Vec::new(),
        }
    }

    /// Steps call this at least every 1024 input rows; loop bodies sample
    /// it between iterations.
    pub fn check_cancellation(&self) -> Result<(), ExecError> {
        if self.cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        if self.cancel.deadline_exceeded() {
            return Err(ExecError::Timeout);
        }
        Ok(())
    }

    pub fn evaluator(&self) -> Evaluator<'a> {
        Evaluator::new(self.functions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_flag_is_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_deadline() {
        let token = CancellationToken::with_deadline(Instant::now() - Duration::from_secs(1));
        assert!(token.deadline_exceeded());
        let token = CancellationToken::with_deadline(Instant::now() + Duration::from_secs(60));
        assert!(!token.deadline_exceeded());
    }
}
