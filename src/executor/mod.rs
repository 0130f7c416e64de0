//! Query executor: the public entry point of the engine.
//!
//! A textual query flows sanitize → lex → parse → plan → optimize (cached
//! as a whole) → bind parameters → execute steps → build result. WITH
//! chains segments through projected bindings; UNION combines two
//! segments' result sets. EXPLAIN renders the optimized plan without
//! executing; PROFILE wraps every step with a monotonic stopwatch. A
//! catch_unwind boundary translates unexpected runtime failures into
//! ExecutionFailure so a bad query can't take the host down.

pub mod aggregate;
pub mod context;
pub mod errors;
pub mod params;
pub mod plan_cache;
pub mod result;
pub mod sanitize;
pub mod steps;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::binding::{BindingSet, BindingValue};
use crate::cypher_parser::ast::Query;
use crate::cypher_parser::parse_query;
use crate::errors::EngineError;
use crate::evaluator::errors::EvalError;
use crate::evaluator::Evaluator;
use crate::functions::{self, FunctionRegistry};
use crate::graph::{GraphStore, Node, StoreError};
use crate::planner::optimizer::Optimizer;
use crate::planner::plan::Plan;
use crate::planner::PlanBuilder;
use crate::traverser::Traverser;
use crate::value::Value;

use context::{CancellationToken, ExecutionContext};
use errors::ExecError;
use plan_cache::{PlanCache, PlanCacheConfig, PlanCacheMetrics};
use result::{ProfileEntry, ResultSet};
use sanitize::TimeoutPolicy;

pub use crate::config::EngineConfig;

/// Marker for an attached full-text index. Its presence enables the
/// built-in `search(text, query)` scalar; scoring itself is done by the
/// engine.
pub trait SearchIndex: Send + Sync {}

/// External vector-search hooks: similarity scoring plus kNN candidate
/// production. When attached, VectorSearchStep and the built-in
/// `vector.similarity` scalar route through these instead of the store.
pub trait VectorProvider: Send + Sync {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f64;

    fn has_index(&self, property: &str) -> bool;

    fn search(
        &self,
        property: &str,
        query: &[f32],
        k: usize,
        ef: usize,
    ) -> Result<Vec<(u64, f64)>, StoreError>;

    fn get_node(&self, id: u64) -> Result<Node, StoreError>;
}

/// A query compiled once: parsed, planned, optimized, and free of
/// per-invocation state. Cached and shared across executions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub query: Query,
    pub plan: Plan,
    /// Continuation after WITH.
    pub next: Option<Box<CompiledQuery>>,
    /// (is_union_all, right-hand side).
    pub union: Option<(bool, Box<CompiledQuery>)>,
}

pub struct Executor {
    graph: Arc<dyn GraphStore>,
    functions: Arc<FunctionRegistry>,
    config: EngineConfig,
    optimizer: Optimizer,
    plan_cache: PlanCache,
    vector: RwLock<Option<Arc<dyn VectorProvider>>>,
    search: RwLock<Option<Arc<dyn SearchIndex>>>,
}

impl Executor {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self::with_config(graph, EngineConfig::default())
    }

    pub fn with_config(graph: Arc<dyn GraphStore>, config: EngineConfig) -> Self {
        let optimizer = Optimizer::new(&config);
        let plan_cache = PlanCache::new(PlanCacheConfig {
            enabled: config.plan_cache_enabled,
            max_entries: config.plan_cache_max_entries,
        });
        Executor {
            graph,
            functions: Arc::new(FunctionRegistry::new()),
            config,
            optimizer,
            plan_cache,
            vector: RwLock::new(None),
            search: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The scalar function registry, for registering custom functions
    /// during setup.
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Traversal primitives over the executor's graph.
    pub fn traverser(&self) -> Traverser<'_> {
        Traverser::new(self.graph.as_ref())
    }

    pub fn plan_cache_metrics(&self) -> PlanCacheMetrics {
        self.plan_cache.metrics()
    }

    /// Attach a full-text index; registers the built-in `search` scalar.
    pub fn set_search_index(&self, index: Arc<dyn SearchIndex>) {
        self.functions.register("search", functions::search_scalar());
        *self.search.write().unwrap() = Some(index);
    }

    pub fn has_search_index(&self) -> bool {
        self.search.read().unwrap().is_some()
    }

    /// Attach vector-search hooks; reroutes `vector.similarity` through
    /// the provider's scoring function.
    pub fn set_vector_search(&self, provider: Arc<dyn VectorProvider>) {
        let hook = Arc::clone(&provider);
        self.functions.register(
            "vector.similarity",
            Arc::new(move |args: &[Value]| {
                if args.len() != 2 {
                    return Err(EvalError::InvalidArgument(format!(
                        "vector.similarity() takes 2 arguments, got {}",
                        args.len()
                    )));
                }
                match (&args[0], &args[1]) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (Value::Vector(a), Value::Vector(b)) => {
                        Ok(Value::Float(hook.similarity(a, b)))
                    }
                    _ => Err(EvalError::TypeMismatch(
                        "vector.similarity() expects (Vector, Vector)".to_string(),
                    )),
                }
            }),
        );
        *self.vector.write().unwrap() = Some(provider);
    }

    pub fn execute(&self, query: &str) -> Result<ResultSet, EngineError> {
        self.execute_with_options(query, &HashMap::new(), None, None)
    }

    pub fn execute_with_params(
        &self,
        query: &str,
        parameters: &HashMap<String, Value>,
    ) -> Result<ResultSet, EngineError> {
        self.execute_with_options(query, parameters, None, None)
    }

    /// Full-control entry point: parameters, a timeout (clamped by the
    /// query timeout policy) and an external cancellation token.
    pub fn execute_with_options(
        &self,
        query: &str,
        parameters: &HashMap<String, Value>,
        timeout: Option<Duration>,
        cancel: Option<CancellationToken>,
    ) -> Result<ResultSet, EngineError> {
        let sanitized = sanitize::sanitize_query(query, self.config.max_query_length)?;
        let compiled = self.compiled(&sanitized)?;

        if compiled.query.explain {
            return Ok(build_explain(&compiled));
        }

        let bound = params::bind(&compiled, parameters)?;
        let timeout = TimeoutPolicy::query(&self.config).clamp(timeout);
        let mut cancel = cancel.unwrap_or_default();
        cancel.set_deadline(Instant::now() + timeout);

        // Safety net: unexpected runtime faults become ExecutionFailure
        // instead of unwinding into the caller.
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(&bound, parameters, &cancel)
        }));
        match outcome {
            Ok(result) => Ok(result?),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("query execution panicked: {}", message);
                Err(ExecError::ExecutionFailure(message).into())
            }
        }
    }

    /// Cache lookup, or parse + plan + optimize and insert.
    fn compiled(&self, sanitized: &str) -> Result<Arc<CompiledQuery>, EngineError> {
        if let Some(hit) = self.plan_cache.get(sanitized) {
            return Ok(hit);
        }
        let query = parse_query(sanitized)?;
        let compiled = Arc::new(self.compile(query));
        self.plan_cache
            .insert(sanitized.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    fn compile(&self, query: Query) -> CompiledQuery {
        let plan = PlanBuilder::build(&query);
        let plan = self.optimizer.optimize(plan, self.graph.as_ref());
        let next = query
            .next
            .as_deref()
            .map(|q| Box::new(self.compile(q.clone())));
        let union = query
            .union
            .as_ref()
            .map(|u| (u.all, Box::new(self.compile((*u.query).clone()))));
        CompiledQuery {
            query,
            plan,
            next,
            union,
        }
    }

    fn run(
        &self,
        compiled: &CompiledQuery,
        parameters: &HashMap<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, ExecError> {
        let params_binding = params::initial_binding(parameters);
        let vector = self.vector.read().unwrap().clone();
        let mut profile = compiled.query.profile.then(Vec::new);

        let mut result = self.run_segment(
            compiled,
            vec![params_binding.clone()],
            &params_binding,
            vector.as_deref(),
            cancel,
            &mut profile,
        )?;
        result.profile = profile;
        Ok(result)
    }

    fn run_segment(
        &self,
        compiled: &CompiledQuery,
        initial: Vec<BindingSet>,
        params_binding: &BindingSet,
        vector: Option<&dyn VectorProvider>,
        cancel: &CancellationToken,
        profile: &mut Option<Vec<ProfileEntry>>,
    ) -> Result<ResultSet, ExecError> {
        let mut ctx = ExecutionContext::new(
            self.graph.as_ref(),
            &self.functions,
            &self.config,
            cancel.clone(),
        );
        ctx.results = initial;
        ctx.vector = vector;

        for step in &compiled.plan.steps {
            let rows_in = ctx.results.len();
            let started = Instant::now();
            steps::execute_step(step, &mut ctx)?;
            if let Some(entries) = profile {
                entries.push(ProfileEntry {
                    step: step.name().to_string(),
                    duration: started.elapsed(),
                    rows_in,
                    rows_out: ctx.results.len(),
                });
            }
        }
        if !ctx.warnings.is_empty() {
            log::debug!("segment finished with {} warning(s)", ctx.warnings.len());
        }

        // WITH: project the intermediate rows and continue in the next
        // segment.
        if let (Some(with), Some(next)) = (&compiled.query.with_clause, &compiled.next) {
            let evaluator = Evaluator::new(&self.functions);
            let mut projected = Vec::with_capacity(ctx.results.len());
            for binding in &ctx.results {
                ctx.check_cancellation()?;
                let mut row = BindingSet::new();
                // Parameters cross the scope boundary.
                for (name, value) in binding.iter() {
                    if name.starts_with('$') {
                        row.set(name, value.clone());
                    }
                }
                for item in &with.items {
                    row.set(item.binding_name(), evaluator.eval(&item.expression, binding)?);
                }
                if let Some(predicate) = &with.where_clause {
                    if !evaluator.eval_bool(predicate, &row)? {
                        continue;
                    }
                }
                projected.push(row);
            }
            return self.run_segment(next, projected, params_binding, vector, cancel, profile);
        }

        let mut result = result::build_result(&ctx.results, &compiled.query, &self.functions)?;

        if let Some((all, right)) = &compiled.union {
            let right_result = self.run_segment(
                right,
                vec![params_binding.clone()],
                params_binding,
                vector,
                cancel,
                profile,
            )?;
            result = result::merge_union(result, right_result, *all);
        }
        Ok(result)
    }
}

/// EXPLAIN output: one `[step, detail]` row per plan step, across all
/// segments, without executing anything.
fn build_explain(compiled: &CompiledQuery) -> ResultSet {
    fn collect(compiled: &CompiledQuery, rows: &mut Vec<HashMap<String, BindingValue>>) {
        for step in &compiled.plan.steps {
            let mut row = HashMap::with_capacity(2);
            row.insert(
                "step".to_string(),
                BindingValue::Value(Value::String(step.name().to_string())),
            );
            row.insert(
                "detail".to_string(),
                BindingValue::Value(Value::String(step.detail())),
            );
            rows.push(row);
        }
        if let Some(next) = &compiled.next {
            collect(next, rows);
        }
        if let Some((_, union)) = &compiled.union {
            collect(union, rows);
        }
    }

    let mut rows = Vec::new();
    collect(compiled, &mut rows);
    let count = rows.len();
    ResultSet {
        columns: vec!["step".to_string(), "detail".to_string()],
        rows,
        count,
        profile: None,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
