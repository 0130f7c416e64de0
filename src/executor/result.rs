//! Result building and post-processing.
//!
//! Projection, aggregation, DISTINCT, ORDER BY, SKIP and LIMIT all happen
//! here (the plan's ReturnStep is a marker) so they compose correctly with
//! grouping. Post-processing order: DISTINCT, ORDER BY (stable, keyed on
//! the first item), SKIP, LIMIT.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::binding::{BindingSet, BindingValue};
use crate::cypher_parser::ast::{Query, ReturnItem, SortOrder};
use crate::evaluator::Evaluator;
use crate::executor::aggregate;
use crate::executor::errors::ExecError;
use crate::functions::FunctionRegistry;
use crate::value::Value;

/// Per-step timing captured by PROFILE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub step: String,
    pub duration: Duration,
    pub rows_in: usize,
    pub rows_out: usize,
}

/// Materialized query result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, BindingValue>>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<ProfileEntry>>,
}

impl ResultSet {
    pub fn empty() -> Self {
        ResultSet::default()
    }

    /// Convenience accessor: the cell of `column` in row `index`.
    pub fn cell(&self, index: usize, column: &str) -> Option<&BindingValue> {
        self.rows.get(index).and_then(|row| row.get(column))
    }
}

/// One projected row plus the binding it came from (kept for ORDER BY
/// expressions that reference unprojected properties).
struct ProjectedRow {
    cells: HashMap<String, BindingValue>,
    source: Option<BindingSet>,
}

/// Build the result set for a finished segment.
pub(crate) fn build_result(
    bindings: &[BindingSet],
    query: &Query,
    functions: &FunctionRegistry,
) -> Result<ResultSet, ExecError> {
    let Some(ret) = &query.return_clause else {
        // Mutation-only query: no projection.
        return Ok(ResultSet::empty());
    };
    let evaluator = Evaluator::new(functions);
    let columns: Vec<String> = ret.items.iter().map(ReturnItem::column_name).collect();
    let has_aggregate = ret.items.iter().any(|item| item.aggregate.is_some());

    let mut rows: Vec<ProjectedRow> = Vec::new();
    if has_aggregate {
        let groups = aggregate::group_bindings(bindings, &ret.group_by, &evaluator)?;
        for group in groups {
            let mut cells = HashMap::with_capacity(ret.items.len());
            for item in &ret.items {
                let name = item.column_name();
                let cell = match item.aggregate {
                    Some(agg) => {
                        aggregate::reduce(agg, item.expression.as_ref(), &group, &evaluator)?
                    }
                    None => match (&item.expression, group.first()) {
                        (Some(expr), Some(first)) => evaluator.eval(expr, first)?,
                        _ => BindingValue::null(),
                    },
                };
                cells.insert(name, cell);
            }
            rows.push(ProjectedRow {
                cells,
                source: group.first().map(|b| (*b).clone()),
            });
        }
    } else {
        for binding in bindings {
            let mut cells = HashMap::with_capacity(ret.items.len());
            for item in &ret.items {
                let name = item.column_name();
                let cell = match &item.expression {
                    Some(expr) => evaluator.eval(expr, binding)?,
                    None => BindingValue::null(),
                };
                cells.insert(name, cell);
            }
            rows.push(ProjectedRow {
                cells,
                source: Some(binding.clone()),
            });
        }
    }

    if ret.distinct {
        rows = distinct_rows(rows, &columns);
    }

    if let Some(order_by) = &query.order_by {
        if let Some(first) = order_by.items.first() {
            let descending = first.order == SortOrder::Desc;
            // Stable sort keyed on the first ORDER BY item.
            let mut keyed: Vec<(Value, ProjectedRow)> = rows
                .into_iter()
                .map(|row| {
                    let key = sort_key(&row, &first.expression, &evaluator);
                    (key, row)
                })
                .collect();
            keyed.sort_by(|a, b| {
                let ordering = a.0.cmp_total(&b.0);
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
            rows = keyed.into_iter().map(|(_, row)| row).collect();
        }
    }

    if let Some(skip) = query.skip {
        let skip = skip.max(0) as usize;
        rows = if skip >= rows.len() {
            Vec::new()
        } else {
            rows.split_off(skip)
        };
    }

    // LIMIT 0 means no limit.
    if let Some(limit) = query.limit {
        if limit > 0 {
            rows.truncate(limit as usize);
        }
    }

    let rows: Vec<HashMap<String, BindingValue>> = rows.into_iter().map(|r| r.cells).collect();
    let count = rows.len();
    Ok(ResultSet {
        columns,
        rows,
        count,
        profile: None,
    })
}

/// ORDER BY key for one row: a projected column wins (covers aliases and
/// aggregate columns), otherwise the expression evaluates against the
/// source binding. Failures sort as Null.
fn sort_key(row: &ProjectedRow, expr: &crate::cypher_parser::ast::Expression, evaluator: &Evaluator) -> Value {
    let column = expr.default_column_name();
    if let Some(cell) = row.cells.get(&column) {
        return cell.as_value();
    }
    match &row.source {
        Some(binding) => evaluator.eval_value(expr, binding).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

fn row_fingerprint(cells: &HashMap<String, BindingValue>, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("{:?}", cells.get(c)))
        .collect::<Vec<String>>()
        .join("\x1f")
}

fn distinct_rows(rows: Vec<ProjectedRow>, columns: &[String]) -> Vec<ProjectedRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row_fingerprint(&row.cells, columns)))
        .collect()
}

/// Combine a UNION's two sides. The left side names the result columns;
/// right-hand rows are renamed onto them positionally. Without ALL the
/// combined rows deduplicate by content.
pub(crate) fn merge_union(mut left: ResultSet, right: ResultSet, all: bool) -> ResultSet {
    let columns = if left.columns.is_empty() {
        right.columns.clone()
    } else {
        left.columns.clone()
    };
    for row in right.rows {
        if right.columns == columns {
            left.rows.push(row);
            continue;
        }
        let mut renamed = HashMap::with_capacity(row.len());
        for (index, right_column) in right.columns.iter().enumerate() {
            if let (Some(column), Some(value)) = (columns.get(index), row.get(right_column)) {
                renamed.insert(column.clone(), value.clone());
            }
        }
        left.rows.push(renamed);
    }
    if !all {
        let mut seen = std::collections::HashSet::new();
        left.rows
            .retain(|row| seen.insert(row_fingerprint(row, &columns)));
    }
    left.columns = columns;
    left.count = left.rows.len();
    left
}
