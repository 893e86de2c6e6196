//! The `Aggregate` operator (§4.4): buffers input, hash group-by on the
//! group identities, then applies each aggregate's kernel within every
//! group. `COUNT(*)` with no `GROUP BY` is special-cased to sum input row
//! counts without ever materializing a value (Testable Property 7).
//!
//! A handful of kernels (`LIST`, `DISTINCT`, `MIN_MAX`, multi-point
//! `QUANTILES`) naturally produce a composite value, but this engine's
//! [`Array`]/[`ScalarValue`] vocabulary has no list/struct variant to carry
//! one (`DataType::List` exists as a type tag but nothing constructs it).
//! Those kernels render their result as a delimited string in a UTF8
//! column instead; see `DESIGN.md`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use flint_connector::ConnectorRegistry;
use flint_core::expr::{Expr, ExprKind};
use flint_core::functions::{self, AggregateKind};
use flint_core::logical::AggregateStep;
use flint_core::schema::ColumnId;
use flint_error::{EngineError, ErrorKind, Result};
use flint_types::{Array, Morsel, ScalarValue};

use crate::evaluator::{evaluate, scalars_to_array, EvalCache};
use crate::operator::OperatorStream;

pub fn build_aggregate(
    step: &AggregateStep,
    mut upstream: OperatorStream,
    schema: Vec<ColumnId>,
    output: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    if step.groups.is_empty() && is_bare_count_star(step) {
        let mut total: i64 = 0;
        for morsel in upstream.by_ref() {
            total += morsel?.num_rows() as i64;
        }
        let column = Array::Int64(flint_types::array::PrimitiveArray::from_values(vec![total]));
        return Ok(Box::new(std::iter::once(Morsel::try_new(vec![column]))));
    }

    let mut morsels = Vec::new();
    for morsel in upstream.by_ref() {
        morsels.push(morsel?);
    }
    let combined = match morsels.into_iter().reduce(|a, b| a.concat(&b).unwrap_or(a)) {
        Some(m) => m,
        None => return Err(EngineError::new(ErrorKind::EmptyResultSet, "aggregate input produced zero rows")),
    };

    let mut cache = EvalCache::new();
    let group_arrays: Vec<Array> = step
        .groups
        .iter()
        .map(|e| evaluate(e, &combined, &schema, &registry, &mut cache))
        .collect::<Result<_>>()?;

    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut group_order: Vec<String> = Vec::new();
    for row in 0..combined.num_rows() {
        let mut key = String::new();
        for arr in &group_arrays {
            if arr.is_valid(row) {
                let _ = write!(key, "{}\u{1f}", arr.scalar(row));
            } else {
                key.push_str("\u{1f}NULL\u{1f}");
            }
        }
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }

    let specs: Vec<AggSpec> = step
        .aggregates
        .iter()
        .map(|e| AggSpec::new(e, &combined, &schema, &registry, &mut cache))
        .collect::<Result<_>>()?;

    let mut out_group_cols: Vec<Vec<ScalarValue>> = vec![Vec::with_capacity(group_order.len()); group_arrays.len()];
    let mut out_agg_cols: Vec<Vec<ScalarValue>> = vec![Vec::with_capacity(group_order.len()); specs.len()];

    for key in &group_order {
        let rows = &groups[key];
        let first_row = rows[0];
        for (i, arr) in group_arrays.iter().enumerate() {
            out_group_cols[i].push(arr.scalar(first_row));
        }
        for (i, spec) in specs.iter().enumerate() {
            out_agg_cols[i].push(spec.compute(rows));
        }
    }

    let mut columns = Vec::with_capacity(output.len());
    for col in out_group_cols {
        columns.push(scalars_to_array(col));
    }
    for col in out_agg_cols {
        columns.push(scalars_to_array(col));
    }
    Ok(Box::new(std::iter::once(Morsel::try_new(columns))))
}

fn is_bare_count_star(step: &AggregateStep) -> bool {
    if step.aggregates.len() != 1 {
        return false;
    }
    match &step.aggregates[0].kind {
        ExprKind::Aggregator { name, args, .. } => name.eq_ignore_ascii_case("COUNT") && args.is_empty(),
        _ => false,
    }
}

struct AggSpec {
    kind: AggregateKind,
    distinct: bool,
    /// One evaluated value per input row, or `None` for `COUNT(*)` within a
    /// `GROUP BY`, which counts rows rather than non-null values.
    values: Option<Vec<ScalarValue>>,
}

impl AggSpec {
    fn new(
        expr: &Expr,
        morsel: &Morsel,
        schema: &[ColumnId],
        registry: &Arc<ConnectorRegistry>,
        cache: &mut EvalCache,
    ) -> Result<Self> {
        let ExprKind::Aggregator { name, args, distinct } = &expr.kind else {
            return Err(EngineError::new(ErrorKind::InvalidInternalState, "non-aggregator expression in AggregateStep.aggregates"));
        };
        let kind = match functions::lookup(name).map(|s| s.kind) {
            Some(functions::FunctionKind::Aggregate(k)) => k,
            _ => return Err(EngineError::new(ErrorKind::FunctionNotFound, format!("unknown aggregate function '{name}'"))),
        };
        let values = match args.first() {
            Some(arg) => {
                let array = evaluate(arg, morsel, schema, registry, cache)?;
                Some((0..array.len()).map(|i| array.scalar(i)).collect())
            }
            None => None,
        };
        Ok(AggSpec { kind, distinct: *distinct, values })
    }

    fn compute(&self, rows: &[usize]) -> ScalarValue {
        match &self.values {
            None => ScalarValue::Int64(rows.len() as i64),
            Some(values) => {
                let mut group_values: Vec<ScalarValue> = rows.iter().map(|&r| values[r].clone()).collect();
                if self.distinct {
                    group_values = dedupe_scalars(group_values);
                }
                compute_kernel(self.kind, group_values)
            }
        }
    }
}

fn dedupe_scalars(values: Vec<ScalarValue>) -> Vec<ScalarValue> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for v in values {
        let fingerprint = v.to_string();
        if seen.insert(fingerprint) {
            out.push(v);
        }
    }
    out
}

fn compute_kernel(kind: AggregateKind, values: Vec<ScalarValue>) -> ScalarValue {
    let non_null: Vec<&ScalarValue> = values.iter().filter(|v| !v.is_null()).collect();
    match kind {
        AggregateKind::Count => ScalarValue::Int64(non_null.len() as i64),
        AggregateKind::CountDistinct => {
            let deduped = dedupe_scalars(non_null.iter().map(|v| (*v).clone()).collect());
            ScalarValue::Int64(deduped.len() as i64)
        }
        AggregateKind::Sum => {
            if non_null.is_empty() {
                return ScalarValue::Null;
            }
            let all_int = non_null.iter().all(|v| matches!(v, ScalarValue::Int64(_)));
            let sum: f64 = non_null.iter().filter_map(|v| v.as_f64()).sum();
            if all_int {
                ScalarValue::Int64(sum as i64)
            } else {
                ScalarValue::Float64(sum)
            }
        }
        AggregateKind::Product => {
            if non_null.is_empty() {
                return ScalarValue::Null;
            }
            let all_int = non_null.iter().all(|v| matches!(v, ScalarValue::Int64(_)));
            let product: f64 = non_null.iter().filter_map(|v| v.as_f64()).product();
            if all_int {
                ScalarValue::Int64(product as i64)
            } else {
                ScalarValue::Float64(product)
            }
        }
        AggregateKind::Mean => {
            if non_null.is_empty() {
                return ScalarValue::Null;
            }
            let sum: f64 = non_null.iter().filter_map(|v| v.as_f64()).sum();
            ScalarValue::Float64(sum / non_null.len() as f64)
        }
        AggregateKind::Min => non_null
            .into_iter()
            .cloned()
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(ScalarValue::Null),
        AggregateKind::Max => non_null
            .into_iter()
            .cloned()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(ScalarValue::Null),
        AggregateKind::MinMax => {
            let min = non_null
                .iter()
                .cloned()
                .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let max = non_null
                .iter()
                .cloned()
                .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            match (min, max) {
                (Some(min), Some(max)) => ScalarValue::Utf8(format!("{min}..{max}")),
                _ => ScalarValue::Null,
            }
        }
        AggregateKind::Stddev | AggregateKind::Variance => {
            if non_null.len() < 2 {
                return ScalarValue::Null;
            }
            let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            let mean = nums.iter().sum::<f64>() / nums.len() as f64;
            let variance = nums.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nums.len() as f64;
            if kind == AggregateKind::Stddev {
                ScalarValue::Float64(variance.sqrt())
            } else {
                ScalarValue::Float64(variance)
            }
        }
        AggregateKind::ApproxMedian => {
            if non_null.is_empty() {
                return ScalarValue::Null;
            }
            let mut nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            ScalarValue::Float64(nums[nums.len() / 2])
        }
        AggregateKind::Quantiles => {
            if non_null.is_empty() {
                return ScalarValue::Null;
            }
            let mut nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let at = |q: f64| nums[((nums.len() as f64 - 1.0) * q).round() as usize];
            ScalarValue::Utf8(format!("{}|{}|{}", at(0.25), at(0.5), at(0.75)))
        }
        AggregateKind::All => ScalarValue::Boolean(non_null.iter().all(|v| v.as_bool() == Some(true))),
        AggregateKind::Any => ScalarValue::Boolean(non_null.iter().any(|v| v.as_bool() == Some(true))),
        AggregateKind::List => ScalarValue::Utf8(
            values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","),
        ),
        AggregateKind::Distinct => {
            let deduped = dedupe_scalars(non_null.iter().map(|v| (*v).clone()).collect());
            ScalarValue::Utf8(deduped.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","))
        }
    }
}
