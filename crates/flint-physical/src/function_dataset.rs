//! `FunctionDataset` leaves (§4.4): `VALUES`, `UNNEST`, `GENERATE_SERIES`,
//! and `FAKE` each manufacture rows with no upstream input, so building one
//! is just evaluating its `args` once against an empty context and handing
//! back a single morsel.

use std::sync::Arc;

use rand::Rng;

use flint_connector::ConnectorRegistry;
use flint_core::expr::{Expr, ExprKind};
use flint_core::logical::{FunctionDatasetKind, FunctionDatasetStep};
use flint_core::schema::{ColumnId, Disposition};
use flint_error::{EngineError, ErrorKind, Result};
use flint_types::array::PrimitiveArray;
use flint_types::{Array, DataType, Morsel, ScalarValue};

use crate::evaluator::{evaluate, scalars_to_array, EvalCache};
use crate::operator::OperatorStream;

pub fn build(step: &FunctionDatasetStep, _output: &[ColumnId], registry: &Arc<ConnectorRegistry>) -> Result<OperatorStream> {
    let columns = match step.function {
        FunctionDatasetKind::Values => build_values(step, registry)?,
        FunctionDatasetKind::GenerateSeries => build_generate_series(step, registry)?,
        FunctionDatasetKind::Unnest => build_unnest(step, registry)?,
        FunctionDatasetKind::Fake => build_fake(step, registry)?,
    };
    Ok(Box::new(std::iter::once(Morsel::try_new(columns))))
}

fn eval_literal(expr: &Expr, registry: &Arc<ConnectorRegistry>) -> Result<ScalarValue> {
    let empty = Morsel::empty_with_num_rows(1);
    let mut cache = EvalCache::new();
    // `VALUES`/`GENERATE_SERIES`/`UNNEST`/`FAKE` arguments are constant
    // expressions bound with no incoming relation, so an empty morsel is
    // always enough context to evaluate them.
    let arr = evaluate(expr, &empty, &[], registry, &mut cache)?;
    Ok(arr.scalar(0))
}

/// Rows are either an explicit `TUPLE(...)` per row, or (the degenerate,
/// single-row form the binder's own schema synthesis assumes) one value per
/// argument with no `TUPLE` wrapper at all.
fn values_rows(step: &FunctionDatasetStep) -> Vec<&[Expr]> {
    let all_tuples = !step.args.is_empty()
        && step.args.iter().all(|a| matches!(&a.kind, ExprKind::Function { name, .. } if name.eq_ignore_ascii_case("TUPLE")));
    if all_tuples {
        step.args
            .iter()
            .map(|a| match &a.kind {
                ExprKind::Function { args, .. } => args.as_slice(),
                _ => unreachable!(),
            })
            .collect()
    } else {
        vec![step.args.as_slice()]
    }
}

fn build_values(step: &FunctionDatasetStep, registry: &Arc<ConnectorRegistry>) -> Result<Vec<Array>> {
    let rows = values_rows(step);
    let num_columns = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut columns = Vec::with_capacity(num_columns);
    for c in 0..num_columns {
        let mut scalars = Vec::with_capacity(rows.len());
        for row in &rows {
            scalars.push(eval_literal(&row[c], registry)?);
        }
        columns.push(scalars_to_array(scalars));
    }
    Ok(columns)
}

fn build_generate_series(step: &FunctionDatasetStep, registry: &Arc<ConnectorRegistry>) -> Result<Vec<Array>> {
    let start = match step.args.first().map(|e| eval_literal(e, registry)).transpose()? {
        Some(ScalarValue::Int64(v)) => v,
        _ => return Err(EngineError::new(ErrorKind::InvalidFunctionParameter, "GENERATE_SERIES(start, stop[, step]) requires integer bounds")),
    };
    let stop = match step.args.get(1).map(|e| eval_literal(e, registry)).transpose()? {
        Some(ScalarValue::Int64(v)) => v,
        _ => return Err(EngineError::new(ErrorKind::InvalidFunctionParameter, "GENERATE_SERIES(start, stop[, step]) requires integer bounds")),
    };
    let step_by = match step.args.get(2).map(|e| eval_literal(e, registry)).transpose()? {
        Some(ScalarValue::Int64(v)) if v != 0 => v,
        Some(_) => return Err(EngineError::new(ErrorKind::InvalidFunctionParameter, "GENERATE_SERIES step must be a non-zero integer")),
        None => 1,
    };

    let mut values = Vec::new();
    let mut cur = start;
    if step_by > 0 {
        while cur <= stop {
            values.push(cur);
            cur += step_by;
        }
    } else {
        while cur >= stop {
            values.push(cur);
            cur += step_by;
        }
    }
    Ok(vec![Array::Int64(PrimitiveArray::from_values(values))])
}

fn build_unnest(step: &FunctionDatasetStep, registry: &Arc<ConnectorRegistry>) -> Result<Vec<Array>> {
    let source = step
        .args
        .first()
        .ok_or_else(|| EngineError::new(ErrorKind::InvalidFunctionParameter, "UNNEST() requires one argument"))?;
    let values = match eval_literal(source, registry)? {
        ScalarValue::Utf8(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
        ScalarValue::Null => Vec::new(),
        other => vec![other.to_string()],
    };
    Ok(vec![Array::Utf8(PrimitiveArray::from_values(values))])
}

const FAKE_NAMES: &[&str] = &["Ada", "Grace", "Linus", "Barbara", "Donald", "Margaret", "Alan", "Katherine"];

fn build_fake(step: &FunctionDatasetStep, registry: &Arc<ConnectorRegistry>) -> Result<Vec<Array>> {
    let rows = match step.args.first().map(|e| eval_literal(e, registry)).transpose()? {
        Some(ScalarValue::Int64(v)) if v >= 0 => v as usize,
        _ => return Err(EngineError::new(ErrorKind::InvalidFunctionParameter, "FAKE() requires a non-negative row count")),
    };
    let schema = step
        .schema
        .as_ref()
        .ok_or_else(|| EngineError::new(ErrorKind::InvalidInternalState, "FAKE() built before its schema was synthesized"))?;

    let mut rng = rand::thread_rng();
    let mut columns = Vec::with_capacity(schema.columns.len());
    for col in &schema.columns {
        let array = match (col.disposition, &col.data_type) {
            (Some(Disposition::Name), _) => {
                Array::Utf8(PrimitiveArray::from_values((0..rows).map(|_| FAKE_NAMES[rng.gen_range(0..FAKE_NAMES.len())].to_string()).collect()))
            }
            (Some(Disposition::Age), _) => Array::Int64(PrimitiveArray::from_values((0..rows).map(|_| rng.gen_range(0..100)).collect())),
            (_, DataType::Int64) => Array::Int64(PrimitiveArray::from_values((0..rows).map(|_| rng.gen_range(0..1000)).collect())),
            (_, DataType::Float64) => Array::Float64(PrimitiveArray::from_values((0..rows).map(|_| rng.gen_range(0.0..1000.0)).collect())),
            (_, DataType::Boolean) => Array::Boolean(PrimitiveArray::from_values((0..rows).map(|_| rng.gen_bool(0.5)).collect())),
            _ => Array::Utf8(PrimitiveArray::from_values((0..rows).map(|i| format!("{}-{i}", col.name)).collect())),
        };
        columns.push(array);
    }
    Ok(columns)
}
