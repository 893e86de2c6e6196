//! `CrossJoin` and `CrossJoin+Unnest` (§4.4): the two join kinds that have
//! no equality key and so never touch the hash-based machinery in
//! `join.rs`.
//!
//! `CrossJoin` is the cartesian product of both sides. `CrossJoin+Unnest`
//! expands `unnest_column` for each left row into its element values,
//! emitting one output row per element and dropping left rows whose
//! unnest value is null or empty; the right child only exists to carry the
//! synthetic unnest-target schema column and is drained without otherwise
//! contributing rows.
//!
//! `unnest_column` is expected to evaluate to a delimited `Utf8` value (the
//! same representation `aggregate.rs`'s `LIST`/`DISTINCT` kernels produce),
//! since this engine's `Array` has no dedicated list/array element type.

use std::sync::Arc;

use flint_connector::ConnectorRegistry;
use flint_core::logical::{JoinKind, JoinStep};
use flint_core::schema::ColumnId;
use flint_error::{EngineError, ErrorKind, Result};
use flint_types::array::PrimitiveArray;
use flint_types::{Array, Morsel};

use crate::evaluator::{evaluate, EvalCache};
use crate::operator::OperatorStream;

pub fn build_cross_join(
    join: &JoinStep,
    left: OperatorStream,
    left_schema: &[ColumnId],
    right: OperatorStream,
    right_schema: &[ColumnId],
    registry: Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    match join.kind {
        JoinKind::Cross => build_cartesian(left, right),
        JoinKind::CrossUnnest => build_unnest(join, left, left_schema, right, right_schema, registry),
        _ => Err(EngineError::new(ErrorKind::InvalidInternalState, "not a cross join kind")),
    }
}

fn collect(mut stream: OperatorStream) -> Result<Morsel> {
    let mut morsels = Vec::new();
    for morsel in stream.by_ref() {
        morsels.push(morsel?);
    }
    Ok(morsels.into_iter().reduce(|a, b| a.concat(&b).unwrap_or(a)).unwrap_or_else(Morsel::empty))
}

fn build_cartesian(left: OperatorStream, right: OperatorStream) -> Result<OperatorStream> {
    let left_morsel = collect(left)?;
    let right_morsel = collect(right)?;

    let mut left_idx = Vec::with_capacity(left_morsel.num_rows() * right_morsel.num_rows());
    let mut right_idx = Vec::with_capacity(left_morsel.num_rows() * right_morsel.num_rows());
    for l in 0..left_morsel.num_rows() {
        for r in 0..right_morsel.num_rows() {
            left_idx.push(l);
            right_idx.push(r);
        }
    }

    let columns = left_morsel
        .columns()
        .iter()
        .map(|c| c.take(&left_idx))
        .chain(right_morsel.columns().iter().map(|c| c.take(&right_idx)))
        .collect();
    Ok(Box::new(std::iter::once(Morsel::try_new(columns))))
}

fn build_unnest(
    join: &JoinStep,
    left: OperatorStream,
    left_schema: &[ColumnId],
    right: OperatorStream,
    _right_schema: &[ColumnId],
    registry: Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    let _ = collect(right)?;
    let left_morsel = collect(left)?;
    let unnest_expr = join
        .unnest_column
        .as_ref()
        .ok_or_else(|| EngineError::new(ErrorKind::InvalidInternalState, "CROSS JOIN UNNEST with no unnest_column"))?;

    let mut cache = EvalCache::new();
    let values = evaluate(unnest_expr, &left_morsel, left_schema, &registry, &mut cache)?;

    let mut left_idx = Vec::new();
    let mut unnested: Vec<String> = Vec::new();
    for row in 0..left_morsel.num_rows() {
        if !values.is_valid(row) {
            continue;
        }
        let elements = match values.scalar(row) {
            flint_types::ScalarValue::Utf8(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
            other => vec![other.to_string()],
        };
        for element in elements {
            left_idx.push(row);
            unnested.push(element);
        }
    }

    let mut columns: Vec<Array> = left_morsel.columns().iter().map(|c| c.take(&left_idx)).collect();
    columns.push(Array::Utf8(PrimitiveArray::from_values(unnested)));
    Ok(Box::new(std::iter::once(Morsel::try_new(columns))))
}
