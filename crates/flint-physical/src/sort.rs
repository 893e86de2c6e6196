//! The `Sort` operator (§4.4): greedy, buffers all input then total-orders
//! by the compound key. Nulls sort last on every key, matching
//! [`ScalarValue`](flint_types::ScalarValue)'s own `PartialOrd`.

use std::sync::Arc;

use flint_connector::ConnectorRegistry;
use flint_core::logical::OrderStep;
use flint_core::schema::ColumnId;
use flint_error::Result;
use flint_types::{Array, Morsel, ScalarValue};

use crate::evaluator::{evaluate, EvalCache};
use crate::operator::OperatorStream;

pub fn build_sort(
    step: &OrderStep,
    mut upstream: OperatorStream,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    let mut morsels = Vec::new();
    for morsel in upstream.by_ref() {
        morsels.push(morsel?);
    }
    if morsels.is_empty() {
        return Ok(Box::new(std::iter::empty()));
    }

    let combined = morsels
        .into_iter()
        .reduce(|a, b| a.concat(&b).unwrap_or(a))
        .unwrap();

    let mut keys: Vec<Vec<ScalarValue>> = Vec::with_capacity(step.order_by.len());
    for (expr, _) in &step.order_by {
        let mut cache = EvalCache::new();
        let array: Array = evaluate(expr, &combined, &schema, &registry, &mut cache)?;
        keys.push((0..combined.num_rows()).map(|i| array.scalar(i)).collect());
    }

    let mut order: Vec<usize> = (0..combined.num_rows()).collect();
    order.sort_by(|&a, &b| {
        use std::cmp::Ordering;
        for (key, (_, asc)) in keys.iter().zip(step.order_by.iter()) {
            // Nulls sort last regardless of direction, matching
            // `ScalarValue`'s own default `PartialOrd` convention.
            let ord = match (key[a].is_null(), key[b].is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let o = key[a].partial_cmp(&key[b]).unwrap_or(Ordering::Equal);
                    if *asc { o } else { o.reverse() }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let columns: Vec<Array> = combined.columns().iter().map(|c| c.take(&order)).collect();
    Ok(Box::new(std::iter::once(Morsel::try_new(columns))))
}
