//! The `Distinct` operator (§4.4): streaming hash-based dedupe over either
//! the full projected row or an explicit `on` subset, keyed by a row
//! fingerprint since [`ScalarValue`](flint_types::ScalarValue) has no
//! `Hash`/`Eq` impl of its own (float members make a real one unsound).

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use flint_connector::ConnectorRegistry;
use flint_core::expr::Expr;
use flint_core::logical::DistinctStep;
use flint_core::schema::ColumnId;
use flint_error::Result;
use flint_types::{Array, Morsel};

use crate::evaluator::{evaluate, EvalCache};
use crate::operator::OperatorStream;

struct DistinctStream {
    upstream: OperatorStream,
    on: Option<Vec<Expr>>,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
    seen: HashSet<String>,
}

pub fn build_distinct(
    step: &DistinctStep,
    upstream: OperatorStream,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    Ok(Box::new(DistinctStream { upstream, on: step.on.clone(), schema, registry, seen: HashSet::new() }))
}

impl Iterator for DistinctStream {
    type Item = Result<Morsel>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let morsel = match self.upstream.next()? {
                Ok(m) => m,
                Err(e) => return Some(Err(e)),
            };

            let key_arrays: Vec<Array> = match &self.on {
                Some(exprs) => {
                    let mut cache = EvalCache::new();
                    let mut arrays = Vec::with_capacity(exprs.len());
                    for e in exprs {
                        match evaluate(e, &morsel, &self.schema, &self.registry, &mut cache) {
                            Ok(arr) => arrays.push(arr),
                            Err(err) => return Some(Err(err)),
                        }
                    }
                    arrays
                }
                None => morsel.columns().iter().map(|c| (**c).clone()).collect(),
            };

            let mut keep = Vec::new();
            for row in 0..morsel.num_rows() {
                let mut fingerprint = String::new();
                for arr in &key_arrays {
                    if arr.is_valid(row) {
                        let _ = write!(fingerprint, "{}\u{1f}", arr.scalar(row));
                    } else {
                        fingerprint.push_str("\u{1f}NULL\u{1f}");
                    }
                }
                if self.seen.insert(fingerprint) {
                    keep.push(row);
                }
            }

            if keep.is_empty() {
                continue;
            }

            let columns: Vec<Array> = morsel.columns().iter().map(|c| c.take(&keep)).collect();
            return Some(Morsel::try_new(columns));
        }
    }
}
