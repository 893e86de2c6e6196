//! The `Exit` operator (§4.4): the root of every physical pipeline,
//! evaluating the plan's final column list against the last upstream
//! morsel shape. Structurally identical to `Project` minus the
//! `ORDER BY`-only columns, since by the time a plan reaches its exit node
//! there is no further operator left to consume them.

use std::sync::Arc;

use flint_connector::ConnectorRegistry;
use flint_core::logical::ExitStep;
use flint_core::schema::ColumnId;
use flint_error::Result;
use flint_types::Morsel;

use crate::evaluator::{evaluate, EvalCache};
use crate::operator::OperatorStream;

struct ExitStream {
    upstream: OperatorStream,
    columns: Vec<flint_core::expr::Expr>,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
}

pub fn build_exit(
    step: &ExitStep,
    upstream: OperatorStream,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    Ok(Box::new(ExitStream { upstream, columns: step.columns.clone(), schema, registry }))
}

impl Iterator for ExitStream {
    type Item = Result<Morsel>;

    fn next(&mut self) -> Option<Self::Item> {
        let morsel = match self.upstream.next()? {
            Ok(m) => m,
            Err(e) => return Some(Err(e)),
        };

        let mut cache = EvalCache::new();
        let mut out = Vec::with_capacity(self.columns.len());
        for expr in &self.columns {
            match evaluate(expr, &morsel, &self.schema, &self.registry, &mut cache) {
                Ok(arr) => out.push(arr),
                Err(e) => return Some(Err(e)),
            }
        }
        Some(Morsel::try_new(out))
    }
}
