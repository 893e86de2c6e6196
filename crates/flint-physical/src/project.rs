//! The `Project` operator (§4.4): produces morsels restricted to and
//! ordered by the selected columns, plus any extra `ORDER BY` keys a later
//! `Order` node needs but that aren't themselves selected.

use std::sync::Arc;

use flint_connector::ConnectorRegistry;
use flint_core::expr::Expr;
use flint_core::logical::ProjectStep;
use flint_core::schema::ColumnId;
use flint_error::Result;
use flint_types::Morsel;

use crate::evaluator::{evaluate, EvalCache};
use crate::operator::OperatorStream;

struct ProjectStream {
    upstream: OperatorStream,
    columns: Vec<Expr>,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
}

pub fn build_project(
    step: &ProjectStep,
    upstream: OperatorStream,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    let columns = step.columns.iter().cloned().chain(step.order_by_columns.iter().cloned()).collect();
    Ok(Box::new(ProjectStream { upstream, columns, schema, registry }))
}

impl Iterator for ProjectStream {
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
