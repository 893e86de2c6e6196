//! The `Filter` operator (§4.4): evaluates the bound condition over each
//! morsel and yields the surviving rows, one input morsel to one output
//! morsel.

use std::sync::Arc;

use flint_connector::ConnectorRegistry;
use flint_core::expr::Expr;
use flint_core::schema::ColumnId;
use flint_error::{EngineError, ErrorKind, Result};
use flint_types::{Array, Morsel};

use crate::evaluator::{evaluate, EvalCache};
use crate::operator::OperatorStream;

struct FilterStream {
    upstream: OperatorStream,
    condition: Expr,
    schema: Vec<ColumnId>,
    registry: Arc<ConnectorRegistry>,
}

pub fn build_filter(upstream: OperatorStream, condition: Expr, schema: Vec<ColumnId>, registry: Arc<ConnectorRegistry>) -> OperatorStream {
    Box::new(FilterStream { upstream, condition, schema, registry })
}

impl Iterator for FilterStream {
    type Item = Result<Morsel>;

    fn next(&mut self) -> Option<Self::Item> {
        let morsel = match self.upstream.next()? {
            Ok(m) => m,
            Err(e) => return Some(Err(e)),
        };

        let mut cache = EvalCache::new();
        let mask = match evaluate(&self.condition, &morsel, &self.schema, &self.registry, &mut cache) {
            Ok(Array::Boolean(mask)) => mask,
            Ok(other) => {
                return Some(Err(EngineError::new(
                    ErrorKind::IncorrectType,
                    format!("FILTER condition evaluated to {:?} instead of BOOLEAN", other.datatype()),
                )))
            }
            Err(e) => return Some(Err(e)),
        };

        let columns: Vec<Array> = morsel.columns().iter().map(|c| c.filter(&mask)).collect();
        Some(Morsel::try_new(columns))
    }
}
