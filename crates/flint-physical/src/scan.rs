//! The `Scan` operator (§4.4): the one operator that talks to a connector,
//! pulling directly from `Connector::read_dataset` and handing the result to
//! the morsel resizer.

use std::sync::Arc;

use flint_connector::{Connector, PushedPredicate};
use flint_core::schema::ColumnId;
use flint_error::Result;

use crate::operator::OperatorStream;
use crate::resize::{Resize, DEFAULT_TARGET_BYTES};

pub fn build_scan(
    connector: Arc<dyn Connector>,
    relation: &str,
    columns: Option<&[ColumnId]>,
    predicates: Vec<PushedPredicate>,
    just_schema: bool,
) -> Result<OperatorStream> {
    let stream = connector.read_dataset(relation, columns, &predicates, just_schema)?;
    if just_schema {
        return Ok(stream);
    }
    Ok(Box::new(Resize::new(stream, DEFAULT_TARGET_BYTES)))
}
