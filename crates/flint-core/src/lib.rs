//! The planning core: expression/schema vocabulary, AST lowering, binding,
//! and the heuristic optimizer (§3, §4).
//!
//! `flint-core` owns everything between a parsed [`flint_parser::Statement`]
//! and a bound, optimized [`logical::LogicalPlan`] ready for physical
//! planning. It knows nothing about how a plan is executed — that's
//! `flint-physical` — or where data comes from — that's `flint-connector`
//! behind the [`catalog::Catalog`] trait.

pub mod binder;
pub mod catalog;
pub mod expr;
pub mod functions;
pub mod logical;
pub mod optimizer;
pub mod schema;

pub use binder::{bind, BindContext};
pub use catalog::{Catalog, DatasetDescriptor};
pub use logical::LogicalPlan;
pub use optimizer::optimize;

use flint_error::Result;
use flint_parser::Statement;

/// Parse-to-plan pipeline entry point: lower, bind, and optimize one
/// statement against `catalog`. `flint`'s `Session` calls this once per
/// statement in a batch. The returned warnings are the binder's
/// non-fatal hint-validation messages (§4.1), meant to surface through
/// `EXPLAIN` rather than fail the statement.
pub fn plan_statement(stmt: &Statement, catalog: &dyn Catalog) -> Result<(LogicalPlan, Vec<String>)> {
    let mut plan = logical::lower::lower_statement(stmt)?;
    let ctx = bind(&mut plan, catalog)?;
    Ok((optimize(plan), ctx.warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, RelationSchema};
    use flint_types::{DataType, ScalarValue};

    struct FixtureCatalog;

    impl Catalog for FixtureCatalog {
        fn resolve_dataset(&self, relation: &str) -> Result<DatasetDescriptor> {
            let mut schema = RelationSchema::new(relation);
            schema.push(Column::new_flat("id", DataType::Int64, relation));
            schema.push(Column::new_flat("name", DataType::Utf8, relation));
            Ok(DatasetDescriptor {
                schema,
                connector_name: "memory".to_string(),
                cacheable: true,
                partitionable: false,
            })
        }
        fn session_variable(&self, _name: &str) -> Option<ScalarValue> {
            None
        }
    }

    #[test]
    fn plan_statement_lowers_binds_and_optimizes() {
        let stmts = flint_parser::parse_statements("SELECT id FROM widgets WHERE id > 1 AND id > 1").unwrap();
        let (plan, warnings) = plan_statement(&stmts[0], &FixtureCatalog).unwrap();
        assert_eq!(plan.step.name(), "Exit");
        assert!(warnings.is_empty());
    }
}
