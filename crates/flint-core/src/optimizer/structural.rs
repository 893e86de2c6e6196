//! `ProjectionPushdown`, `RedundantOperations`, and `OperatorFusion` (§4.3):
//! the shape-level strategies that run after predicates have settled.

use std::collections::BTreeSet;

use crate::logical::{LimitStep, LogicalPlan, OffsetStep, Step};
use crate::schema::ColumnId;

use super::step_expr_refs;

/// Restrict every `Scan`'s `columns` to the intersection of its own schema
/// with every column identity referenced anywhere in the plan (Testable
/// Property 6: exact, not a superset). Column ids are unique per scan, so a
/// single global pass over the whole tree is equivalent to walking only the
/// ancestors of each scan.
pub fn projection_pushdown(mut plan: LogicalPlan) -> LogicalPlan {
    let mut used = BTreeSet::new();
    collect_used_columns(&plan, &mut used);
    restrict_scans(&mut plan, &used);
    plan
}

fn collect_used_columns(plan: &LogicalPlan, out: &mut BTreeSet<ColumnId>) {
    for expr in step_expr_refs(&plan.step) {
        expr.referenced_column_ids(out);
    }
    for child in &plan.children {
        collect_used_columns(child, out);
    }
}

fn restrict_scans(plan: &mut LogicalPlan, used: &BTreeSet<ColumnId>) {
    if let Step::Scan(scan) = &mut plan.step {
        if let Some(schema) = &scan.schema {
            let restricted: Vec<ColumnId> = schema
                .columns
                .iter()
                .map(|c| c.id)
                .filter(|id| used.contains(id))
                .collect();
            scan.columns = Some(if restricted.is_empty() {
                schema.columns.first().map(|c| vec![c.id]).unwrap_or_default()
            } else {
                restricted
            });
        }
    }
    for child in &mut plan.children {
        restrict_scans(child, used);
    }
}

/// Drop `Project` nodes that are a pure identity over their child's output,
/// and collapse adjacent `Limit`/`Offset` pairs into one.
pub fn eliminate_redundant(plan: LogicalPlan) -> LogicalPlan {
    let LogicalPlan { step, children, output } = plan;
    let children: Vec<LogicalPlan> = children.into_iter().map(eliminate_redundant).collect();
    match step {
        Step::Project(p) if is_identity_project(&p, &children[0]) => children.into_iter().next().unwrap(),
        other => merge_adjacent(LogicalPlan { step: other, children, output }),
    }
}

fn is_identity_project(p: &crate::logical::ProjectStep, child: &LogicalPlan) -> bool {
    p.columns.len() == child.output.len()
        && p.columns
            .iter()
            .zip(child.output.iter())
            .all(|(e, id)| e.alias.is_none() && e.schema_column == Some(*id))
}

fn merge_adjacent(mut plan: LogicalPlan) -> LogicalPlan {
    let combined_limit = if let Step::Limit(outer) = &plan.step {
        match plan.children.first().map(|c| &c.step) {
            Some(Step::Limit(inner)) => Some(outer.n.min(inner.n)),
            _ => None,
        }
    } else {
        None
    };
    if let Some(n) = combined_limit {
        let grandchild = plan.children.remove(0).children.remove(0);
        return LogicalPlan::unary(Step::Limit(LimitStep { n }), grandchild);
    }

    let combined_offset = if let Step::Offset(outer) = &plan.step {
        match plan.children.first().map(|c| &c.step) {
            Some(Step::Offset(inner)) => Some(outer.n + inner.n),
            _ => None,
        }
    } else {
        None
    };
    if let Some(n) = combined_offset {
        let grandchild = plan.children.remove(0).children.remove(0);
        return LogicalPlan::unary(Step::Offset(OffsetStep { n }), grandchild);
    }

    plan
}

/// Fuse operators that can share a single pass. Currently this collapses a
/// `Filter` directly stacked on top of another `Filter` testing the exact
/// same bound condition — a shape `SplitConjunctivePredicates` and
/// `PredicatePushdown` can both produce when a predicate gets duplicated
/// while walking a join's two sides.
pub fn fuse_operators(plan: LogicalPlan) -> LogicalPlan {
    let LogicalPlan { step, children, output } = plan;
    let children: Vec<LogicalPlan> = children.into_iter().map(fuse_operators).collect();
    if let Step::Filter(outer) = &step {
        if let [only_child] = children.as_slice() {
            if let Step::Filter(inner) = &only_child.step {
                if outer.condition.schema_column.is_some() && outer.condition.schema_column == inner.condition.schema_column
                {
                    return children.into_iter().next().unwrap();
                }
            }
        }
    }
    LogicalPlan { step, children, output }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind;
    use crate::catalog::{Catalog, DatasetDescriptor};
    use crate::logical::lower::lower_statement;
    use crate::schema::{Column, RelationSchema};
    use flint_error::Result;
    use flint_types::{DataType, ScalarValue};

    struct TestCatalog;

    impl Catalog for TestCatalog {
        fn resolve_dataset(&self, relation: &str) -> Result<DatasetDescriptor> {
            let mut schema = RelationSchema::new(relation);
            schema.push(Column::new_flat("id", DataType::Int64, relation));
            schema.push(Column::new_flat("name", DataType::Utf8, relation));
            Ok(DatasetDescriptor {
                schema,
                connector_name: "memory".to_string(),
                cacheable: false,
                partitionable: false,
            })
        }
        fn session_variable(&self, _name: &str) -> Option<ScalarValue> {
            None
        }
    }

    fn bound(sql: &str) -> LogicalPlan {
        let stmts = flint_parser::parse_statements(sql).unwrap();
        let mut plan = lower_statement(&stmts[0]).unwrap();
        bind(&mut plan, &TestCatalog).unwrap();
        plan
    }

    #[test]
    fn scan_columns_restricted_to_referenced_set() {
        let plan = projection_pushdown(bound("SELECT id FROM widgets"));
        let mut node = &plan;
        while !matches!(node.step, Step::Scan(_)) {
            node = &node.children[0];
        }
        if let Step::Scan(scan) = &node.step {
            assert_eq!(scan.columns.as_ref().unwrap().len(), 1);
        }
    }

    #[test]
    fn adjacent_limits_collapse_to_the_tighter_bound() {
        let inner = LogicalPlan::leaf(Step::Scan(crate::logical::ScanStep {
            relation: "widgets".into(),
            alias: "widgets".into(),
            hints: Vec::new(),
            start_date: None,
            end_date: None,
            connector: None,
            schema: None,
            columns: None,
        }));
        let middle = LogicalPlan::unary(Step::Limit(LimitStep { n: 50 }), inner);
        let outer = LogicalPlan::unary(Step::Limit(LimitStep { n: 10 }), middle);
        let merged = merge_adjacent(outer);
        assert!(matches!(merged.step, Step::Limit(LimitStep { n: 10 })));
        assert!(matches!(merged.children[0].step, Step::Scan(_)));
    }
}
