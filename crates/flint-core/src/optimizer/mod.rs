//! The heuristic optimizer (§4.3): a fixed chain of semantics-preserving
//! rewrites applied once, in order, to a bound plan.
//!
//! The specification describes strategies as `visit(node, ctx)` callbacks
//! over a graph with a side-table of node ids. Since [`LogicalPlan`] here is
//! an owned recursive tree, each strategy is instead a plain
//! `LogicalPlan -> LogicalPlan` transform that consumes and rebuilds the
//! tree; "detach a predicate and carry it" becomes "return it out of the
//! recursive call instead of re-wrapping the node."
//!
//! The order here is the one the specification canonicalizes in §4.3 over
//! an earlier, conflicting ordering found in the source material (§9
//! REDESIGN FLAGS) — see DESIGN.md.

mod boolean;
mod predicate;
mod structural;

use crate::expr::Expr;
use crate::logical::{LogicalPlan, Step};

pub fn optimize(plan: LogicalPlan) -> LogicalPlan {
    let plan = boolean::simplify(plan);
    let plan = predicate::split_conjunctive(plan);
    let plan = boolean::constant_fold(plan);
    let plan = boolean::predicate_rewrite(plan);
    let plan = predicate::pushdown(plan);
    let plan = structural::projection_pushdown(plan);
    let plan = structural::eliminate_redundant(plan);
    structural::fuse_operators(plan)
}

/// Every expression slot a `Step` owns directly (not recursing into child
/// plan nodes), mutable. Shared by the expression-local strategies.
pub(crate) fn step_expr_slots_mut(step: &mut Step) -> Vec<&mut Expr> {
    match step {
        Step::FunctionDataset(fd) => fd.args.iter_mut().collect(),
        Step::Filter(f) => vec![&mut f.condition],
        Step::Join(j) => {
            let mut v = Vec::new();
            if let Some(on) = j.on.as_mut() {
                v.push(on);
            }
            if let Some(unnest) = j.unnest_column.as_mut() {
                v.push(unnest);
            }
            v
        }
        Step::AggregateAndGroup(a) => a
            .groups
            .iter_mut()
            .chain(a.aggregates.iter_mut())
            .chain(a.all_identifiers.iter_mut())
            .collect(),
        Step::Distinct(d) => d.on.as_mut().map(|v| v.iter_mut().collect()).unwrap_or_default(),
        Step::Project(p) => p.columns.iter_mut().chain(p.order_by_columns.iter_mut()).collect(),
        Step::Order(o) => o.order_by.iter_mut().map(|(e, _)| e).collect(),
        Step::Exit(e) => e.columns.iter_mut().collect(),
        Step::Set(s) => vec![&mut s.value],
        _ => Vec::new(),
    }
}

/// Read-only counterpart of [`step_expr_slots_mut`], used by strategies that
/// only need to observe expressions (e.g. `ProjectionPushdown`'s reference
/// collection).
pub(crate) fn step_expr_refs(step: &Step) -> Vec<&Expr> {
    match step {
        Step::FunctionDataset(fd) => fd.args.iter().collect(),
        Step::Filter(f) => vec![&f.condition],
        Step::Join(j) => {
            let mut v = Vec::new();
            if let Some(on) = j.on.as_ref() {
                v.push(on);
            }
            if let Some(unnest) = j.unnest_column.as_ref() {
                v.push(unnest);
            }
            v
        }
        Step::AggregateAndGroup(a) => a
            .groups
            .iter()
            .chain(a.aggregates.iter())
            .chain(a.all_identifiers.iter())
            .collect(),
        Step::Distinct(d) => d.on.as_ref().map(|v| v.iter().collect()).unwrap_or_default(),
        Step::Project(p) => p.columns.iter().chain(p.order_by_columns.iter()).collect(),
        Step::Order(o) => o.order_by.iter().map(|(e, _)| e).collect(),
        Step::Exit(e) => e.columns.iter().collect(),
        Step::Set(s) => vec![&s.value],
        _ => Vec::new(),
    }
}

/// Apply `f` bottom-up to every expression reachable from `plan`, including
/// expressions nested inside scalar subqueries.
pub(crate) fn map_all_exprs(plan: &mut LogicalPlan, f: &mut dyn FnMut(&mut Expr)) {
    for slot in step_expr_slots_mut(&mut plan.step) {
        walk_expr_mut(slot, f);
    }
    for child in plan.children.iter_mut() {
        map_all_exprs(child, f);
    }
}

fn walk_expr_mut(expr: &mut Expr, f: &mut dyn FnMut(&mut Expr)) {
    for child in expr.children_mut() {
        walk_expr_mut(child, f);
    }
    if let crate::expr::ExprKind::Subquery(plan) = &mut expr.kind {
        map_all_exprs(plan, f);
    }
    f(expr);
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

    fn optimized(sql: &str) -> LogicalPlan {
        let stmts = flint_parser::parse_statements(sql).unwrap();
        let mut plan = lower_statement(&stmts[0]).unwrap();
        bind(&mut plan, &TestCatalog).unwrap();
        optimize(plan)
    }

    #[test]
    fn projection_pushdown_restricts_scan_columns() {
        let plan = optimized("SELECT id FROM widgets");
        let mut node = &plan;
        while !matches!(node.step, Step::Scan(_)) {
            node = &node.children[0];
        }
        if let Step::Scan(scan) = &node.step {
            assert_eq!(scan.columns.as_ref().unwrap().len(), 1);
        }
    }

    #[test]
    fn identity_projection_is_removed() {
        let plan = optimized("SELECT id, name FROM widgets");
        // The only Project left, if any, is one that actually reorders or
        // renames; a pure passthrough of the Scan's own columns collapses.
        let mut projects = 0;
        plan.walk_pre_order(&mut |p| {
            if matches!(p.step, Step::Project(_)) {
                projects += 1;
            }
        });
        assert_eq!(projects, 0);
    }
}
