//! Lowers a bound, optimized [`LogicalPlan`] into a nested [`OperatorStream`]
//! pipeline (§4.4). One function per step kind; each recurses into its
//! children before wrapping them, so the resulting iterator chain mirrors
//! the plan tree bottom-up.

use std::sync::Arc;

use flint_connector::{ConnectorRegistry, PushedPredicate};
use flint_core::expr::{ComparisonOp, Expr, ExprKind};
use flint_core::logical::{LogicalPlan, ScanStep, Step};
use flint_core::schema::ColumnId;
use flint_error::{EngineError, ErrorKind, Result};

use crate::operator::OperatorStream;

pub fn build_physical_plan(plan: &LogicalPlan, registry: &Arc<ConnectorRegistry>) -> Result<OperatorStream> {
    match &plan.step {
        Step::Scan(scan) => build_scan_step(scan, &plan.output, Vec::new(), registry),
        Step::FunctionDataset(fd) => crate::function_dataset::build(fd, &plan.output, registry),
        Step::Subquery(_) => build_physical_plan(plan.only_child(), registry),
        Step::Filter(f) => {
            let child = plan.only_child();
            if let Step::Scan(scan) = &child.step {
                if let Some(pred) = extract_pushable(&f.condition, &child.output) {
                    return build_scan_step(scan, &child.output, vec![pred], registry);
                }
            }
            let upstream = build_physical_plan(child, registry)?;
            Ok(crate::filter::build_filter(upstream, f.condition.clone(), physical_schema(child), registry.clone()))
        }
        Step::Join(join) => {
            let left = build_physical_plan(&plan.children[0], registry)?;
            let right = build_physical_plan(&plan.children[1], registry)?;
            let left_schema = physical_schema(&plan.children[0]);
            let right_schema = physical_schema(&plan.children[1]);
            match join.kind {
                flint_core::logical::JoinKind::Cross | flint_core::logical::JoinKind::CrossUnnest => {
                    crate::cross_join::build_cross_join(join, left, &left_schema, right, &right_schema, registry.clone())
                }
                _ => crate::join::build_join(join, left, &left_schema, right, &right_schema),
            }
        }
        Step::AggregateAndGroup(agg) => {
            let child = plan.only_child();
            let upstream = build_physical_plan(child, registry)?;
            crate::aggregate::build_aggregate(agg, upstream, physical_schema(child), plan.output.clone(), registry.clone())
        }
        Step::Distinct(d) => {
            let child = plan.only_child();
            let upstream = build_physical_plan(child, registry)?;
            crate::distinct::build_distinct(d, upstream, physical_schema(child), registry.clone())
        }
        Step::Project(p) => {
            let child = plan.only_child();
            let upstream = build_physical_plan(child, registry)?;
            crate::project::build_project(p, upstream, physical_schema(child), registry.clone())
        }
        Step::Order(o) => {
            let child = plan.only_child();
            let upstream = build_physical_plan(child, registry)?;
            crate::sort::build_sort(o, upstream, physical_schema(child), registry.clone())
        }
        Step::Offset(o) => {
            let upstream = build_physical_plan(plan.only_child(), registry)?;
            Ok(crate::offset::build_offset(o.n, upstream))
        }
        Step::Limit(l) => {
            let upstream = build_physical_plan(plan.only_child(), registry)?;
            Ok(crate::limit::build_limit(l.n, upstream))
        }
        Step::Exit(e) => {
            let child = plan.only_child();
            let upstream = build_physical_plan(child, registry)?;
            crate::exit::build_exit(e, upstream, physical_schema(child), registry.clone())
        }
        Step::Set(_) | Step::ShowColumns(_) | Step::ShowVariable(_) | Step::Explain(_) => Err(EngineError::new(
            ErrorKind::InvalidInternalState,
            "session-level statements have no physical operator; they're executed directly by the session",
        )),
    }
}

/// A node's physical morsel width, which for an ordinary node is just
/// `output` but for `Project` also includes `order_by_columns` — columns
/// carried through for a later `ORDER BY` that aren't part of the node's
/// own logical output (§3's `$project` schema keeps them reachable without
/// re-widening every downstream node's reported output).
fn physical_schema(node: &LogicalPlan) -> Vec<ColumnId> {
    match &node.step {
        Step::Project(p) => p
            .columns
            .iter()
            .chain(p.order_by_columns.iter())
            .filter_map(|e| e.schema_column)
            .collect(),
        _ => node.output.clone(),
    }
}

fn build_scan_step(
    scan: &ScanStep,
    output: &[ColumnId],
    predicates: Vec<PushedPredicate>,
    registry: &Arc<ConnectorRegistry>,
) -> Result<OperatorStream> {
    let connector = registry.resolve(&scan.relation)?;
    crate::scan::build_scan(connector, &scan.relation, Some(output), predicates, false)
}

/// If `condition` is a single comparison between an identifier in `schema`
/// and a pushable literal, lift it into a [`PushedPredicate`] the connector
/// may apply itself (§4.4, §6). Anything else (compound conditions, two
/// identifiers, non-pushable operators/types) returns `None` and the caller
/// falls back to a physical `Filter`.
fn extract_pushable(condition: &Expr, schema: &[ColumnId]) -> Option<PushedPredicate> {
    let ExprKind::Comparison { op, left, right } = &condition.kind else {
        return None;
    };
    if !op.is_pushable() {
        return None;
    }
    if let (ExprKind::Identifier { .. }, ExprKind::Literal(value)) = (&left.kind, &right.kind) {
        let id = left.schema_column?;
        if schema.contains(&id) && value.datatype().is_pushable() {
            return Some(PushedPredicate { column: id, op: *op, value: value.clone() });
        }
    }
    if let (ExprKind::Literal(value), ExprKind::Identifier { .. }) = (&left.kind, &right.kind) {
        let id = right.schema_column?;
        if schema.contains(&id) && value.datatype().is_pushable() {
            return Some(PushedPredicate { column: id, op: flip_sides(*op), value: value.clone() });
        }
    }
    None
}

fn flip_sides(op: ComparisonOp) -> ComparisonOp {
    use ComparisonOp::*;
    match op {
        Lt => Gt,
        LtEq => GtEq,
        Gt => Lt,
        GtEq => LtEq,
        other => other,
    }
}
