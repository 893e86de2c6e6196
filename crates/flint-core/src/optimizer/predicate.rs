//! `SplitConjunctivePredicates` and `PredicatePushdown` (§4.3): the two
//! strategies that restructure `Filter` placement.

use std::collections::BTreeSet;

use crate::binder::extract_join_fields;
use crate::expr::Expr;
use crate::logical::{FilterStep, JoinKind, LogicalPlan, Step};

/// Replace every multi-conjunct `Filter` with a chain of single-predicate
/// `Filter`s (Testable Property 4). Order among the chain doesn't matter
/// semantically, only that each node tests exactly one conjunct.
pub fn split_conjunctive(plan: LogicalPlan) -> LogicalPlan {
    let LogicalPlan { step, children, output } = plan;
    let children: Vec<LogicalPlan> = children.into_iter().map(split_conjunctive).collect();
    match step {
        Step::Filter(f) => {
            let mut node = children.into_iter().next().expect("Filter always has one child");
            for conjunct in f.condition.split_conjuncts() {
                node = LogicalPlan::unary(Step::Filter(new_filter(conjunct)), node);
            }
            node.output = output;
            node
        }
        other => LogicalPlan { step: other, children, output },
    }
}

fn new_filter(condition: Expr) -> FilterStep {
    let mut relations = BTreeSet::new();
    condition.referenced_relations(&mut relations);
    let simple = matches!(condition.kind, crate::expr::ExprKind::Comparison { .. });
    FilterStep {
        condition,
        simple: Some(simple),
        relations: Some(relations.into_iter().collect()),
    }
}

/// Detach every single-relation predicate from the `Filter`s that hold it
/// and carry it down past any node that doesn't need to see it, reinserting
/// it immediately above the `Scan`/`FunctionDataset`/`Subquery` leaf whose
/// relation it names (§4.3). A predicate that spans both sides of a `Cross`
/// join is converted into that join's `ON` condition instead (§4.3 (b)).
///
/// Pushdown past `OUTER`/`SEMI`/`ANTI` joins is restricted to the side the
/// join kind preserves (§9 Open Question — the source material left this
/// unguarded, which would silently change result cardinality).
pub fn pushdown(plan: LogicalPlan) -> LogicalPlan {
    let mut pool = Vec::new();
    let node = push(plan, &mut pool);
    reattach(node, pool)
}

fn push(plan: LogicalPlan, pool: &mut Vec<Expr>) -> LogicalPlan {
    let LogicalPlan { step, mut children, output } = plan;
    match step {
        Step::Filter(f) => {
            let child = children.remove(0);
            let relations = f.relations.clone().unwrap_or_default();
            if relations.len() == 1 {
                pool.push(f.condition);
                push(child, pool)
            } else if relations.len() >= 2 && matches!(child.step, Step::Join(ref j) if j.kind == JoinKind::Cross)
            {
                let Step::Join(mut join) = child.step else { unreachable!() };
                let mut all: BTreeSet<String> = join.left_relation_names.iter().cloned().collect();
                all.extend(join.right_relation_names.iter().cloned());
                let rel_set: BTreeSet<String> = relations.into_iter().collect();
                if rel_set == all {
                    let (left_cols, right_cols) =
                        extract_join_fields(&f.condition, &join.left_relation_names, &join.right_relation_names);
                    join.kind = JoinKind::Inner;
                    join.on = Some(f.condition);
                    join.left_columns = left_cols;
                    join.right_columns = right_cols;
                    let join_children: Vec<LogicalPlan> = child.children.into_iter().map(|c| push(c, pool)).collect();
                    let mut node = LogicalPlan::new(Step::Join(join), join_children);
                    node.output = child.output;
                    node
                } else {
                    let new_child = push(
                        LogicalPlan {
                            step: Step::Join(join),
                            children: child.children,
                            output: child.output,
                        },
                        pool,
                    );
                    LogicalPlan::unary(Step::Filter(f), new_child)
                }
            } else {
                let new_child = push(child, pool);
                let mut node = LogicalPlan::unary(Step::Filter(f), new_child);
                node.output = output;
                node
            }
        }
        Step::Join(join) if join.kind == JoinKind::CrossUnnest => {
            let mut left_pool = Vec::new();
            let mut right_pool = Vec::new();
            let mut iter = children.into_iter();
            let left = push(iter.next().unwrap(), &mut left_pool);
            let right = push(iter.next().unwrap(), &mut right_pool);
            let left = reattach(left, left_pool);
            let right = reattach(right, right_pool);
            LogicalPlan {
                step: Step::Join(join),
                children: vec![left, right],
                output,
            }
        }
        Step::Join(join) => {
            let left_names: BTreeSet<&String> = join.left_relation_names.iter().collect();
            let right_names: BTreeSet<&String> = join.right_relation_names.iter().collect();
            let (push_left, push_right) = safe_sides(join.kind);

            let mut left_pool = Vec::new();
            let mut right_pool = Vec::new();
            let mut remaining = Vec::new();
            for pred in pool.drain(..) {
                let mut relations = BTreeSet::new();
                pred.referenced_relations(&mut relations);
                let goes_left = relations.iter().all(|r| left_names.contains(r));
                let goes_right = relations.iter().all(|r| right_names.contains(r));
                if goes_left && push_left {
                    left_pool.push(pred);
                } else if goes_right && push_right {
                    right_pool.push(pred);
                } else {
                    remaining.push(pred);
                }
            }

            let mut iter = children.into_iter();
            let left = push(iter.next().unwrap(), &mut left_pool);
            let right = push(iter.next().unwrap(), &mut right_pool);
            let left = reattach(left, left_pool);
            let right = reattach(right, right_pool);
            *pool = remaining;
            LogicalPlan {
                step: Step::Join(join),
                children: vec![left, right],
                output,
            }
        }
        Step::Scan(_) | Step::FunctionDataset(_) | Step::Subquery(_) => {
            let node = LogicalPlan { step, children, output };
            let own: BTreeSet<String> = node.own_relation_names().into_iter().collect();
            let mut matched = Vec::new();
            let mut rest = Vec::new();
            for pred in pool.drain(..) {
                let mut relations = BTreeSet::new();
                pred.referenced_relations(&mut relations);
                if relations.iter().all(|r| own.contains(r)) {
                    matched.push(pred);
                } else {
                    rest.push(pred);
                }
            }
            *pool = rest;
            reattach(node, matched)
        }
        other => {
            let new_children: Vec<LogicalPlan> = children.into_iter().map(|c| push(c, pool)).collect();
            LogicalPlan {
                step: other,
                children: new_children,
                output,
            }
        }
    }
}

fn safe_sides(kind: JoinKind) -> (bool, bool) {
    match kind {
        JoinKind::Inner | JoinKind::Cross | JoinKind::Natural | JoinKind::CrossUnnest => (true, true),
        JoinKind::LeftOuter | JoinKind::LeftSemi | JoinKind::LeftAnti => (true, false),
        JoinKind::RightOuter | JoinKind::RightSemi | JoinKind::RightAnti => (false, true),
        JoinKind::FullOuter => (false, false),
    }
}

fn reattach(node: LogicalPlan, preds: Vec<Expr>) -> LogicalPlan {
    preds.into_iter().fold(node, |acc, pred| LogicalPlan::unary(Step::Filter(new_filter(pred)), acc))
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
    fn single_predicate_splits_into_chain() {
        let plan = bound("SELECT id FROM widgets WHERE id > 1 AND name = 'x'");
        let plan = split_conjunctive(plan);
        let mut filters = 0;
        plan.walk_pre_order(&mut |p| {
            if matches!(p.step, Step::Filter(_)) {
                filters += 1;
            }
        });
        assert_eq!(filters, 2);
    }

    #[test]
    fn single_relation_predicate_lands_directly_above_scan() {
        let plan = bound("SELECT id FROM widgets WHERE id > 1");
        let plan = split_conjunctive(plan);
        let plan = pushdown(plan);
        let mut node = &plan;
        while !matches!(node.step, Step::Scan(_)) {
            node = &node.children[0];
        }
        // walk back up one: the parent above the Scan should be the Filter.
        fn parent_of_scan<'a>(node: &'a LogicalPlan) -> Option<&'a LogicalPlan> {
            if node.children.iter().any(|c| matches!(c.step, Step::Scan(_))) {
                return Some(node);
            }
            node.children.iter().find_map(parent_of_scan)
        }
        let parent = parent_of_scan(&plan).expect("a node sits directly above the scan");
        assert!(matches!(parent.step, Step::Filter(_)));
    }
}
