//! Renders a bound, optimized [`LogicalPlan`] as the [`ExplainNode`] tree
//! `EXPLAIN` prints (§6). Walks the logical tree rather than the physical
//! one: a `LogicalPlan` already carries everything worth showing a caller
//! (step kind, predicate text, join keys) without paying to build and
//! immediately discard a physical pipeline.

use flint_core::expr::format_expression;
use flint_core::logical::{LogicalPlan, Step};
use flint_physical::ExplainNode;

pub fn render(plan: &LogicalPlan) -> ExplainNode {
    let children: Vec<ExplainNode> = plan.children.iter().map(render).collect();
    let node = match &plan.step {
        Step::Scan(scan) => ExplainNode::leaf("Scan").with_detail(format!("relation={}", scan.relation)),
        Step::FunctionDataset(fd) => ExplainNode::leaf("FunctionDataset").with_detail(format!("{:?}", fd.function)),
        Step::Subquery(sub) => ExplainNode::leaf("Subquery").with_detail(format!("alias={}", sub.alias)),
        Step::Filter(f) => ExplainNode::leaf("Filter").with_detail(format_expression(&f.condition)),
        Step::Join(join) => ExplainNode::leaf("Join").with_detail(format!("{:?}", join.kind)),
        Step::AggregateAndGroup(agg) => {
            ExplainNode::leaf("AggregateAndGroup").with_detail(format!("groups={}, aggregates={}", agg.groups.len(), agg.aggregates.len()))
        }
        Step::Distinct(_) => ExplainNode::leaf("Distinct"),
        Step::Project(p) => ExplainNode::leaf("Project").with_detail(format!("columns={}", p.columns.len())),
        Step::Order(o) => ExplainNode::leaf("Order").with_detail(format!("keys={}", o.order_by.len())),
        Step::Offset(o) => ExplainNode::leaf("Offset").with_detail(o.n.to_string()),
        Step::Limit(l) => ExplainNode::leaf("Limit").with_detail(l.n.to_string()),
        Step::Exit(e) => ExplainNode::leaf("Exit").with_detail(format!("columns={}", e.columns.len())),
        Step::Set(set) => ExplainNode::leaf("Set").with_detail(&set.name),
        Step::ShowColumns(show) => ExplainNode::leaf("ShowColumns").with_detail(show.table.join(".")),
        Step::ShowVariable(show) => ExplainNode::leaf("ShowVariable").with_detail(&show.name),
        Step::Explain(_) => ExplainNode::leaf("Explain"),
    };
    ExplainNode { children, ..node }
}
