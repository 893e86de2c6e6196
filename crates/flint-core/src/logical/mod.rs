//! The logical plan graph (§3, §4.1).
//!
//! The specification describes the plan as a graph of opaque node ids with
//! edges kept in a side table, to avoid owning back-references in a
//! garbage-collected host language. Rust's ownership model doesn't have
//! that problem: a recursive tree of boxed/owned children gives the same
//! "insert-before / insert-after / remove-with-heal" rewrite operations as
//! index surgery on a side table, without needing node ids at all. Column
//! identity ([`crate::schema::ColumnId`]) is what operators actually key
//! off of once bound, so this substitution preserves every invariant in §3
//! while staying idiomatic. See DESIGN.md for the recorded decision.

pub mod lower;

use chrono::NaiveDate;

use crate::expr::Expr;
use crate::schema::{ColumnId, RelationSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
    Natural,
    LeftSemi,
    RightSemi,
    LeftAnti,
    RightAnti,
    CrossUnnest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionDatasetKind {
    Values,
    Unnest,
    GenerateSeries,
    Fake,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanStep {
    pub relation: String,
    pub alias: String,
    pub hints: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub connector: Option<String>,
    pub schema: Option<RelationSchema>,
    pub columns: Option<Vec<ColumnId>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDatasetStep {
    pub function: FunctionDatasetKind,
    pub args: Vec<Expr>,
    pub alias: String,
    pub columns: Vec<String>,
    pub schema: Option<RelationSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryStep {
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    pub condition: Expr,
    /// Set by `PredicateRewrite`/planning once it's known the predicate is
    /// a simple comparison eligible for connector pushdown.
    pub simple: Option<bool>,
    /// Set by `PredicatePushdown`: the relation names this predicate
    /// references, cached so `complete()` doesn't need to re-walk it.
    pub relations: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinStep {
    pub kind: JoinKind,
    pub on: Option<Expr>,
    pub using: Option<Vec<String>>,
    pub unnest_column: Option<Expr>,
    pub unnest_alias: Option<String>,
    pub left_relation_names: Vec<String>,
    pub right_relation_names: Vec<String>,
    pub left_columns: Vec<ColumnId>,
    pub right_columns: Vec<ColumnId>,
}

impl JoinStep {
    pub fn new(kind: JoinKind) -> Self {
        JoinStep {
            kind,
            on: None,
            using: None,
            unnest_column: None,
            unnest_alias: None,
            left_relation_names: Vec::new(),
            right_relation_names: Vec::new(),
            left_columns: Vec::new(),
            right_columns: Vec::new(),
        }
    }

    pub fn preserves_right(&self) -> bool {
        !matches!(
            self.kind,
            JoinKind::LeftSemi | JoinKind::LeftAnti
        )
    }

    pub fn preserves_left(&self) -> bool {
        !matches!(
            self.kind,
            JoinKind::RightSemi | JoinKind::RightAnti
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStep {
    pub groups: Vec<Expr>,
    pub aggregates: Vec<Expr>,
    /// Every plain identifier referenced anywhere in `groups ∪ aggregates`;
    /// used to decide which upstream columns survive binding (§4.2).
    pub all_identifiers: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistinctStep {
    pub on: Option<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStep {
    pub columns: Vec<Expr>,
    /// Extra columns carried through for a later `ORDER BY` that aren't
    /// themselves in the SELECT list.
    pub order_by_columns: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStep {
    pub order_by: Vec<(Expr, bool)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetStep {
    pub n: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitStep {
    pub n: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitStep {
    pub columns: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetStep {
    pub name: String,
    pub value: Expr,
    pub session: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowColumnsStep {
    pub table: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowVariableStep {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExplainStep {
    pub analyze: bool,
}

/// The tagged variant per step kind the specification's design notes call
/// for (§9), carrying each step's own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Scan(ScanStep),
    FunctionDataset(FunctionDatasetStep),
    Subquery(SubqueryStep),
    Filter(FilterStep),
    Join(JoinStep),
    AggregateAndGroup(AggregateStep),
    Distinct(DistinctStep),
    Project(ProjectStep),
    Order(OrderStep),
    Offset(OffsetStep),
    Limit(LimitStep),
    Exit(ExitStep),
    Set(SetStep),
    ShowColumns(ShowColumnsStep),
    ShowVariable(ShowVariableStep),
    Explain(ExplainStep),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Scan(_) => "Scan",
            Step::FunctionDataset(_) => "FunctionDataset",
            Step::Subquery(_) => "Subquery",
            Step::Filter(_) => "Filter",
            Step::Join(_) => "Join",
            Step::AggregateAndGroup(_) => "AggregateAndGroup",
            Step::Distinct(_) => "Distinct",
            Step::Project(_) => "Project",
            Step::Order(_) => "Order",
            Step::Offset(_) => "Offset",
            Step::Limit(_) => "Limit",
            Step::Exit(_) => "Exit",
            Step::Set(_) => "Set",
            Step::ShowColumns(_) => "ShowColumns",
            Step::ShowVariable(_) => "ShowVariable",
            Step::Explain(_) => "Explain",
        }
    }
}

/// A node in the logical plan graph.
///
/// `children` holds this node's inputs in the order that matters to
/// asymmetric operators (a `Join`'s left child is always `children[0]`).
/// `output` is the ordered list of column identities this node emits;
/// it's populated by the binder and consulted by physical planning and
/// `EXPLAIN` without needing to re-run binding.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalPlan {
    pub step: Step,
    pub children: Vec<LogicalPlan>,
    pub output: Vec<ColumnId>,
}

impl LogicalPlan {
    pub fn new(step: Step, children: Vec<LogicalPlan>) -> Self {
        LogicalPlan {
            step,
            children,
            output: Vec::new(),
        }
    }

    pub fn leaf(step: Step) -> Self {
        LogicalPlan::new(step, Vec::new())
    }

    pub fn unary(step: Step, input: LogicalPlan) -> Self {
        LogicalPlan::new(step, vec![input])
    }

    pub fn only_child(&self) -> &LogicalPlan {
        &self.children[0]
    }

    pub fn only_child_mut(&mut self) -> &mut LogicalPlan {
        &mut self.children[0]
    }

    /// Pre-order walk, invoking `f` on every node including `self`.
    pub fn walk_pre_order<'a>(&'a self, f: &mut impl FnMut(&'a LogicalPlan)) {
        f(self);
        for child in &self.children {
            child.walk_pre_order(f);
        }
    }

    pub fn walk_post_order<'a>(&'a self, f: &mut impl FnMut(&'a LogicalPlan)) {
        for child in &self.children {
            child.walk_post_order(f);
        }
        f(self);
    }

    /// All relation names this node's own expressions (not its children's)
    /// directly mention, used for predicate-pushdown relation tracking.
    pub fn own_relation_names(&self) -> Vec<String> {
        match &self.step {
            Step::Scan(s) => vec![s.alias.clone()],
            Step::FunctionDataset(s) => vec![s.alias.clone()],
            Step::Subquery(s) => vec![s.alias.clone()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_has_single_root_per_query() {
        let plan = LogicalPlan::leaf(Step::Exit(ExitStep { columns: Vec::new() }));
        assert_eq!(plan.step.name(), "Exit");
        assert!(plan.children.is_empty());
    }
}
