//! `BooleanSimplification`, `ConstantFolding`, and `PredicateRewrite` (§4.3):
//! the three strategies that rewrite individual expressions in place without
//! touching plan shape.

use flint_types::ScalarValue;

use crate::expr::{BinaryOp, ComparisonOp, Expr, ExprKind, UnaryOp};
use crate::logical::LogicalPlan;

use super::map_all_exprs;

/// Push `NOT` inward via De Morgan, collapse double negation, and normalize
/// negated comparisons to their direct counterpart (`NOT a = b -> a <> b`,
/// and the same for `Like`/`ILike`/`In` — the latter already lowered to an
/// `Or` of `Eq`s, so De Morgan over `Or` handles it for free).
pub fn simplify(mut plan: LogicalPlan) -> LogicalPlan {
    map_all_exprs(&mut plan, &mut |expr| simplify_step(expr));
    plan
}

fn simplify_step(expr: &mut Expr) {
    if matches!(expr.kind, ExprKind::Not(_)) {
        let ExprKind::Not(inner) = std::mem::replace(&mut expr.kind, ExprKind::Literal(ScalarValue::Null)) else {
            unreachable!()
        };
        let negated = negate(*inner);
        let schema_column = expr.schema_column;
        let query_column = expr.query_column.take();
        *expr = negated;
        expr.schema_column = schema_column;
        expr.query_column = query_column;
    }
}

/// Compute the logical negation of an already-simplified expression,
/// preserving its binding metadata on the resulting top node so column
/// identity references elsewhere in the plan stay valid.
fn negate(expr: Expr) -> Expr {
    let schema_column = expr.schema_column;
    let query_column = expr.query_column.clone();
    let alias = expr.alias.clone();

    let mut result = match expr.kind {
        ExprKind::Not(inner) => *inner, // double negation
        ExprKind::And(l, r) => Expr::new(ExprKind::Or(Box::new(negate(*l)), Box::new(negate(*r)))),
        ExprKind::Or(l, r) => Expr::new(ExprKind::And(Box::new(negate(*l)), Box::new(negate(*r)))),
        ExprKind::Comparison { op, left, right } => Expr::new(ExprKind::Comparison {
            op: op.negated(),
            left,
            right,
        }),
        ExprKind::Unary { op, operand } => match negated_unary(op) {
            Some(op) => Expr::new(ExprKind::Unary { op, operand }),
            None => {
                let inner = Expr::new(ExprKind::Unary { op, operand });
                Expr::new(ExprKind::Not(Box::new(inner)))
            }
        },
        ExprKind::Nested(inner) => Expr::new(ExprKind::Nested(Box::new(negate(*inner)))),
        other => Expr::new(ExprKind::Not(Box::new(Expr {
            kind: other,
            alias: None,
            schema_column: None,
            query_column: None,
        }))),
    };
    result.schema_column = schema_column;
    result.query_column = query_column;
    result.alias = alias;
    result
}

fn negated_unary(op: UnaryOp) -> Option<UnaryOp> {
    match op {
        UnaryOp::IsNull => Some(UnaryOp::IsNotNull),
        UnaryOp::IsNotNull => Some(UnaryOp::IsNull),
        UnaryOp::IsTrue => Some(UnaryOp::IsNotTrue),
        UnaryOp::IsFalse => Some(UnaryOp::IsNotFalse),
        UnaryOp::IsNotTrue => Some(UnaryOp::IsTrue),
        UnaryOp::IsNotFalse => Some(UnaryOp::IsFalse),
        UnaryOp::Negate => None,
    }
}

/// Evaluate subexpressions whose operands are all literals (§4.3).
pub fn constant_fold(mut plan: LogicalPlan) -> LogicalPlan {
    map_all_exprs(&mut plan, &mut |expr| fold_step(expr));
    plan
}

fn fold_step(expr: &mut Expr) {
    let folded = match &expr.kind {
        ExprKind::Binary { op, left, right } => match (&left.kind, &right.kind) {
            (ExprKind::Literal(a), ExprKind::Literal(b)) => eval_binary(*op, a, b).map(ExprKind::Literal),
            _ => None,
        },
        ExprKind::Comparison { op, left, right } => match (&left.kind, &right.kind) {
            (ExprKind::Literal(a), ExprKind::Literal(b)) => {
                eval_comparison(*op, a, b).map(|b| ExprKind::Literal(ScalarValue::Boolean(b)))
            }
            _ => None,
        },
        ExprKind::And(l, r) => match (&l.kind, &r.kind) {
            (ExprKind::Literal(ScalarValue::Boolean(a)), ExprKind::Literal(ScalarValue::Boolean(b))) => {
                Some(ExprKind::Literal(ScalarValue::Boolean(*a && *b)))
            }
            _ => None,
        },
        ExprKind::Or(l, r) => match (&l.kind, &r.kind) {
            (ExprKind::Literal(ScalarValue::Boolean(a)), ExprKind::Literal(ScalarValue::Boolean(b))) => {
                Some(ExprKind::Literal(ScalarValue::Boolean(*a || *b)))
            }
            _ => None,
        },
        ExprKind::Xor(l, r) => match (&l.kind, &r.kind) {
            (ExprKind::Literal(ScalarValue::Boolean(a)), ExprKind::Literal(ScalarValue::Boolean(b))) => {
                Some(ExprKind::Literal(ScalarValue::Boolean(*a != *b)))
            }
            _ => None,
        },
        ExprKind::Not(inner) => match &inner.kind {
            ExprKind::Literal(ScalarValue::Boolean(b)) => Some(ExprKind::Literal(ScalarValue::Boolean(!b))),
            _ => None,
        },
        ExprKind::Unary { op, operand } => match &operand.kind {
            ExprKind::Literal(v) => fold_unary(*op, v).map(ExprKind::Literal),
            _ => None,
        },
        _ => None,
    };
    if let Some(kind) = folded {
        expr.kind = kind;
    }
}

fn eval_binary(op: BinaryOp, a: &ScalarValue, b: &ScalarValue) -> Option<ScalarValue> {
    if let (BinaryOp::Concat, ScalarValue::Utf8(x), ScalarValue::Utf8(y)) = (op, a, b) {
        return Some(ScalarValue::Utf8(format!("{x}{y}")));
    }
    let (x, y) = (a.as_f64()?, b.as_f64()?);
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Subtract => x - y,
        BinaryOp::Multiply => x * y,
        BinaryOp::Divide => {
            if y == 0.0 {
                return None;
            }
            x / y
        }
        BinaryOp::Modulo => {
            if y == 0.0 {
                return None;
            }
            x % y
        }
        BinaryOp::Concat => return None,
    };
    let both_int = matches!(a, ScalarValue::Int64(_)) && matches!(b, ScalarValue::Int64(_));
    if both_int && !matches!(op, BinaryOp::Divide) {
        Some(ScalarValue::Int64(result as i64))
    } else {
        Some(ScalarValue::Float64(result))
    }
}

fn eval_comparison(op: ComparisonOp, a: &ScalarValue, b: &ScalarValue) -> Option<bool> {
    use std::cmp::Ordering;
    match op {
        ComparisonOp::Eq => Some(a == b),
        ComparisonOp::NotEq => Some(a != b),
        ComparisonOp::Lt => a.partial_cmp(b).map(|o| o == Ordering::Less),
        ComparisonOp::LtEq => a.partial_cmp(b).map(|o| o != Ordering::Greater),
        ComparisonOp::Gt => a.partial_cmp(b).map(|o| o == Ordering::Greater),
        ComparisonOp::GtEq => a.partial_cmp(b).map(|o| o != Ordering::Less),
        // Pattern-matching comparisons aren't folded without evaluating the
        // pattern engine; leave them for the physical evaluator.
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, v: &ScalarValue) -> Option<ScalarValue> {
    match op {
        UnaryOp::IsNull => Some(ScalarValue::Boolean(v.is_null())),
        UnaryOp::IsNotNull => Some(ScalarValue::Boolean(!v.is_null())),
        UnaryOp::IsTrue => Some(ScalarValue::Boolean(v.as_bool() == Some(true))),
        UnaryOp::IsFalse => Some(ScalarValue::Boolean(v.as_bool() == Some(false))),
        UnaryOp::IsNotTrue => Some(ScalarValue::Boolean(v.as_bool() != Some(true))),
        UnaryOp::IsNotFalse => Some(ScalarValue::Boolean(v.as_bool() != Some(false))),
        UnaryOp::Negate => match v {
            ScalarValue::Int64(n) => Some(ScalarValue::Int64(-n)),
            ScalarValue::Float64(f) => Some(ScalarValue::Float64(-f)),
            _ => None,
        },
    }
}

/// Canonicalize predicates the way the specification's `PredicateRewrite`
/// strategy does: `a = a -> TRUE` when both operands are structurally the
/// same bound column.
pub fn predicate_rewrite(mut plan: LogicalPlan) -> LogicalPlan {
    map_all_exprs(&mut plan, &mut |expr| rewrite_step(expr));
    plan
}

fn rewrite_step(expr: &mut Expr) {
    if let ExprKind::Comparison {
        op: ComparisonOp::Eq,
        left,
        right,
    } = &expr.kind
    {
        if let (Some(l), Some(r)) = (left.schema_column, right.schema_column) {
            if l == r {
                expr.kind = ExprKind::Literal(ScalarValue::Boolean(true));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnId;

    fn ident(id: u64) -> Expr {
        let mut e = Expr::identifier(None, "x");
        e.schema_column = Some(ColumnId(id));
        e
    }

    #[test]
    fn not_and_pushes_to_or_of_negations() {
        let mut expr = Expr::new(ExprKind::Not(Box::new(Expr::new(ExprKind::And(
            Box::new(Expr::new(ExprKind::Comparison {
                op: ComparisonOp::Eq,
                left: Box::new(ident(1)),
                right: Box::new(ident(2)),
            })),
            Box::new(Expr::new(ExprKind::Comparison {
                op: ComparisonOp::Lt,
                left: Box::new(ident(1)),
                right: Box::new(ident(2)),
            })),
        )))));
        simplify_step(&mut expr); // top-level: the node itself is already a Not
        match expr.kind {
            ExprKind::Or(l, r) => {
                assert!(matches!(
                    l.kind,
                    ExprKind::Comparison { op: ComparisonOp::NotEq, .. }
                ));
                assert!(matches!(
                    r.kind,
                    ExprKind::Comparison { op: ComparisonOp::GtEq, .. }
                ));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn double_negation_collapses() {
        let mut expr = Expr::new(ExprKind::Not(Box::new(Expr::new(ExprKind::Not(Box::new(
            ident(1),
        ))))));
        simplify_step(&mut expr);
        assert!(matches!(expr.kind, ExprKind::Identifier { .. }));
    }

    #[test]
    fn constant_binary_folds() {
        let mut expr = Expr::new(ExprKind::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::literal(ScalarValue::Int64(1))),
            right: Box::new(Expr::literal(ScalarValue::Int64(2))),
        });
        fold_step(&mut expr);
        assert_eq!(expr.kind, ExprKind::Literal(ScalarValue::Int64(3)));
    }

    #[test]
    fn self_equality_rewrites_to_true() {
        let mut expr = Expr::new(ExprKind::Comparison {
            op: ComparisonOp::Eq,
            left: Box::new(ident(5)),
            right: Box::new(ident(5)),
        });
        rewrite_step(&mut expr);
        assert_eq!(expr.kind, ExprKind::Literal(ScalarValue::Boolean(true)));
    }
}
