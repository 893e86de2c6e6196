//! The expression tree (§3).
//!
//! Every node carries a `node_type` tag (modeled here as a variant of
//! [`ExprKind`] rather than a string, since Rust gives us exhaustiveness
//! checking for free) plus the metadata the specification calls out
//! explicitly: an optional `alias`, and — once the binder has run —
//! `schema_column` (the column identity) and `query_column` (the display
//! name used in the final projection).

use std::fmt;

use flint_types::ScalarValue;

use crate::logical::LogicalPlan;
use crate::schema::ColumnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
    IsNotTrue,
    IsNotFalse,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    ILike,
    NotILike,
    SimilarTo,
    NotSimilarTo,
    Contains,
    NotContains,
}

impl ComparisonOp {
    pub fn negated(self) -> Self {
        use ComparisonOp::*;
        match self {
            Eq => NotEq,
            NotEq => Eq,
            Lt => GtEq,
            LtEq => Gt,
            Gt => LtEq,
            GtEq => Lt,
            Like => NotLike,
            NotLike => Like,
            ILike => NotILike,
            NotILike => ILike,
            SimilarTo => NotSimilarTo,
            NotSimilarTo => SimilarTo,
            Contains => NotContains,
            NotContains => Contains,
        }
    }

    /// Whether this comparison is one of the operators a connector may be
    /// asked to push down (§4.4, §6: `PUSHABLE_OPS`).
    pub fn is_pushable(self) -> bool {
        matches!(
            self,
            ComparisonOp::Eq
                | ComparisonOp::NotEq
                | ComparisonOp::Lt
                | ComparisonOp::LtEq
                | ComparisonOp::Gt
                | ComparisonOp::GtEq
        )
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
            ComparisonOp::ILike => "ILIKE",
            ComparisonOp::NotILike => "NOT ILIKE",
            ComparisonOp::SimilarTo => "SIMILAR TO",
            ComparisonOp::NotSimilarTo => "NOT SIMILAR TO",
            ComparisonOp::Contains => "CONTAINS",
            ComparisonOp::NotContains => "NOT CONTAINS",
        };
        write!(f, "{s}")
    }
}

/// The tagged kind of an expression node. Roughly a restatement of the
/// specification's `node_type` enumeration, but as a Rust enum-of-structs
/// rather than a string tag plus generic `left`/`right`/`centre` slots.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier {
        source: Option<String>,
        source_column: String,
    },
    Literal(ScalarValue),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Xor(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Aggregator {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    Nested(Box<Expr>),
    Wildcard {
        qualifier: Option<String>,
    },
    Subquery(Box<LogicalPlan>),
}

/// An expression tree node together with its binding metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub alias: Option<String>,
    /// Set by the binder: the stable identity of the column this expression
    /// resolves to (Invariant 1).
    pub schema_column: Option<ColumnId>,
    /// Set by the binder: the display name used in the final projection.
    pub query_column: Option<String>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            alias: None,
            schema_column: None,
            query_column: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn identifier(source: Option<String>, column: impl Into<String>) -> Self {
        Expr::new(ExprKind::Identifier {
            source,
            source_column: column.into(),
        })
    }

    pub fn literal(value: ScalarValue) -> Self {
        Expr::new(ExprKind::Literal(value))
    }

    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        let mut iter = exprs.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |left, right| {
            Expr::new(ExprKind::And(Box::new(left), Box::new(right)))
        }))
    }

    /// Split a (possibly nested) conjunction into its individual conjuncts,
    /// unwrapping `NESTED` along the way. Used by `SplitConjunctivePredicates`.
    pub fn split_conjuncts(self) -> Vec<Expr> {
        match self.kind {
            ExprKind::And(left, right) => {
                let mut out = left.split_conjuncts();
                out.extend(right.split_conjuncts());
                out
            }
            ExprKind::Nested(inner) => inner.split_conjuncts(),
            _ => vec![self],
        }
    }

    pub fn is_aggregate(&self) -> bool {
        match &self.kind {
            ExprKind::Aggregator { .. } => true,
            ExprKind::Nested(inner) => inner.is_aggregate(),
            _ => self.children().iter().any(|c| c.is_aggregate()),
        }
    }

    /// Direct children, for traversals that don't need to distinguish
    /// `left`/`right`/`centre` by name.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Identifier { .. } | ExprKind::Literal(_) | ExprKind::Wildcard { .. } => {
                Vec::new()
            }
            ExprKind::Unary { operand, .. } => vec![operand],
            ExprKind::Binary { left, right, .. } => vec![left, right],
            ExprKind::Comparison { left, right, .. } => vec![left, right],
            ExprKind::And(l, r) | ExprKind::Or(l, r) | ExprKind::Xor(l, r) => vec![l, r],
            ExprKind::Not(inner) | ExprKind::Nested(inner) => vec![inner],
            ExprKind::Function { args, .. } => args.iter().collect(),
            ExprKind::Aggregator { args, .. } => args.iter().collect(),
            ExprKind::Subquery(_) => Vec::new(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match &mut self.kind {
            ExprKind::Identifier { .. } | ExprKind::Literal(_) | ExprKind::Wildcard { .. } => {
                Vec::new()
            }
            ExprKind::Unary { operand, .. } => vec![operand],
            ExprKind::Binary { left, right, .. } => vec![left, right],
            ExprKind::Comparison { left, right, .. } => vec![left, right],
            ExprKind::And(l, r) | ExprKind::Or(l, r) | ExprKind::Xor(l, r) => vec![l, r],
            ExprKind::Not(inner) | ExprKind::Nested(inner) => vec![inner],
            ExprKind::Function { args, .. } => args.iter_mut().collect(),
            ExprKind::Aggregator { args, .. } => args.iter_mut().collect(),
            ExprKind::Subquery(_) => Vec::new(),
        }
    }

    /// Every relation name referenced transitively by IDENTIFIER nodes with
    /// an explicit `source`. Used by `PredicatePushdown` to decide whether a
    /// predicate is single-relation.
    pub fn referenced_relations(&self, out: &mut std::collections::BTreeSet<String>) {
        if let ExprKind::Identifier {
            source: Some(source),
            ..
        } = &self.kind
        {
            out.insert(source.clone());
        }
        for child in self.children() {
            child.referenced_relations(out);
        }
    }

    pub fn referenced_column_ids(&self, out: &mut std::collections::BTreeSet<ColumnId>) {
        if let Some(id) = self.schema_column {
            out.insert(id);
        }
        for child in self.children() {
            child.referenced_column_ids(out);
        }
    }
}

/// Deterministic canonical name for an expression, used as the name of the
/// `$derived`/`$calculated` column it produces (Testable Property 2: the
/// same expression always formats to the same name).
pub fn format_expression(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier { source, source_column } => match source {
            Some(source) => format!("{source}.{source_column}"),
            None => source_column.clone(),
        },
        ExprKind::Literal(value) => value.to_string(),
        ExprKind::Unary { op, operand } => {
            let inner = format_expression(operand);
            match op {
                UnaryOp::IsNull => format!("{inner} IS NULL"),
                UnaryOp::IsNotNull => format!("{inner} IS NOT NULL"),
                UnaryOp::IsTrue => format!("{inner} IS TRUE"),
                UnaryOp::IsFalse => format!("{inner} IS FALSE"),
                UnaryOp::IsNotTrue => format!("{inner} IS NOT TRUE"),
                UnaryOp::IsNotFalse => format!("{inner} IS NOT FALSE"),
                UnaryOp::Negate => format!("-{inner}"),
            }
        }
        ExprKind::Binary { op, left, right } => {
            let sym = match op {
                BinaryOp::Add => "+",
                BinaryOp::Subtract => "-",
                BinaryOp::Multiply => "*",
                BinaryOp::Divide => "/",
                BinaryOp::Modulo => "%",
                BinaryOp::Concat => "||",
            };
            format!("{} {} {}", format_expression(left), sym, format_expression(right))
        }
        ExprKind::Comparison { op, left, right } => {
            format!("{} {} {}", format_expression(left), op, format_expression(right))
        }
        ExprKind::And(l, r) => format!("{} AND {}", format_expression(l), format_expression(r)),
        ExprKind::Or(l, r) => format!("{} OR {}", format_expression(l), format_expression(r)),
        ExprKind::Xor(l, r) => format!("{} XOR {}", format_expression(l), format_expression(r)),
        ExprKind::Not(inner) => format!("NOT {}", format_expression(inner)),
        ExprKind::Function { name, args } => {
            let args = args.iter().map(format_expression).collect::<Vec<_>>().join(", ");
            format!("{name}({args})")
        }
        ExprKind::Aggregator { name, args, distinct } => {
            let args = args.iter().map(format_expression).collect::<Vec<_>>().join(", ");
            if *distinct {
                format!("{name}(DISTINCT {args})")
            } else {
                format!("{name}({args})")
            }
        }
        ExprKind::Nested(inner) => format!("({})", format_expression(inner)),
        ExprKind::Wildcard { qualifier } => match qualifier {
            Some(q) => format!("{q}.*"),
            None => "*".to_string(),
        },
        ExprKind::Subquery(_) => "$subquery".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_expression_is_deterministic() {
        let a = Expr::new(ExprKind::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::identifier(None, "x")),
            right: Box::new(Expr::literal(ScalarValue::Int64(1))),
        });
        let b = a.clone();
        assert_eq!(format_expression(&a), format_expression(&b));
    }

    #[test]
    fn split_conjuncts_flattens_and_chain() {
        let expr = Expr::new(ExprKind::And(
            Box::new(Expr::identifier(None, "a")),
            Box::new(Expr::new(ExprKind::And(
                Box::new(Expr::identifier(None, "b")),
                Box::new(Expr::identifier(None, "c")),
            ))),
        ));
        let conjuncts = expr.split_conjuncts();
        assert_eq!(conjuncts.len(), 3);
    }
}
