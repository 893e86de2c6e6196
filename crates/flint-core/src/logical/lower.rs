//! AST → logical plan lowering (§4.1).
//!
//! This stage never resolves names: it shapes the parser's `ast::Expr`
//! tree into `crate::expr::Expr` and threads table factors and joins into
//! the leaves-up operator chain the specification prescribes —
//!
//! `Scan|Subquery|FunctionDataset → Join → Filter(WHERE) → AggregateAndGroup
//! → Filter(HAVING) → Project → Distinct → Order → Offset → Limit → Exit`
//!
//! — leaving every identifier, alias and wildcard for [`crate::binder`] to
//! resolve against a [`crate::binder::BindContext`].

use chrono::NaiveDate;
use flint_error::{EngineError, ErrorKind, Result};
use flint_parser::{self as ast};
use flint_types::ScalarValue;

use crate::expr::{BinaryOp, ComparisonOp, Expr as CoreExpr, ExprKind, UnaryOp};
use crate::logical::{
    AggregateStep, DistinctStep, ExitStep, ExplainStep, FilterStep, FunctionDatasetKind,
    FunctionDatasetStep, JoinKind, JoinStep, LimitStep, LogicalPlan, OffsetStep, OrderStep,
    ProjectStep, ScanStep, SetStep, ShowColumnsStep, ShowVariableStep, Step, SubqueryStep,
};

pub fn lower_statement(stmt: &ast::Statement) -> Result<LogicalPlan> {
    match stmt {
        ast::Statement::Query(query) => lower_query(query),
        ast::Statement::Explain(inner) => {
            let child = lower_statement(inner)?;
            Ok(LogicalPlan::unary(
                Step::Explain(ExplainStep::default()),
                child,
            ))
        }
        ast::Statement::ShowColumns { table } => Ok(LogicalPlan::leaf(Step::ShowColumns(
            ShowColumnsStep {
                table: table.clone(),
            },
        ))),
        ast::Statement::ShowCreate { table } => Ok(LogicalPlan::leaf(Step::ShowColumns(
            ShowColumnsStep {
                table: table.clone(),
            },
        ))),
        ast::Statement::ShowVariable { name } => Ok(LogicalPlan::leaf(Step::ShowVariable(
            ShowVariableStep { name: name.clone() },
        ))),
        ast::Statement::ShowFunctions => Ok(LogicalPlan::leaf(Step::ShowVariable(
            ShowVariableStep {
                name: "FUNCTIONS".to_string(),
            },
        ))),
        ast::Statement::Set { name, value, session } => Ok(LogicalPlan::leaf(Step::Set(SetStep {
            name: name.clone(),
            value: lower_expr(value)?,
            session: *session,
        }))),
    }
}

fn lower_query(query: &ast::QueryNode) -> Result<LogicalPlan> {
    let select = &query.select;

    let mut plan = lower_from(&select.from)?;

    if let Some(predicate) = &select.selection {
        plan = LogicalPlan::unary(
            Step::Filter(FilterStep {
                condition: lower_expr(predicate)?,
                simple: None,
                relations: None,
            }),
            plan,
        );
    }

    let aggregates = collect_aggregates(&select.projection, select.having.as_ref());
    let is_aggregate_query = !select.group_by.is_empty() || !aggregates.is_empty();
    if is_aggregate_query {
        let groups = select
            .group_by
            .iter()
            .map(lower_expr)
            .collect::<Result<Vec<_>>>()?;
        let mut all_identifiers = Vec::new();
        for g in &groups {
            collect_identifiers(g, &mut all_identifiers);
        }
        for a in &aggregates {
            collect_identifiers(a, &mut all_identifiers);
        }
        plan = LogicalPlan::unary(
            Step::AggregateAndGroup(AggregateStep {
                groups,
                aggregates,
                all_identifiers,
            }),
            plan,
        );
    }

    if let Some(having) = &select.having {
        plan = LogicalPlan::unary(
            Step::Filter(FilterStep {
                condition: lower_expr(having)?,
                simple: None,
                relations: None,
            }),
            plan,
        );
    }

    let columns = lower_projection(&select.projection)?;
    let order_by_columns = query
        .order_by
        .iter()
        .map(|o| lower_expr(&o.expr))
        .collect::<Result<Vec<_>>>()?;
    plan = LogicalPlan::unary(
        Step::Project(ProjectStep {
            columns,
            order_by_columns,
        }),
        plan,
    );

    if let Some(on) = &select.distinct {
        let on = if on.is_empty() {
            None
        } else {
            Some(on.iter().map(lower_expr).collect::<Result<Vec<_>>>()?)
        };
        plan = LogicalPlan::unary(Step::Distinct(DistinctStep { on }), plan);
    }

    if !query.order_by.is_empty() {
        let order_by = query
            .order_by
            .iter()
            .map(|o| Ok((lower_expr(&o.expr)?, o.asc)))
            .collect::<Result<Vec<_>>>()?;
        plan = LogicalPlan::unary(Step::Order(OrderStep { order_by }), plan);
    }

    if let Some(offset) = &query.offset {
        plan = LogicalPlan::unary(
            Step::Offset(OffsetStep {
                n: literal_i64(offset)?,
            }),
            plan,
        );
    }

    if let Some(limit) = &query.limit {
        plan = LogicalPlan::unary(
            Step::Limit(LimitStep {
                n: literal_i64(limit)?,
            }),
            plan,
        );
    }

    let exit_columns = lower_projection(&select.projection)?;
    plan = LogicalPlan::unary(Step::Exit(ExitStep { columns: exit_columns }), plan);

    Ok(plan)
}

fn literal_i64(expr: &ast::Expr) -> Result<i64> {
    match expr {
        ast::Expr::Literal(ast::Literal::Number(n)) => n.parse::<i64>().map_err(|_| {
            EngineError::new(ErrorKind::IncorrectType, format!("'{n}' is not an integer"))
        }),
        ast::Expr::Placeholder(_) => Ok(0),
        other => Err(EngineError::new(
            ErrorKind::IncorrectType,
            format!("expected an integer literal, found {other:?}"),
        )),
    }
}

fn lower_from(from: &[ast::TableWithJoins]) -> Result<LogicalPlan> {
    let mut tables = from.iter();
    let first = tables
        .next()
        .ok_or_else(|| EngineError::internal("SELECT with no FROM clause"))?;
    let mut plan = lower_table_with_joins(first)?;
    for next in tables {
        let right = lower_table_with_joins(next)?;
        plan = LogicalPlan::new(Step::Join(JoinStep::new(JoinKind::Cross)), vec![plan, right]);
    }
    Ok(plan)
}

fn lower_table_with_joins(twj: &ast::TableWithJoins) -> Result<LogicalPlan> {
    let mut plan = lower_table_factor(&twj.relation)?;
    for join in &twj.joins {
        let right = lower_table_factor(&join.relation)?;
        plan = lower_join(plan, right, &join.operator)?;
    }
    Ok(plan)
}

fn lower_join(left: LogicalPlan, right: LogicalPlan, operator: &ast::JoinOperator) -> Result<LogicalPlan> {
    let mut step = match operator {
        ast::JoinOperator::Inner(constraint) => {
            let mut s = JoinStep::new(JoinKind::Inner);
            apply_constraint(&mut s, constraint)?;
            s
        }
        ast::JoinOperator::LeftOuter(constraint) => {
            let mut s = JoinStep::new(JoinKind::LeftOuter);
            apply_constraint(&mut s, constraint)?;
            s
        }
        ast::JoinOperator::RightOuter(constraint) => {
            let mut s = JoinStep::new(JoinKind::RightOuter);
            apply_constraint(&mut s, constraint)?;
            s
        }
        ast::JoinOperator::FullOuter(constraint) => {
            let mut s = JoinStep::new(JoinKind::FullOuter);
            apply_constraint(&mut s, constraint)?;
            s
        }
        ast::JoinOperator::Cross => JoinStep::new(JoinKind::Cross),
        ast::JoinOperator::CrossJoinUnnest { unnest_column } => {
            let mut s = JoinStep::new(JoinKind::CrossUnnest);
            s.unnest_column = Some(lower_expr(unnest_column)?);
            s
        }
        ast::JoinOperator::Natural(_) => JoinStep::new(JoinKind::Natural),
        ast::JoinOperator::LeftSemi(constraint) => {
            let mut s = JoinStep::new(JoinKind::LeftSemi);
            apply_constraint(&mut s, constraint)?;
            s
        }
        ast::JoinOperator::RightSemi(constraint) => {
            let mut s = JoinStep::new(JoinKind::RightSemi);
            apply_constraint(&mut s, constraint)?;
            s
        }
        ast::JoinOperator::LeftAnti(constraint) => {
            let mut s = JoinStep::new(JoinKind::LeftAnti);
            apply_constraint(&mut s, constraint)?;
            s
        }
        ast::JoinOperator::RightAnti(constraint) => {
            let mut s = JoinStep::new(JoinKind::RightAnti);
            apply_constraint(&mut s, constraint)?;
            s
        }
    };
    if let ast::JoinOperator::Natural(kind) = operator {
        step.kind = match kind {
            ast::NaturalKind::Inner => JoinKind::Natural,
            ast::NaturalKind::Left => JoinKind::LeftOuter,
            ast::NaturalKind::Right => JoinKind::RightOuter,
            ast::NaturalKind::Full => JoinKind::FullOuter,
        };
    }
    Ok(LogicalPlan::new(Step::Join(step), vec![left, right]))
}

fn apply_constraint(step: &mut JoinStep, constraint: &ast::JoinConstraint) -> Result<()> {
    match constraint {
        ast::JoinConstraint::On(expr) => step.on = Some(lower_expr(expr)?),
        ast::JoinConstraint::Using(cols) => step.using = Some(cols.clone()),
        ast::JoinConstraint::None => {}
    }
    Ok(())
}

fn lower_table_factor(factor: &ast::TableFactor) -> Result<LogicalPlan> {
    match factor {
        ast::TableFactor::Table {
            name,
            alias,
            hints,
            temporal,
        } => {
            let relation = name.join(".");
            let resolved_alias = alias.clone().unwrap_or_else(|| relation.clone());
            let (start_date, end_date) = lower_temporal(temporal.as_ref())?;
            Ok(LogicalPlan::leaf(Step::Scan(ScanStep {
                relation,
                alias: resolved_alias,
                hints: hints.clone(),
                start_date,
                end_date,
                connector: None,
                schema: None,
                columns: None,
            })))
        }
        ast::TableFactor::Derived { subquery, alias } => {
            let inner = lower_query(subquery)?;
            let resolved_alias = alias
                .clone()
                .ok_or_else(|| EngineError::new(ErrorKind::UnnamedSubquery, "subquery has no alias"))?;
            Ok(LogicalPlan::unary(
                Step::Subquery(SubqueryStep { alias: resolved_alias }),
                inner,
            ))
        }
        ast::TableFactor::Function {
            name,
            args,
            alias,
            columns,
        } => {
            let function = match name.to_ascii_uppercase().as_str() {
                "VALUES" => FunctionDatasetKind::Values,
                "UNNEST" => FunctionDatasetKind::Unnest,
                "GENERATE_SERIES" => FunctionDatasetKind::GenerateSeries,
                "FAKE" => FunctionDatasetKind::Fake,
                other => {
                    return Err(EngineError::new(
                        ErrorKind::DatasetNotFound,
                        format!("'{other}' is not a recognized function dataset"),
                    ))
                }
            };
            let lowered_args = args
                .iter()
                .map(|a| match a {
                    ast::FunctionArg::Expr(e) => lower_expr(e),
                    ast::FunctionArg::Wildcard => Ok(CoreExpr::new(ExprKind::Wildcard { qualifier: None })),
                })
                .collect::<Result<Vec<_>>>()?;
            let resolved_alias = alias.clone().unwrap_or_else(|| name.to_ascii_lowercase());
            Ok(LogicalPlan::leaf(Step::FunctionDataset(FunctionDatasetStep {
                function,
                args: lowered_args,
                alias: resolved_alias,
                columns: columns.clone(),
                schema: None,
            })))
        }
    }
}

fn lower_temporal(temporal: Option<&ast::TemporalFilter>) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    match temporal {
        None => Ok((None, None)),
        Some(ast::TemporalFilter::Today) => {
            let today = chrono::Utc::now().date_naive();
            Ok((Some(today), Some(today)))
        }
        Some(ast::TemporalFilter::Yesterday) => {
            let yesterday = chrono::Utc::now().date_naive() - chrono::Duration::days(1);
            Ok((Some(yesterday), Some(yesterday)))
        }
        Some(ast::TemporalFilter::AsOf(expr)) => {
            let d = literal_date(expr)?;
            Ok((Some(d), Some(d)))
        }
        Some(ast::TemporalFilter::Between(low, high)) => {
            let low = literal_date(low)?;
            let high = literal_date(high)?;
            if low > high {
                return Err(EngineError::new(
                    ErrorKind::InvalidTemporalRangeFilter,
                    format!("temporal range start '{low}' is after end '{high}'"),
                ));
            }
            Ok((Some(low), Some(high)))
        }
    }
}

fn literal_date(expr: &ast::Expr) -> Result<NaiveDate> {
    match expr {
        ast::Expr::Literal(ast::Literal::SingleQuotedString(s)) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| EngineError::new(ErrorKind::IncorrectType, format!("'{s}' is not a DATE")))
        }
        other => Err(EngineError::new(
            ErrorKind::IncorrectType,
            format!("expected a date literal, found {other:?}"),
        )),
    }
}

fn lower_projection(projection: &[ast::SelectItem]) -> Result<Vec<CoreExpr>> {
    projection
        .iter()
        .map(|item| match item {
            ast::SelectItem::UnnamedExpr(e) => lower_expr(e),
            ast::SelectItem::ExprWithAlias(e, alias) => Ok(lower_expr(e)?.with_alias(alias.clone())),
            ast::SelectItem::Wildcard => Ok(CoreExpr::new(ExprKind::Wildcard { qualifier: None })),
            ast::SelectItem::QualifiedWildcard(parts) => Ok(CoreExpr::new(ExprKind::Wildcard {
                qualifier: Some(parts.join(".")),
            })),
        })
        .collect()
}

fn collect_aggregates(projection: &[ast::SelectItem], having: Option<&ast::Expr>) -> Vec<CoreExpr> {
    let mut out = Vec::new();
    for item in projection {
        let expr = match item {
            ast::SelectItem::UnnamedExpr(e) | ast::SelectItem::ExprWithAlias(e, _) => Some(e),
            _ => None,
        };
        if let Some(e) = expr {
            if let Ok(lowered) = lower_expr(e) {
                collect_aggregate_nodes(&lowered, &mut out);
            }
        }
    }
    if let Some(h) = having {
        if let Ok(lowered) = lower_expr(h) {
            collect_aggregate_nodes(&lowered, &mut out);
        }
    }
    out
}

fn collect_aggregate_nodes(expr: &CoreExpr, out: &mut Vec<CoreExpr>) {
    if matches!(expr.kind, ExprKind::Aggregator { .. }) {
        out.push(expr.clone());
        return;
    }
    for child in expr.children() {
        collect_aggregate_nodes(child, out);
    }
}

fn collect_identifiers(expr: &CoreExpr, out: &mut Vec<CoreExpr>) {
    if matches!(expr.kind, ExprKind::Identifier { .. }) {
        out.push(expr.clone());
        return;
    }
    for child in expr.children() {
        collect_identifiers(child, out);
    }
}

pub fn lower_expr(expr: &ast::Expr) -> Result<CoreExpr> {
    Ok(match expr {
        ast::Expr::Ident { source, column } => {
            CoreExpr::identifier(source.clone(), column.clone())
        }
        ast::Expr::Literal(lit) => CoreExpr::literal(lower_literal(lit)),
        ast::Expr::Placeholder(idx) => CoreExpr::new(ExprKind::Identifier {
            source: None,
            source_column: format!("${idx}"),
        }),
        ast::Expr::UnaryMinus(inner) => CoreExpr::new(ExprKind::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(lower_expr(inner)?),
        }),
        ast::Expr::Not(inner) => CoreExpr::new(ExprKind::Not(Box::new(lower_expr(inner)?))),
        ast::Expr::And(l, r) => CoreExpr::new(ExprKind::And(
            Box::new(lower_expr(l)?),
            Box::new(lower_expr(r)?),
        )),
        ast::Expr::Or(l, r) => CoreExpr::new(ExprKind::Or(
            Box::new(lower_expr(l)?),
            Box::new(lower_expr(r)?),
        )),
        ast::Expr::Xor(l, r) => CoreExpr::new(ExprKind::Xor(
            Box::new(lower_expr(l)?),
            Box::new(lower_expr(r)?),
        )),
        ast::Expr::BinaryOp { left, op, right } => CoreExpr::new(ExprKind::Binary {
            op: lower_binary_op(*op),
            left: Box::new(lower_expr(left)?),
            right: Box::new(lower_expr(right)?),
        }),
        ast::Expr::Comparison { left, op, right } => CoreExpr::new(ExprKind::Comparison {
            op: lower_comparison_op(*op),
            left: Box::new(lower_expr(left)?),
            right: Box::new(lower_expr(right)?),
        }),
        ast::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            let e = lower_expr(expr)?;
            let lo = lower_expr(low)?;
            let hi = lower_expr(high)?;
            let ge = CoreExpr::new(ExprKind::Comparison {
                op: ComparisonOp::GtEq,
                left: Box::new(e.clone()),
                right: Box::new(lo),
            });
            let le = CoreExpr::new(ExprKind::Comparison {
                op: ComparisonOp::LtEq,
                left: Box::new(e),
                right: Box::new(hi),
            });
            let both = CoreExpr::new(ExprKind::And(Box::new(ge), Box::new(le)));
            if *negated {
                CoreExpr::new(ExprKind::Not(Box::new(both)))
            } else {
                both
            }
        }
        ast::Expr::InList { expr, list, negated } => {
            let e = lower_expr(expr)?;
            let mut eqs = Vec::new();
            for item in list {
                eqs.push(CoreExpr::new(ExprKind::Comparison {
                    op: ComparisonOp::Eq,
                    left: Box::new(e.clone()),
                    right: Box::new(lower_expr(item)?),
                }));
            }
            let combined = eqs
                .into_iter()
                .reduce(|a, b| CoreExpr::new(ExprKind::Or(Box::new(a), Box::new(b))))
                .ok_or_else(|| EngineError::internal("IN list with no members"))?;
            if *negated {
                CoreExpr::new(ExprKind::Not(Box::new(combined)))
            } else {
                combined
            }
        }
        ast::Expr::InSubquery {
            expr,
            subquery,
            negated,
        } => {
            let e = lower_expr(expr)?;
            let plan = lower_query(subquery)?;
            let comparison = CoreExpr::new(ExprKind::Comparison {
                op: ComparisonOp::Eq,
                left: Box::new(e),
                right: Box::new(CoreExpr::new(ExprKind::Subquery(Box::new(plan)))),
            });
            if *negated {
                CoreExpr::new(ExprKind::Not(Box::new(comparison)))
            } else {
                comparison
            }
        }
        ast::Expr::InUnnest {
            expr,
            array_expr,
            negated,
        } => {
            let comparison = CoreExpr::new(ExprKind::Comparison {
                op: ComparisonOp::Contains,
                left: Box::new(lower_expr(array_expr)?),
                right: Box::new(lower_expr(expr)?),
            });
            if *negated {
                CoreExpr::new(ExprKind::Not(Box::new(comparison)))
            } else {
                comparison
            }
        }
        ast::Expr::Like {
            expr,
            pattern,
            negated,
            case_insensitive,
        } => {
            let op = match (*negated, *case_insensitive) {
                (false, false) => ComparisonOp::Like,
                (true, false) => ComparisonOp::NotLike,
                (false, true) => ComparisonOp::ILike,
                (true, true) => ComparisonOp::NotILike,
            };
            CoreExpr::new(ExprKind::Comparison {
                op,
                left: Box::new(lower_expr(expr)?),
                right: Box::new(lower_expr(pattern)?),
            })
        }
        ast::Expr::SimilarTo { expr, pattern, negated } => {
            let op = if *negated {
                ComparisonOp::NotSimilarTo
            } else {
                ComparisonOp::SimilarTo
            };
            CoreExpr::new(ExprKind::Comparison {
                op,
                left: Box::new(lower_expr(expr)?),
                right: Box::new(lower_expr(pattern)?),
            })
        }
        ast::Expr::Cast { expr, data_type, kind } => {
            let fn_name = match kind {
                ast::CastKind::Cast => data_type.to_ascii_uppercase(),
                ast::CastKind::TryCast => format!("TRY_{}", data_type.to_ascii_uppercase()),
                ast::CastKind::SafeCast => format!("SAFE_{}", data_type.to_ascii_uppercase()),
            };
            CoreExpr::new(ExprKind::Function {
                name: fn_name,
                args: vec![lower_expr(expr)?],
            })
        }
        ast::Expr::Extract { field, expr } => CoreExpr::new(ExprKind::Function {
            name: "DATEPART".to_string(),
            args: vec![
                CoreExpr::literal(ScalarValue::Utf8(field.to_ascii_uppercase())),
                lower_expr(expr)?,
            ],
        }),
        ast::Expr::MapAccess { expr, key } => CoreExpr::new(ExprKind::Function {
            name: "GET".to_string(),
            args: vec![lower_expr(expr)?, lower_expr(key)?],
        }),
        ast::Expr::Function { name, args, distinct } => {
            let lowered_args = args
                .iter()
                .map(|a| match a {
                    ast::FunctionArg::Expr(e) => lower_expr(e),
                    ast::FunctionArg::Wildcard => Ok(CoreExpr::new(ExprKind::Wildcard { qualifier: None })),
                })
                .collect::<Result<Vec<_>>>()?;
            if crate::functions::is_aggregate_name(name) {
                CoreExpr::new(ExprKind::Aggregator {
                    name: name.to_ascii_uppercase(),
                    args: lowered_args,
                    distinct: *distinct,
                })
            } else {
                CoreExpr::new(ExprKind::Function {
                    name: name.to_ascii_uppercase(),
                    args: lowered_args,
                })
            }
        }
        ast::Expr::IsNull(inner) => CoreExpr::new(ExprKind::Unary {
            op: UnaryOp::IsNull,
            operand: Box::new(lower_expr(inner)?),
        }),
        ast::Expr::IsNotNull(inner) => CoreExpr::new(ExprKind::Unary {
            op: UnaryOp::IsNotNull,
            operand: Box::new(lower_expr(inner)?),
        }),
        ast::Expr::IsTrue(inner) => CoreExpr::new(ExprKind::Unary {
            op: UnaryOp::IsTrue,
            operand: Box::new(lower_expr(inner)?),
        }),
        ast::Expr::IsFalse(inner) => CoreExpr::new(ExprKind::Unary {
            op: UnaryOp::IsFalse,
            operand: Box::new(lower_expr(inner)?),
        }),
        ast::Expr::IsNotTrue(inner) => CoreExpr::new(ExprKind::Unary {
            op: UnaryOp::IsNotTrue,
            operand: Box::new(lower_expr(inner)?),
        }),
        ast::Expr::IsNotFalse(inner) => CoreExpr::new(ExprKind::Unary {
            op: UnaryOp::IsNotFalse,
            operand: Box::new(lower_expr(inner)?),
        }),
        ast::Expr::Nested(inner) => CoreExpr::new(ExprKind::Nested(Box::new(lower_expr(inner)?))),
        ast::Expr::Tuple(items) => {
            let mut iter = items.iter();
            let first = lower_expr(iter.next().ok_or_else(|| EngineError::internal("empty tuple"))?)?;
            iter.try_fold(first, |acc, item| {
                Ok(CoreExpr::new(ExprKind::Function {
                    name: "TUPLE".to_string(),
                    args: vec![acc, lower_expr(item)?],
                }))
            })?
        }
        ast::Expr::Wildcard => CoreExpr::new(ExprKind::Wildcard { qualifier: None }),
        ast::Expr::QualifiedWildcard(parts) => CoreExpr::new(ExprKind::Wildcard {
            qualifier: Some(parts.join(".")),
        }),
        ast::Expr::SessionVariable { name, .. } => CoreExpr::new(ExprKind::Identifier {
            source: Some("$session".to_string()),
            source_column: name.clone(),
        }),
        ast::Expr::Subquery(query) => {
            let plan = lower_query(query)?;
            CoreExpr::new(ExprKind::Subquery(Box::new(plan)))
        }
    })
}

fn lower_binary_op(op: ast::BinaryOperator) -> BinaryOp {
    match op {
        ast::BinaryOperator::Plus => BinaryOp::Add,
        ast::BinaryOperator::Minus => BinaryOp::Subtract,
        ast::BinaryOperator::Multiply => BinaryOp::Multiply,
        ast::BinaryOperator::Divide => BinaryOp::Divide,
        ast::BinaryOperator::Modulo => BinaryOp::Modulo,
        ast::BinaryOperator::StringConcat => BinaryOp::Concat,
    }
}

fn lower_comparison_op(op: ast::ComparisonOperator) -> ComparisonOp {
    match op {
        ast::ComparisonOperator::Eq => ComparisonOp::Eq,
        ast::ComparisonOperator::NotEq => ComparisonOp::NotEq,
        ast::ComparisonOperator::Lt => ComparisonOp::Lt,
        ast::ComparisonOperator::LtEq => ComparisonOp::LtEq,
        ast::ComparisonOperator::Gt => ComparisonOp::Gt,
        ast::ComparisonOperator::GtEq => ComparisonOp::GtEq,
    }
}

fn lower_literal(lit: &ast::Literal) -> ScalarValue {
    match lit {
        ast::Literal::Number(n) => {
            if let Ok(i) = n.parse::<i64>() {
                ScalarValue::Int64(i)
            } else if let Ok(f) = n.parse::<f64>() {
                ScalarValue::Float64(f)
            } else {
                ScalarValue::Null
            }
        }
        ast::Literal::SingleQuotedString(s) => ScalarValue::Utf8(s.clone()),
        ast::Literal::Boolean(b) => ScalarValue::Boolean(*b),
        ast::Literal::Null => ScalarValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_sql(sql: &str) -> LogicalPlan {
        let stmts = ast::parse_statements(sql).unwrap();
        lower_statement(&stmts[0]).unwrap()
    }

    #[test]
    fn select_star_lowers_to_scan_project_exit() {
        let plan = lower_sql("SELECT * FROM satellites");
        assert_eq!(plan.step.name(), "Exit");
        assert_eq!(plan.only_child().step.name(), "Project");
        assert_eq!(
            plan.only_child().only_child().step.name(),
            "Scan"
        );
    }

    #[test]
    fn group_by_inserts_aggregate_node_between_filter_and_project() {
        let plan = lower_sql("SELECT planetId, COUNT(*) FROM satellites GROUP BY planetId");
        let project = plan.only_child();
        assert_eq!(project.step.name(), "Project");
        assert_eq!(project.only_child().step.name(), "AggregateAndGroup");
    }

    #[test]
    fn having_adds_a_second_filter_after_aggregate() {
        let plan = lower_sql(
            "SELECT planetId, COUNT(*) FROM satellites GROUP BY planetId HAVING COUNT(*) > 1",
        );
        let project = plan.only_child();
        let having_filter = project.only_child();
        assert_eq!(having_filter.step.name(), "Filter");
        assert_eq!(having_filter.only_child().step.name(), "AggregateAndGroup");
    }

    #[test]
    fn temporal_between_rejects_swapped_range() {
        let stmts =
            ast::parse_statements("SELECT * FROM logs FOR DATES BETWEEN '2024-02-01' AND '2024-01-01'");
        if let Ok(stmts) = stmts {
            let err = lower_statement(&stmts[0]).unwrap_err();
            assert_eq!(err.kind(), flint_error::ErrorKind::InvalidTemporalRangeFilter);
        }
    }

    #[test]
    fn limit_offset_order_is_independent_of_clause_order() {
        let plan = lower_sql("SELECT * FROM satellites LIMIT 10 OFFSET 5");
        assert_eq!(plan.only_child().step.name(), "Limit");
        assert_eq!(
            plan.only_child().only_child().step.name(),
            "Offset"
        );
    }
}
