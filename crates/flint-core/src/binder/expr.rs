//! Expression binding: resolving identifiers and minting `$derived` columns
//! for every non-identifier expression node (§4.2).

use flint_error::{suggest_closest, EngineError, ErrorKind, Result};
use flint_types::DataType;

use crate::catalog::Catalog;
use crate::expr::{format_expression, Expr, ExprKind};
use crate::functions::{self, AggregateKind, FunctionKind};
use crate::schema::Column;

use super::context::BindContext;
use super::plan::bind_plan;

/// Resolve the result type a scalar function produces, where it's knowable
/// without evaluating the arguments. `Unknown` just means "not yet typed";
/// per §4.2 an unknown type on one side of a comparison is ignored rather
/// than treated as a mismatch.
fn scalar_result_type(name: &str) -> DataType {
    match name {
        "DATEPART" => DataType::Int64,
        "VARCHAR" | "TRY_VARCHAR" | "SAFE_VARCHAR" => DataType::Utf8,
        "INTEGER" | "TRY_INTEGER" | "SAFE_INTEGER" => DataType::Int64,
        "DOUBLE" | "TRY_DOUBLE" | "SAFE_DOUBLE" => DataType::Float64,
        "BOOLEAN" | "TRY_BOOLEAN" | "SAFE_BOOLEAN" => DataType::Boolean,
        "DATE" | "TRY_DATE" | "SAFE_DATE" => DataType::Date32,
        "TIMESTAMP" | "TRY_TIMESTAMP" | "SAFE_TIMESTAMP" => DataType::Timestamp,
        "LENGTH" => DataType::Int64,
        "UPPER" | "LOWER" | "TRIM" | "CONCAT" => DataType::Utf8,
        "ABS" | "ROUND" => DataType::Float64,
        _ => DataType::Unknown,
    }
}

/// Mint a fresh `$derived` column for an expression that isn't itself an
/// `IDENTIFIER`, and stamp the expression with its identity (§4.2: "New
/// schema columns").
fn bind_as_derived(expr: &mut Expr, ctx: &mut BindContext, data_type: DataType) {
    let name = format_expression(expr);
    let column = Column::new_flat(name.clone(), data_type, "$derived");
    let id = column.id;
    ctx.derived_mut().push(column);
    expr.schema_column = Some(id);
    expr.query_column = Some(expr.alias.clone().unwrap_or(name));
}

pub fn bind_expr(expr: &mut Expr, ctx: &mut BindContext, catalog: &dyn Catalog) -> Result<()> {
    // `@name`/`@@name` session and global variables lower to `source:
    // Some("$session")`; `?` placeholders lower to `source: None,
    // source_column: "$<n>"`. Neither names a relation column, so both
    // resolve through the catalog's variable store instead of
    // `locate_identifier`, and fold to a literal in place so the physical
    // evaluator's constant-broadcast path (not the schema/morsel lookup
    // `Identifier` otherwise needs) picks it up.
    if let ExprKind::Identifier { source, source_column } = &expr.kind {
        let is_variable = source.as_deref() == Some("$session") || (source.is_none() && source_column.starts_with('$'));
        if is_variable {
            let source_column = source_column.clone();
            let value = catalog.session_variable(&source_column).ok_or_else(|| {
                EngineError::new(ErrorKind::VariableNotFound, format!("unknown variable or parameter '{source_column}'"))
                    .with_qualifier(source_column.clone())
            })?;
            expr.kind = ExprKind::Literal(value.clone());
            let column = Column::new_constant(source_column.clone(), value);
            let id = column.id;
            ctx.derived_mut().push(column);
            expr.schema_column = Some(id);
            expr.query_column = Some(expr.alias.clone().unwrap_or(source_column));
            return Ok(());
        }
    }

    match &mut expr.kind {
        ExprKind::Identifier { source, source_column } => {
            let (id, _dtype, name) = ctx.locate_identifier(source.as_deref(), source_column)?;
            expr.schema_column = Some(id);
            expr.query_column = Some(expr.alias.clone().unwrap_or(name));
            Ok(())
        }
        ExprKind::Literal(value) => {
            let name = format_expression(expr);
            let column = Column::new_constant(name.clone(), value.clone());
            let id = column.id;
            ctx.derived_mut().push(column);
            expr.schema_column = Some(id);
            expr.query_column = Some(expr.alias.clone().unwrap_or(name));
            Ok(())
        }
        ExprKind::Wildcard { .. } => Err(EngineError::new(
            ErrorKind::UnsupportedSyntax,
            "wildcard cannot be used in this position",
        )),
        ExprKind::Subquery(plan) => {
            bind_plan(plan, catalog)?;
            bind_as_derived(expr, ctx, DataType::Unknown);
            Ok(())
        }
        ExprKind::Nested(inner) => {
            bind_expr(inner, ctx, catalog)?;
            expr.schema_column = inner.schema_column;
            expr.query_column = expr.alias.clone().or_else(|| inner.query_column.clone());
            Ok(())
        }
        ExprKind::Not(inner) => {
            bind_expr(inner, ctx, catalog)?;
            bind_as_derived(expr, ctx, DataType::Boolean);
            Ok(())
        }
        ExprKind::Unary { operand, .. } => {
            bind_expr(operand, ctx, catalog)?;
            bind_as_derived(expr, ctx, DataType::Boolean);
            Ok(())
        }
        ExprKind::And(l, r) | ExprKind::Or(l, r) | ExprKind::Xor(l, r) => {
            bind_expr(l, ctx, catalog)?;
            bind_expr(r, ctx, catalog)?;
            bind_as_derived(expr, ctx, DataType::Boolean);
            Ok(())
        }
        ExprKind::Comparison { left, right, .. } => {
            bind_expr(left, ctx, catalog)?;
            bind_expr(right, ctx, catalog)?;
            check_comparable(left, right)?;
            bind_as_derived(expr, ctx, DataType::Boolean);
            Ok(())
        }
        ExprKind::Binary { left, right, .. } => {
            bind_expr(left, ctx, catalog)?;
            bind_expr(right, ctx, catalog)?;
            bind_as_derived(expr, ctx, DataType::Unknown);
            Ok(())
        }
        ExprKind::Function { name, args } => {
            bind_call_args(args, ctx, catalog)?;
            let sig = functions::lookup(name).ok_or_else(|| function_not_found(name))?;
            if sig.is_aggregate() {
                return Err(EngineError::new(
                    ErrorKind::UnsupportedSyntax,
                    format!("'{name}' is an aggregate function and needs GROUP BY context"),
                ));
            }
            if !sig.accepts_arity(args.len()) {
                return Err(EngineError::new(
                    ErrorKind::InvalidFunctionParameter,
                    format!("'{name}' does not accept {} argument(s)", args.len()),
                ));
            }
            let dtype = scalar_result_type(sig.canonical_name);
            bind_as_derived(expr, ctx, dtype);
            Ok(())
        }
        ExprKind::Aggregator { name, args, .. } => {
            bind_call_args(args, ctx, catalog)?;
            let sig = functions::lookup(name).ok_or_else(|| function_not_found(name))?;
            if !matches!(sig.kind, FunctionKind::Aggregate(_)) {
                return Err(EngineError::new(
                    ErrorKind::UnsupportedSyntax,
                    format!("'{name}' is not an aggregate function"),
                ));
            }
            if !sig.accepts_arity(args.len()) {
                return Err(EngineError::new(
                    ErrorKind::InvalidFunctionParameter,
                    format!("aggregate '{name}' does not accept {} argument(s)", args.len()),
                ));
            }
            let dtype = if let FunctionKind::Aggregate(kind) = sig.kind {
                aggregate_result_type(kind)
            } else {
                DataType::Unknown
            };
            bind_as_derived(expr, ctx, dtype);
            Ok(())
        }
    }
}

/// The result type of each aggregate kernel (§4.4), where it's fixed
/// regardless of the input column's type.
fn aggregate_result_type(kind: AggregateKind) -> DataType {
    match kind {
        AggregateKind::Count | AggregateKind::CountDistinct => DataType::Int64,
        AggregateKind::All | AggregateKind::Any => DataType::Boolean,
        AggregateKind::Mean
        | AggregateKind::Stddev
        | AggregateKind::Variance
        | AggregateKind::ApproxMedian => DataType::Float64,
        AggregateKind::List | AggregateKind::Distinct | AggregateKind::Quantiles => {
            DataType::List(Box::new(DataType::Unknown))
        }
        AggregateKind::MinMax => DataType::Unknown,
        AggregateKind::Max | AggregateKind::Min | AggregateKind::Sum | AggregateKind::Product => {
            DataType::Unknown
        }
    }
}

fn bind_call_args(args: &mut [Expr], ctx: &mut BindContext, catalog: &dyn Catalog) -> Result<()> {
    for arg in args.iter_mut() {
        if matches!(arg.kind, ExprKind::Wildcard { .. }) {
            // COUNT(*) — leave unbound; the physical COUNT(*) kernel special-cases it (§4.4).
            continue;
        }
        bind_expr(arg, ctx, catalog)?;
    }
    Ok(())
}

fn function_not_found(name: &str) -> EngineError {
    let mut err = EngineError::new(ErrorKind::FunctionNotFound, format!("function '{name}' not found"));
    if let Some(s) = suggest_closest(name, functions::all_names()) {
        err = err.with_suggestion(s);
    }
    err
}

/// §4.2 Join binding: "every comparison's operand types must match (... type
/// 0 denotes unknown and is ignored)". Reused for general comparisons too,
/// since the rule is stated without being scoped to joins.
pub fn check_comparable(left: &Expr, right: &Expr) -> Result<()> {
    let lt = column_kind_type(left);
    let rt = column_kind_type(right);
    match (lt, rt) {
        (Some(a), Some(b)) if !a.is_unknown() && !b.is_unknown() && a != b && !numeric_pair(&a, &b) => {
            Err(EngineError::new(
                ErrorKind::IncompatibleTypes,
                format!("cannot compare {a} with {b}"),
            ))
        }
        _ => Ok(()),
    }
}

fn numeric_pair(a: &DataType, b: &DataType) -> bool {
    a.is_numeric() && b.is_numeric()
}

/// Best-effort: we don't carry a side table from `ColumnId` back to
/// `DataType` through `Expr` itself (only `schema_column` is stored), so the
/// binder checks comparability using what it can see on the literal/typed
/// node directly. Richer cross-referencing happens in `Join` binding, which
/// has the bound schemas in scope.
fn column_kind_type(expr: &Expr) -> Option<DataType> {
    match &expr.kind {
        ExprKind::Literal(v) => Some(v.datatype()),
        _ => None,
    }
}
