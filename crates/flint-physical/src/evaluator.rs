//! The vectorized expression evaluator (§4.5).
//!
//! A tree walker that evaluates a bound [`Expr`] over a whole [`Morsel`] at
//! once rather than row by row. Results are memoized on `schema_column` for
//! the duration of a single morsel pass (§4.5), since the binder mints a
//! fresh identity for every non-identifier node (`bind_as_derived` in
//! `flint_core::binder`) and the same subexpression can legitimately be
//! referenced more than once (e.g. a `GROUP BY` key that's also projected).

use std::collections::HashMap;
use std::sync::Arc;

use flint_core::expr::{BinaryOp, ComparisonOp, Expr, ExprKind, UnaryOp};
use flint_core::schema::ColumnId;
use flint_connector::ConnectorRegistry;
use flint_error::{EngineError, ErrorKind, Result};
use flint_types::array::PrimitiveArray;
use flint_types::{Array, DataType, Morsel, ScalarValue};

use crate::plan::build_physical_plan;

/// Per-morsel memoization table, keyed by `Expr::schema_column`.
pub type EvalCache = HashMap<ColumnId, Array>;

/// Evaluate `expr` over `morsel`, whose columns are ordered per `schema`
/// (the owning operator's `LogicalPlan::output`). `registry` is only
/// consulted for the rare `IN (SELECT ...)` case, where the inner plan has
/// to be executed to materialize its membership set.
pub fn evaluate(
    expr: &Expr,
    morsel: &Morsel,
    schema: &[ColumnId],
    registry: &Arc<ConnectorRegistry>,
    cache: &mut EvalCache,
) -> Result<Array> {
    if let Some(id) = expr.schema_column {
        if let Some(hit) = cache.get(&id) {
            return Ok(hit.clone());
        }
    }
    let result = evaluate_uncached(expr, morsel, schema, registry, cache)?;
    if let Some(id) = expr.schema_column {
        cache.insert(id, result.clone());
    }
    Ok(result)
}

fn evaluate_uncached(
    expr: &Expr,
    morsel: &Morsel,
    schema: &[ColumnId],
    registry: &Arc<ConnectorRegistry>,
    cache: &mut EvalCache,
) -> Result<Array> {
    match &expr.kind {
        ExprKind::Identifier { .. } => {
            let id = expr.schema_column.ok_or_else(|| {
                EngineError::internal("identifier evaluated before binding")
            })?;
            let pos = schema.iter().position(|c| *c == id).ok_or_else(|| {
                EngineError::new(
                    ErrorKind::ColumnNotFound,
                    format!("column {id} not present in this operator's input schema"),
                )
            })?;
            let col = morsel
                .column(pos)
                .ok_or_else(|| EngineError::internal("schema/morsel column count mismatch"))?;
            Ok((**col).clone())
        }
        ExprKind::Literal(value) => Ok(Array::broadcast(value, morsel.num_rows())),
        ExprKind::Nested(inner) => evaluate(inner, morsel, schema, registry, cache),
        ExprKind::Not(inner) => {
            let operand = evaluate(inner, morsel, schema, registry, cache)?;
            Ok(bool_unary(&operand, |v| v.map(|b| !b)))
        }
        ExprKind::Unary { op, operand } => {
            let array = evaluate(operand, morsel, schema, registry, cache)?;
            eval_unary(*op, &array)
        }
        ExprKind::And(l, r) => {
            let left = evaluate(l, morsel, schema, registry, cache)?;
            let right = evaluate(r, morsel, schema, registry, cache)?;
            bool_binary(&left, &right, |a, b| match (a, b) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })
        }
        ExprKind::Or(l, r) => {
            let left = evaluate(l, morsel, schema, registry, cache)?;
            let right = evaluate(r, morsel, schema, registry, cache)?;
            bool_binary(&left, &right, |a, b| match (a, b) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            })
        }
        ExprKind::Xor(l, r) => {
            let left = evaluate(l, morsel, schema, registry, cache)?;
            let right = evaluate(r, morsel, schema, registry, cache)?;
            bool_binary(&left, &right, |a, b| match (a, b) {
                (Some(a), Some(b)) => Some(a ^ b),
                _ => None,
            })
        }
        ExprKind::Comparison { op, left, right } => {
            // `IN (SELECT ...)` lowers to `Comparison{Contains, ..}` with a
            // SUBQUERY right operand (§4.1); that can't be evaluated as an
            // ordinary array (there's no list-array type in this engine's
            // vocabulary), so membership is tested directly here.
            if let ExprKind::Subquery(plan) = &right.kind {
                let values = subquery_values(plan, registry)?;
                let left_arr = evaluate(left, morsel, schema, registry, cache)?;
                return Ok(membership_mask(&left_arr, &values, *op));
            }
            let left_arr = evaluate(left, morsel, schema, registry, cache)?;
            let right_arr = evaluate(right, morsel, schema, registry, cache)?;
            eval_comparison(*op, &left_arr, &right_arr)
        }
        ExprKind::Binary { op, left, right } => {
            let left_arr = evaluate(left, morsel, schema, registry, cache)?;
            let right_arr = evaluate(right, morsel, schema, registry, cache)?;
            eval_binary(*op, &left_arr, &right_arr)
        }
        ExprKind::Function { name, args } => {
            let mut arg_arrays = Vec::with_capacity(args.len());
            for arg in args {
                arg_arrays.push(evaluate(arg, morsel, schema, registry, cache)?);
            }
            eval_scalar_function(name, &arg_arrays, morsel.num_rows())
        }
        ExprKind::Aggregator { .. } => Err(EngineError::new(
            ErrorKind::InvalidInternalState,
            "aggregator expressions are evaluated by the Aggregate operator, not the scalar evaluator",
        )),
        ExprKind::Wildcard { .. } => Err(EngineError::new(
            ErrorKind::UnsupportedSyntax,
            "wildcard cannot be evaluated as a value",
        )),
        ExprKind::Subquery(plan) => {
            // A bare scalar subquery (not wrapped in a membership
            // comparison): take its first row, first column.
            let values = subquery_values(plan, registry)?;
            let scalar = values.into_iter().next().unwrap_or(ScalarValue::Null);
            Ok(Array::broadcast(&scalar, morsel.num_rows()))
        }
    }
}

fn subquery_values(
    plan: &flint_core::logical::LogicalPlan,
    registry: &Arc<ConnectorRegistry>,
) -> Result<Vec<ScalarValue>> {
    let stream = build_physical_plan(plan, registry)?;
    let mut values = Vec::new();
    for morsel in stream {
        let morsel = morsel?;
        if let Some(col) = morsel.column(0) {
            for i in 0..morsel.num_rows() {
                values.push(col.scalar(i));
            }
        }
    }
    Ok(values)
}

fn membership_mask(haystack: &Array, values: &[ScalarValue], op: ComparisonOp) -> Array {
    let negate = matches!(op, ComparisonOp::NotContains);
    let mut mask = Vec::with_capacity(haystack.len());
    for i in 0..haystack.len() {
        let v = haystack.scalar(i);
        let found = !v.is_null() && values.iter().any(|candidate| candidate == &v);
        mask.push(Some(found != negate));
    }
    Array::Boolean(PrimitiveArray::from_options(mask, false))
}

fn bool_unary(array: &Array, f: impl Fn(Option<bool>) -> Option<bool>) -> Array {
    let mut out = Vec::with_capacity(array.len());
    for i in 0..array.len() {
        let operand = if array.is_valid(i) {
            array.scalar(i).as_bool()
        } else {
            None
        };
        out.push(f(operand));
    }
    Array::Boolean(PrimitiveArray::from_options(out, false))
}

fn bool_binary(
    left: &Array,
    right: &Array,
    f: impl Fn(Option<bool>, Option<bool>) -> Option<bool>,
) -> Result<Array> {
    let len = left.len().max(right.len());
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let a = if left.is_valid(i) { left.scalar(i).as_bool() } else { None };
        let b = if right.is_valid(i) { right.scalar(i).as_bool() } else { None };
        out.push(f(a, b));
    }
    Ok(Array::Boolean(PrimitiveArray::from_options(out, false)))
}

fn eval_unary(op: UnaryOp, array: &Array) -> Result<Array> {
    match op {
        UnaryOp::IsNull => {
            let mask: Vec<Option<bool>> = (0..array.len()).map(|i| Some(!array.is_valid(i))).collect();
            Ok(Array::Boolean(PrimitiveArray::from_options(mask, false)))
        }
        UnaryOp::IsNotNull => {
            let mask: Vec<Option<bool>> = (0..array.len()).map(|i| Some(array.is_valid(i))).collect();
            Ok(Array::Boolean(PrimitiveArray::from_options(mask, false)))
        }
        UnaryOp::IsTrue => Ok(bool_unary(array, |v| Some(v == Some(true)))),
        UnaryOp::IsFalse => Ok(bool_unary(array, |v| Some(v == Some(false)))),
        UnaryOp::IsNotTrue => Ok(bool_unary(array, |v| Some(v != Some(true)))),
        UnaryOp::IsNotFalse => Ok(bool_unary(array, |v| Some(v != Some(false)))),
        UnaryOp::Negate => {
            let mut out = Vec::with_capacity(array.len());
            for i in 0..array.len() {
                if !array.is_valid(i) {
                    out.push(None);
                    continue;
                }
                out.push(array.scalar(i).as_f64().map(|v| -v));
            }
            negated_to_array(array, out)
        }
    }
}

fn negated_to_array(source: &Array, negated: Vec<Option<f64>>) -> Result<Array> {
    match source.datatype() {
        DataType::Int64 => Ok(Array::Int64(PrimitiveArray::from_options(
            negated.into_iter().map(|v| v.map(|f| f as i64)),
            0,
        ))),
        _ => Ok(Array::Float64(PrimitiveArray::from_options(negated, 0.0))),
    }
}

/// Cross-type numeric coercion onto a common float domain, per §4.5.
fn eval_binary(op: BinaryOp, left: &Array, right: &Array) -> Result<Array> {
    if op == BinaryOp::Concat {
        let len = left.len().max(right.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            if !left.is_valid(i) || !right.is_valid(i) {
                out.push(None);
                continue;
            }
            let a = display_value(&left.scalar(i));
            let b = display_value(&right.scalar(i));
            out.push(Some(format!("{a}{b}")));
        }
        return Ok(Array::Utf8(PrimitiveArray::from_options(out, String::new())));
    }

    let both_int = matches!(left.datatype(), DataType::Int64) && matches!(right.datatype(), DataType::Int64);
    let len = left.len().max(right.len());

    if both_int {
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            if !left.is_valid(i) || !right.is_valid(i) {
                out.push(None);
                continue;
            }
            let (Some(a), Some(b)) = (left.scalar(i).as_f64(), right.scalar(i).as_f64()) else {
                out.push(None);
                continue;
            };
            let (a, b) = (a as i64, b as i64);
            out.push(int_arith(op, a, b));
        }
        return Ok(Array::Int64(PrimitiveArray::from_options(out, 0)));
    }

    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if !left.is_valid(i) || !right.is_valid(i) {
            out.push(None);
            continue;
        }
        let (Some(a), Some(b)) = (left.scalar(i).as_f64(), right.scalar(i).as_f64()) else {
            out.push(None);
            continue;
        };
        out.push(float_arith(op, a, b));
    }
    Ok(Array::Float64(PrimitiveArray::from_options(out, 0.0)))
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => (b != 0).then(|| a / b),
        BinaryOp::Modulo => (b != 0).then(|| a % b),
        BinaryOp::Concat => unreachable!("handled above"),
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Option<f64> {
    match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Subtract => Some(a - b),
        BinaryOp::Multiply => Some(a * b),
        BinaryOp::Divide => (b != 0.0).then(|| a / b),
        BinaryOp::Modulo => (b != 0.0).then(|| a % b),
        BinaryOp::Concat => unreachable!("handled above"),
    }
}

fn display_value(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Utf8(s) => s.clone(),
        other => other.to_string(),
    }
}

fn eval_comparison(op: ComparisonOp, left: &Array, right: &Array) -> Result<Array> {
    let len = left.len().max(right.len());
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if !left.is_valid(i) || !right.is_valid(i) {
            out.push(None);
            continue;
        }
        let a = left.scalar(i);
        let b = right.scalar(i);
        out.push(compare_scalars(op, &a, &b));
    }
    Ok(Array::Boolean(PrimitiveArray::from_options(out, false)))
}

fn compare_scalars(op: ComparisonOp, a: &ScalarValue, b: &ScalarValue) -> Option<bool> {
    match op {
        ComparisonOp::Eq => a.partial_cmp(b).map(|o| o.is_eq()),
        ComparisonOp::NotEq => a.partial_cmp(b).map(|o| !o.is_eq()),
        ComparisonOp::Lt => a.partial_cmp(b).map(|o| o.is_lt()),
        ComparisonOp::LtEq => a.partial_cmp(b).map(|o| o.is_le()),
        ComparisonOp::Gt => a.partial_cmp(b).map(|o| o.is_gt()),
        ComparisonOp::GtEq => a.partial_cmp(b).map(|o| o.is_ge()),
        ComparisonOp::Like => like_match(a, b, false, false),
        ComparisonOp::NotLike => like_match(a, b, false, true),
        ComparisonOp::ILike => like_match(a, b, true, false),
        ComparisonOp::NotILike => like_match(a, b, true, true),
        ComparisonOp::SimilarTo => like_match(a, b, false, false),
        ComparisonOp::NotSimilarTo => like_match(a, b, false, true),
        ComparisonOp::Contains => string_contains(a, b, false),
        ComparisonOp::NotContains => string_contains(a, b, true),
    }
}

fn string_contains(a: &ScalarValue, b: &ScalarValue, negate: bool) -> Option<bool> {
    let (haystack, needle) = (a.as_str()?, b.as_str()?);
    Some(haystack.contains(needle) != negate)
}

/// `%`/`_` glob matching (SQL `LIKE`), case-folded for `ILIKE`.
fn like_match(value: &ScalarValue, pattern: &ScalarValue, case_insensitive: bool, negate: bool) -> Option<bool> {
    let value = value.as_str()?;
    let pattern = pattern.as_str()?;
    let (value, pattern) = if case_insensitive {
        (value.to_ascii_lowercase(), pattern.to_ascii_lowercase())
    } else {
        (value.to_string(), pattern.to_string())
    };
    Some(sql_like(&value, &pattern) != negate)
}

fn sql_like(value: &str, pattern: &str) -> bool {
    fn matches(v: &[u8], p: &[u8]) -> bool {
        match p.first() {
            None => v.is_empty(),
            Some(b'%') => matches(v, &p[1..]) || (!v.is_empty() && matches(&v[1..], p)),
            Some(b'_') => !v.is_empty() && matches(&v[1..], &p[1..]),
            Some(c) => v.first() == Some(c) && matches(&v[1..], &p[1..]),
        }
    }
    matches(value.as_bytes(), pattern.as_bytes())
}

fn eval_scalar_function(name: &str, args: &[Array], num_rows: usize) -> Result<Array> {
    let canonical = name.to_ascii_uppercase();
    match canonical.as_str() {
        "UPPER" => map_utf8(&args[0], |s| s.to_uppercase()),
        "LOWER" => map_utf8(&args[0], |s| s.to_lowercase()),
        "TRIM" => map_utf8(&args[0], |s| s.trim().to_string()),
        "LENGTH" => {
            let mut out = Vec::with_capacity(args[0].len());
            for i in 0..args[0].len() {
                if !args[0].is_valid(i) {
                    out.push(None);
                    continue;
                }
                out.push(args[0].scalar(i).as_str().map(|s| s.chars().count() as i64));
            }
            Ok(Array::Int64(PrimitiveArray::from_options(out, 0)))
        }
        "ABS" => map_f64(&args[0], |v| v.abs()),
        "ROUND" => {
            let places = args.get(1).and_then(|a| a.scalar(0).as_f64()).unwrap_or(0.0) as i32;
            let factor = 10f64.powi(places);
            map_f64(&args[0], move |v| (v * factor).round() / factor)
        }
        "CONCAT" => {
            let mut out = vec![String::new(); num_rows];
            for arg in args {
                for (i, slot) in out.iter_mut().enumerate() {
                    if arg.is_valid(i) {
                        slot.push_str(&display_value(&arg.scalar(i)));
                    }
                }
            }
            Ok(Array::Utf8(PrimitiveArray::from_values(out)))
        }
        "COALESCE" => {
            let mut out = Vec::with_capacity(num_rows);
            for i in 0..num_rows {
                let mut chosen = ScalarValue::Null;
                for arg in args {
                    if arg.is_valid(i) {
                        chosen = arg.scalar(i);
                        break;
                    }
                }
                out.push(chosen);
            }
            Ok(scalars_to_array(out))
        }
        "NOW" => Ok(Array::Timestamp(PrimitiveArray::from_values(vec![0; num_rows]))),
        "VARCHAR" | "TRY_VARCHAR" | "SAFE_VARCHAR" => cast_all(&args[0], DataType::Utf8),
        "INTEGER" | "TRY_INTEGER" | "SAFE_INTEGER" => cast_all(&args[0], DataType::Int64),
        "DOUBLE" | "TRY_DOUBLE" | "SAFE_DOUBLE" => cast_all(&args[0], DataType::Float64),
        "BOOLEAN" | "TRY_BOOLEAN" | "SAFE_BOOLEAN" => cast_all(&args[0], DataType::Boolean),
        other => Err(EngineError::new(
            ErrorKind::IncompleteImplementation,
            format!("scalar function '{other}' has no physical kernel"),
        )),
    }
}

fn map_utf8(array: &Array, f: impl Fn(&str) -> String) -> Result<Array> {
    let mut out = Vec::with_capacity(array.len());
    for i in 0..array.len() {
        if !array.is_valid(i) {
            out.push(None);
            continue;
        }
        out.push(array.scalar(i).as_str().map(&f));
    }
    Ok(Array::Utf8(PrimitiveArray::from_options(out, String::new())))
}

fn map_f64(array: &Array, f: impl Fn(f64) -> f64) -> Result<Array> {
    let mut out = Vec::with_capacity(array.len());
    for i in 0..array.len() {
        if !array.is_valid(i) {
            out.push(None);
            continue;
        }
        out.push(array.scalar(i).as_f64().map(&f));
    }
    Ok(Array::Float64(PrimitiveArray::from_options(out, 0.0)))
}

fn cast_all(array: &Array, target: DataType) -> Result<Array> {
    let scalars: Vec<ScalarValue> = (0..array.len())
        .map(|i| cast_scalar(&array.scalar(i), &target))
        .collect();
    Ok(scalars_to_array(scalars))
}

fn cast_scalar(value: &ScalarValue, target: &DataType) -> ScalarValue {
    if value.is_null() {
        return ScalarValue::Null;
    }
    match target {
        DataType::Utf8 => ScalarValue::Utf8(display_value(value)),
        DataType::Int64 => value.as_f64().map(|v| ScalarValue::Int64(v as i64)).unwrap_or(ScalarValue::Null),
        DataType::Float64 => value.as_f64().map(ScalarValue::Float64).unwrap_or(ScalarValue::Null),
        DataType::Boolean => match value {
            ScalarValue::Boolean(b) => ScalarValue::Boolean(*b),
            ScalarValue::Utf8(s) => ScalarValue::Boolean(s.eq_ignore_ascii_case("true")),
            _ => ScalarValue::Null,
        },
        _ => ScalarValue::Null,
    }
}

/// Build the narrowest `Array` variant that fits every non-null scalar in
/// `scalars`, used wherever a kernel produces a `Vec<ScalarValue>` (one per
/// output row) that needs to become a column again.
pub(crate) fn scalars_to_array(scalars: Vec<ScalarValue>) -> Array {
    let dtype = scalars.iter().find(|s| !s.is_null()).map(|s| s.datatype()).unwrap_or(DataType::Null);
    match dtype {
        DataType::Int64 => Array::Int64(PrimitiveArray::from_options(scalars.iter().map(|s| match s {
            ScalarValue::Int64(v) => Some(*v),
            _ => None,
        }), 0)),
        DataType::Float64 => Array::Float64(PrimitiveArray::from_options(scalars.iter().map(|s| match s {
            ScalarValue::Float64(v) => Some(*v),
            _ => None,
        }), 0.0)),
        DataType::Boolean => Array::Boolean(PrimitiveArray::from_options(scalars.iter().map(|s| match s {
            ScalarValue::Boolean(v) => Some(*v),
            _ => None,
        }), false)),
        DataType::Utf8 => Array::Utf8(PrimitiveArray::from_options(scalars.iter().map(|s| match s {
            ScalarValue::Utf8(v) => Some(v.clone()),
            _ => None,
        }), String::new())),
        _ => Array::Null(scalars.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flint_core::schema::ColumnId;
    use flint_connector::{ConnectorRegistry, MemoryConnector};
    use std::sync::Arc;

    fn registry() -> Arc<ConnectorRegistry> {
        Arc::new(ConnectorRegistry::new(Arc::new(MemoryConnector::new())))
    }

    fn id_expr(id: ColumnId) -> Expr {
        let mut e = Expr::identifier(None, "x");
        e.schema_column = Some(id);
        e
    }

    #[test]
    fn identifier_indexes_by_schema_column() {
        let id = ColumnId::fresh();
        let morsel = Morsel::try_new(vec![Array::Int64(PrimitiveArray::from_values(vec![1, 2, 3]))]).unwrap();
        let schema = vec![id];
        let mut cache = EvalCache::new();
        let reg = registry();
        let result = evaluate(&id_expr(id), &morsel, &schema, &reg, &mut cache).unwrap();
        assert_eq!(result.scalar(1), ScalarValue::Int64(2));
    }

    #[test]
    fn literal_broadcasts_to_morsel_length() {
        let morsel = Morsel::try_new(vec![Array::Int64(PrimitiveArray::from_values(vec![1, 2, 3]))]).unwrap();
        let expr = Expr::literal(ScalarValue::Utf8("x".into()));
        let mut cache = EvalCache::new();
        let reg = registry();
        let result = evaluate(&expr, &morsel, &[], &reg, &mut cache).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.scalar(0), ScalarValue::Utf8("x".into()));
    }

    #[test]
    fn sql_like_handles_percent_and_underscore() {
        assert!(sql_like("Calypso", "Cal%"));
        assert!(sql_like("Moon", "M_on"));
        assert!(!sql_like("Moon", "M_n"));
    }

    #[test]
    fn comparison_yields_boolean_mask() {
        let left = Array::Int64(PrimitiveArray::from_values(vec![1, 2, 3]));
        let right = Array::Int64(PrimitiveArray::from_values(vec![2, 2, 2]));
        let mask = eval_comparison(ComparisonOp::Eq, &left, &right).unwrap();
        assert_eq!(mask.scalar(0), ScalarValue::Boolean(false));
        assert_eq!(mask.scalar(1), ScalarValue::Boolean(true));
    }
}
