//! Node-specific binding (§4.2): the post-order traversal that decorates
//! every [`LogicalPlan`] node and its expressions with catalog metadata.

use std::collections::HashSet;

use flint_error::{suggest_closest, EngineError, ErrorKind, Result};
use flint_types::DataType;

use crate::catalog::Catalog;
use crate::expr::{format_expression, Expr, ExprKind};
use crate::functions;
use crate::logical::{
    AggregateStep, DistinctStep, ExitStep, FilterStep, FunctionDatasetKind, FunctionDatasetStep,
    JoinKind, JoinStep, LogicalPlan, OrderStep, ProjectStep, ScanStep, Step,
};
use crate::schema::{
    shared_schema_name, Column, Disposition, RelationSchema, DERIVED_SCHEMA, PROJECT_SCHEMA,
};

use super::context::BindContext;
use super::expr::{bind_expr, check_comparable};

/// Entry point: bind a whole logical plan, post-order, per §4.2.
pub fn bind_plan(plan: &mut LogicalPlan, catalog: &dyn Catalog) -> Result<BindContext> {
    if matches!(plan.step, Step::Join(_)) {
        return bind_join(plan, catalog);
    }

    let mut ctx = BindContext::new();
    for child in plan.children.iter_mut() {
        let child_ctx = bind_plan(child, catalog)?;
        ctx = ctx.merge(child_ctx)?;
    }
    bind_self(plan, ctx, catalog)
}

fn bind_self(plan: &mut LogicalPlan, mut ctx: BindContext, catalog: &dyn Catalog) -> Result<BindContext> {
    match &mut plan.step {
        Step::Scan(scan) => bind_scan(scan, catalog, &mut ctx)?,
        Step::FunctionDataset(fd) => bind_function_dataset(fd, catalog, &mut ctx)?,
        Step::Subquery(sub) => {
            let alias = sub.alias.clone();
            ctx = collapse_subquery(ctx, &alias)?;
        }
        Step::Filter(filter) => bind_filter(filter, &mut ctx, catalog)?,
        Step::AggregateAndGroup(agg) => ctx = bind_aggregate(agg, ctx, catalog)?,
        Step::Distinct(distinct) => bind_distinct(distinct, &mut ctx, catalog)?,
        Step::Project(project) => ctx = bind_project(project, ctx, catalog)?,
        Step::Order(order) => bind_order(order, &mut ctx, catalog)?,
        Step::Offset(_) | Step::Limit(_) => {}
        Step::Exit(exit) => ctx = bind_exit(exit, ctx, catalog)?,
        Step::Set(set) => bind_expr(&mut set.value, &mut ctx, catalog)?,
        Step::ShowColumns(_) | Step::ShowVariable(_) => {}
        Step::Explain(_) => {}
        Step::Join(_) => unreachable!("handled by bind_join"),
    }

    plan.output = output_columns(&plan.step, &ctx);
    Ok(ctx)
}

/// The ordered column identities a node emits upward, used by `EXPLAIN` and
/// by physical planning without re-deriving it from expressions. Never
/// called for `Join` nodes — `bind_join` sets `plan.output` itself.
fn output_columns(step: &Step, ctx: &BindContext) -> Vec<crate::schema::ColumnId> {
    match step {
        Step::Scan(s) => s.schema.as_ref().map(|s| s.columns.iter().map(|c| c.id).collect()).unwrap_or_default(),
        Step::FunctionDataset(s) => s.schema.as_ref().map(|s| s.columns.iter().map(|c| c.id).collect()).unwrap_or_default(),
        Step::Subquery(s) => ctx.schemas.get(&s.alias).map(|s| s.columns.iter().map(|c| c.id).collect()).unwrap_or_default(),
        Step::AggregateAndGroup(a) => a
            .groups
            .iter()
            .chain(a.aggregates.iter())
            .filter_map(|e| e.schema_column)
            .collect(),
        Step::Project(p) => p.columns.iter().filter_map(|e| e.schema_column).collect(),
        Step::Exit(e) => e.columns.iter().filter_map(|e| e.schema_column).collect(),
        _ => ctx.schemas.values().flat_map(|s| s.columns.iter().map(|c| c.id)).collect(),
    }
}

fn bind_scan(scan: &mut ScanStep, catalog: &dyn Catalog, ctx: &mut BindContext) -> Result<()> {
    let descriptor = catalog.resolve_dataset(&scan.relation).map_err(|e| {
        if e.kind() == ErrorKind::DatasetNotFound {
            let known = catalog.known_relations();
            let suggestion = suggest_closest(&scan.relation, known.iter().map(|s| s.as_str()));
            match suggestion {
                Some(s) => e.with_suggestion(s),
                None => e,
            }
        } else {
            e
        }
    })?;

    let mut schema = descriptor.schema;
    schema.name = scan.alias.clone();
    for col in schema.columns.iter_mut() {
        col.origin = vec![scan.alias.clone()];
    }

    for hint in &scan.hints {
        let upper = hint.to_ascii_uppercase();
        if !functions::KNOWN_HINTS.contains(&upper.as_str()) {
            let suggestion = suggest_closest(&upper, functions::KNOWN_HINTS.iter().copied());
            ctx.warnings.push(match suggestion {
                Some(s) => format!("unknown hint '{hint}'. Did you mean '{s}'?"),
                None => format!("unknown hint '{hint}'"),
            });
        }
    }

    scan.connector = Some(descriptor.connector_name);
    scan.columns = Some(schema.columns.iter().map(|c| c.id).collect());
    scan.schema = Some(schema.clone());

    if ctx.schemas.contains_key(&scan.alias) {
        return Err(EngineError::new(
            ErrorKind::AmbiguousDataset,
            format!("relation alias '{}' used more than once", scan.alias),
        ));
    }
    ctx.schemas.insert(scan.alias.clone(), schema);
    ctx.relations.insert(scan.alias.clone());
    Ok(())
}

fn bind_function_dataset(fd: &mut FunctionDatasetStep, catalog: &dyn Catalog, ctx: &mut BindContext) -> Result<()> {
    for arg in fd.args.iter_mut() {
        bind_expr(arg, ctx, catalog)?;
    }
    let schema = synthesize_function_dataset_schema(fd)?;
    fd.schema = Some(schema.clone());
    ctx.schemas.insert(fd.alias.clone(), schema);
    ctx.relations.insert(fd.alias.clone());
    Ok(())
}

fn synthesize_function_dataset_schema(fd: &FunctionDatasetStep) -> Result<RelationSchema> {
    let mut schema = RelationSchema::new(fd.alias.clone());
    match fd.function {
        FunctionDatasetKind::Values => {
            let names = if fd.columns.is_empty() {
                (1..=fd.args.len()).map(|i| format!("column_{i}")).collect()
            } else {
                fd.columns.clone()
            };
            for name in names {
                schema.push(Column::new_flat(name, DataType::Unknown, fd.alias.clone()));
            }
        }
        FunctionDatasetKind::Unnest => {
            let name = fd.columns.first().cloned().unwrap_or_else(|| "unnest".to_string());
            schema.push(Column::new_flat(name, DataType::Unknown, fd.alias.clone()));
        }
        FunctionDatasetKind::GenerateSeries => {
            schema.push(Column::new_flat(fd.alias.clone(), DataType::Int64, fd.alias.clone()));
        }
        FunctionDatasetKind::Fake => {
            let column_specs = fake_column_specs(fd)?;
            for (name, data_type, disposition) in column_specs {
                let mut col = Column::new_flat(name, data_type, fd.alias.clone());
                col.disposition = disposition;
                schema.push(col);
            }
        }
    }
    Ok(schema)
}

fn fake_column_specs(fd: &FunctionDatasetStep) -> Result<Vec<(String, DataType, Option<Disposition>)>> {
    let spec_arg = fd.args.get(1).ok_or_else(|| {
        EngineError::new(ErrorKind::InvalidFunctionParameter, "FAKE() requires (rows, columns)")
    })?;

    let mut leaves = Vec::new();
    collect_tuple_leaves(spec_arg, &mut leaves);

    if leaves.len() == 1 {
        if let ExprKind::Literal(flint_types::ScalarValue::Int64(n)) = &leaves[0].kind {
            return Ok((1..=*n)
                .map(|i| (format!("column_{i}"), DataType::Utf8, None))
                .collect());
        }
    }

    leaves
        .into_iter()
        .enumerate()
        .map(|(i, leaf)| match &leaf.kind {
            ExprKind::Literal(flint_types::ScalarValue::Utf8(s)) => Ok(match s.to_ascii_uppercase().as_str() {
                "NAME" => (format!("column_{i}"), DataType::Utf8, Some(Disposition::Name)),
                "AGE" => (format!("column_{i}"), DataType::Int64, Some(Disposition::Age)),
                other => (format!("column_{i}"), datatype_from_name(other), None),
            }),
            _ => Err(EngineError::new(
                ErrorKind::InvalidFunctionParameter,
                "FAKE() column spec must be literal type names",
            )),
        })
        .collect()
}

fn collect_tuple_leaves<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    if let ExprKind::Function { name, args } = &expr.kind {
        if name == "TUPLE" {
            for a in args {
                collect_tuple_leaves(a, out);
            }
            return;
        }
    }
    out.push(expr);
}

fn datatype_from_name(name: &str) -> DataType {
    match name {
        "VARCHAR" => DataType::Utf8,
        "INTEGER" => DataType::Int64,
        "DOUBLE" => DataType::Float64,
        "BOOLEAN" => DataType::Boolean,
        "DATE" => DataType::Date32,
        "TIMESTAMP" => DataType::Timestamp,
        _ => DataType::Unknown,
    }
}

fn bind_filter(filter: &mut FilterStep, ctx: &mut BindContext, catalog: &dyn Catalog) -> Result<()> {
    bind_expr(&mut filter.condition, ctx, catalog)?;
    let mut relations = std::collections::BTreeSet::new();
    filter.condition.referenced_relations(&mut relations);
    filter.relations = Some(relations.into_iter().collect());
    filter.simple = Some(is_simple_predicate(&filter.condition));
    Ok(())
}

fn is_simple_predicate(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Comparison { .. })
}

fn bind_distinct(distinct: &mut DistinctStep, ctx: &mut BindContext, catalog: &dyn Catalog) -> Result<()> {
    if let Some(on) = distinct.on.as_mut() {
        for col in on.iter_mut() {
            bind_expr(col, ctx, catalog)?;
        }
    }
    Ok(())
}

fn bind_order(order: &mut OrderStep, ctx: &mut BindContext, catalog: &dyn Catalog) -> Result<()> {
    for (expr, _) in order.order_by.iter_mut() {
        bind_expr(expr, ctx, catalog)?;
    }
    Ok(())
}

fn bind_aggregate(agg: &mut AggregateStep, ctx: BindContext, catalog: &dyn Catalog) -> Result<BindContext> {
    let mut work = ctx;
    for group in agg.groups.iter_mut() {
        bind_expr(group, &mut work, catalog)?;
    }
    for aggregate in agg.aggregates.iter_mut() {
        bind_expr(aggregate, &mut work, catalog)?;
    }
    for ident in agg.all_identifiers.iter_mut() {
        bind_expr(ident, &mut work, catalog)?;
    }

    let mut keep: HashSet<crate::schema::ColumnId> = HashSet::new();
    for e in agg.groups.iter().chain(agg.aggregates.iter()) {
        if let Some(id) = e.schema_column {
            keep.insert(id);
        }
    }
    for e in agg.all_identifiers.iter() {
        if let Some(id) = e.schema_column {
            keep.insert(id);
        }
    }

    let mut out_ctx = BindContext::new();
    for (name, schema) in work.schemas.into_iter() {
        let mut pruned = RelationSchema::new(schema.name.clone());
        for col in schema.columns.into_iter() {
            if keep.contains(&col.id) {
                pruned.push(col);
            }
        }
        if !pruned.columns.is_empty() || name == DERIVED_SCHEMA {
            out_ctx.schemas.insert(name, pruned);
        }
    }
    out_ctx.relations = work.relations;
    out_ctx.warnings = work.warnings;
    Ok(out_ctx)
}

fn bind_project(project: &mut ProjectStep, ctx: BindContext, catalog: &dyn Catalog) -> Result<BindContext> {
    let mut work = ctx;
    project.columns = expand_wildcards(std::mem::take(&mut project.columns), &work)?;

    let mut seen = HashSet::new();
    for col in project.columns.iter_mut() {
        bind_expr(col, &mut work, catalog)?;
        if let Some(id) = col.schema_column {
            if !seen.insert(id) {
                return Err(EngineError::new(
                    ErrorKind::AmbiguousIdentifier,
                    format!(
                        "column '{}' is selected more than once",
                        col.query_column.clone().unwrap_or_default()
                    ),
                ));
            }
        }
    }
    for col in project.order_by_columns.iter_mut() {
        bind_expr(col, &mut work, catalog)?;
    }

    let referenced: HashSet<crate::schema::ColumnId> =
        project.columns.iter().chain(project.order_by_columns.iter())
            .filter_map(|e| e.schema_column)
            .collect();

    let mut out_ctx = BindContext::new();
    for (name, schema) in work.schemas.into_iter() {
        if name == DERIVED_SCHEMA {
            // Renamed to $project below; skip here.
            continue;
        }
        let contributes = schema.columns.iter().any(|c| referenced.contains(&c.id));
        if contributes || schema.is_synthetic() {
            out_ctx.schemas.insert(name, schema);
        }
    }
    let mut derived_as_project = work
        .schemas
        .get(DERIVED_SCHEMA)
        .cloned()
        .unwrap_or_else(|| RelationSchema::new(PROJECT_SCHEMA));
    derived_as_project.name = PROJECT_SCHEMA.to_string();
    out_ctx.schemas.insert(PROJECT_SCHEMA.to_string(), derived_as_project);
    out_ctx.relations = work.relations;
    out_ctx.warnings = work.warnings;
    Ok(out_ctx)
}

fn bind_exit(exit: &mut ExitStep, ctx: BindContext, catalog: &dyn Catalog) -> Result<BindContext> {
    let mut work = ctx;
    exit.columns = expand_wildcards(std::mem::take(&mut exit.columns), &work)?;

    let multiple_schemas_share_names = names_collide_across_schemas(&work);

    let mut seen = HashSet::new();
    for col in exit.columns.iter_mut() {
        rebind_against_project(col, &mut work, catalog)?;
        if let Some(id) = col.schema_column {
            if !seen.insert(id) {
                return Err(EngineError::new(
                    ErrorKind::AmbiguousIdentifier,
                    "duplicate column in SELECT list",
                ));
            }
        }
        if multiple_schemas_share_names {
            if let ExprKind::Identifier { source: Some(s), source_column } = &col.kind {
                col.query_column = Some(col.alias.clone().unwrap_or_else(|| format!("{s}.{source_column}")));
            }
        }
    }

    let mut out = BindContext::new();
    let mut result_schema = RelationSchema::new("$result");
    for col in exit.columns.iter() {
        if let Some(id) = col.schema_column {
            result_schema.push(Column::new_flat(
                col.query_column.clone().unwrap_or_default(),
                DataType::Unknown,
                "$result",
            ));
            result_schema.columns.last_mut().unwrap().id = id;
        }
    }
    out.schemas.insert("$result".to_string(), result_schema);
    out.warnings = work.warnings;
    Ok(out)
}

fn names_collide_across_schemas(ctx: &BindContext) -> bool {
    let mut seen = HashSet::new();
    for schema in ctx.schemas.values() {
        if schema.is_synthetic() {
            continue;
        }
        for name in schema.column_names() {
            if !seen.insert(name.to_ascii_lowercase()) {
                return true;
            }
        }
    }
    false
}

fn rebind_against_project(col: &mut Expr, ctx: &mut BindContext, catalog: &dyn Catalog) -> Result<()> {
    if matches!(col.kind, ExprKind::Identifier { .. }) {
        return bind_expr(col, ctx, catalog);
    }
    let canonical = format_expression(col);
    let existing = ctx
        .schemas
        .get(PROJECT_SCHEMA)
        .and_then(|s| s.find_column(&canonical))
        .map(|c| (c.id, c.name.clone()));
    match existing {
        Some((id, name)) => {
            col.schema_column = Some(id);
            col.query_column = Some(col.alias.clone().unwrap_or(name));
            Ok(())
        }
        None => bind_expr(col, ctx, catalog),
    }
}

/// §4.2 wildcard expansion, shared by `Project` and `Exit` binding.
fn expand_wildcards(columns: Vec<Expr>, ctx: &BindContext) -> Result<Vec<Expr>> {
    let mut out = Vec::with_capacity(columns.len());
    for col in columns {
        match &col.kind {
            ExprKind::Wildcard { qualifier: None } => {
                for (name, schema) in ctx.schemas.iter() {
                    if schema.is_synthetic() {
                        continue;
                    }
                    for c in &schema.columns {
                        out.push(Expr::identifier(Some(name.clone()), c.name.clone()));
                    }
                }
            }
            ExprKind::Wildcard { qualifier: Some(q) } => {
                let mut any = false;
                if let Some(schema) = ctx.schemas.get(q) {
                    any = true;
                    for c in &schema.columns {
                        out.push(Expr::identifier(Some(q.clone()), c.name.clone()));
                    }
                }
                for (name, schema) in ctx.schemas.iter() {
                    if name.starts_with("$shared-") {
                        for c in &schema.columns {
                            if c.origin.iter().any(|o| o == q) {
                                any = true;
                                out.push(Expr::identifier(Some(name.clone()), c.name.clone()));
                            }
                        }
                    }
                }
                if !any {
                    return Err(EngineError::new(
                        ErrorKind::UnexpectedDatasetReference,
                        format!("no relation '{q}' to expand '{q}.*'"),
                    ));
                }
            }
            _ => out.push(col),
        }
    }
    Ok(out)
}

fn collapse_subquery(ctx: BindContext, alias: &str) -> Result<BindContext> {
    let mut result_schema = ctx
        .schemas
        .get("$result")
        .cloned()
        .ok_or_else(|| EngineError::internal("subquery plan produced no result schema"))?;
    result_schema.name = alias.to_string();
    for col in result_schema.columns.iter_mut() {
        col.origin = vec![alias.to_string()];
    }
    let mut out = BindContext::new();
    out.schemas.insert(alias.to_string(), result_schema);
    out.relations.insert(alias.to_string());
    Ok(out)
}

// ---------------------------------------------------------------------
// Join binding (§4.2)
// ---------------------------------------------------------------------

fn bind_join(plan: &mut LogicalPlan, catalog: &dyn Catalog) -> Result<BindContext> {
    let (left_slice, right_slice) = plan.children.split_at_mut(1);
    let left_ctx = bind_plan(&mut left_slice[0], catalog)?;
    let right_ctx = bind_plan(&mut right_slice[0], catalog)?;

    let Step::Join(join) = &mut plan.step else {
        unreachable!()
    };

    join.left_relation_names = left_ctx.relations.iter().cloned().collect();
    join.right_relation_names = right_ctx.relations.iter().cloned().collect();

    let mut ctx = left_ctx.clone().merge(right_ctx.clone())?;

    if matches!(join.kind, JoinKind::Natural) {
        let using = natural_using_columns(&left_ctx, &right_ctx);
        join.using = Some(using);
    }

    if let Some(using) = join.using.clone() {
        bind_using_join(join, &left_ctx, &right_ctx, &using, &mut ctx)?;
    } else if let Some(on) = join.on.as_mut() {
        bind_expr(on, &mut ctx, catalog)?;
        reject_literal_only_condition(on)?;
        let (left_cols, right_cols) = extract_join_fields(on, &join.left_relation_names, &join.right_relation_names);
        join.left_columns = left_cols;
        join.right_columns = right_cols;
    } else if matches!(join.kind, JoinKind::CrossUnnest) {
        if let Some(unnest) = join.unnest_column.as_mut() {
            bind_expr(unnest, &mut ctx, catalog)?;
        }
        if join.unnest_alias.is_none() {
            join.unnest_alias = join
                .unnest_column
                .as_ref()
                .map(|e| format!("UNNEST({})", format_expression(e)));
        }
    }

    match join.kind {
        JoinKind::LeftSemi | JoinKind::LeftAnti => {
            ctx.schemas.retain(|name, _| left_ctx.schemas.contains_key(name) || name == DERIVED_SCHEMA);
            ctx.relations = left_ctx.relations;
        }
        JoinKind::RightSemi | JoinKind::RightAnti => {
            ctx.schemas.retain(|name, _| right_ctx.schemas.contains_key(name) || name == DERIVED_SCHEMA);
            ctx.relations = right_ctx.relations;
        }
        _ => {}
    }

    plan.output = ctx.schemas.values().flat_map(|s| s.columns.iter().map(|c| c.id)).collect();
    Ok(ctx)
}

fn natural_using_columns(left: &BindContext, right: &BindContext) -> Vec<String> {
    let left_names: HashSet<String> = left
        .schemas
        .values()
        .filter(|s| !s.is_synthetic())
        .flat_map(|s| s.columns.iter().map(|c| c.name.to_ascii_lowercase()))
        .collect();
    let mut shared: Vec<String> = right
        .schemas
        .values()
        .filter(|s| !s.is_synthetic())
        .flat_map(|s| s.columns.iter().map(|c| c.name.clone()))
        .filter(|name| left_names.contains(&name.to_ascii_lowercase()))
        .collect();
    shared.sort();
    shared.dedup();
    shared
}

fn bind_using_join(
    join: &mut JoinStep,
    left_ctx: &BindContext,
    right_ctx: &BindContext,
    using: &[String],
    ctx: &mut BindContext,
) -> Result<()> {
    let mut conjuncts = Vec::new();
    let mut shared = RelationSchema::new(shared_schema_name());

    for name in using {
        let (left_id, _, _) = left_ctx.locate_identifier(None, name)?;
        let (right_id, _, _) = right_ctx.locate_identifier(None, name)?;

        let mut left_expr = Expr::identifier(None, name.clone());
        left_expr.schema_column = Some(left_id);
        let mut right_expr = Expr::identifier(None, name.clone());
        right_expr.schema_column = Some(right_id);
        conjuncts.push(Expr::new(ExprKind::Comparison {
            op: crate::expr::ComparisonOp::Eq,
            left: Box::new(left_expr),
            right: Box::new(right_expr),
        }));

        // Remove from both sides and place in the shared schema, preferring
        // the left relation's column definition (Open Question in §9).
        let mut merged_col = None;
        for schema in ctx.schemas.values_mut() {
            if let Some(c) = schema.remove_by_id(left_id) {
                merged_col = Some(c);
            }
        }
        for schema in ctx.schemas.values_mut() {
            schema.remove_by_id(right_id);
        }
        if let Some(mut c) = merged_col {
            c.origin = vec![
                join.left_relation_names.join(","),
                join.right_relation_names.join(","),
            ];
            shared.push(c);
        }
    }

    join.on = conjuncts
        .into_iter()
        .reduce(|a, b| Expr::new(ExprKind::And(Box::new(a), Box::new(b))));
    join.left_columns = using.iter().filter_map(|n| left_ctx.locate_identifier(None, n).ok()).map(|(id, ..)| id).collect();
    join.right_columns = using.iter().filter_map(|n| right_ctx.locate_identifier(None, n).ok()).map(|(id, ..)| id).collect();

    ctx.schemas.insert(shared.name.clone(), shared);
    Ok(())
}

fn reject_literal_only_condition(on: &Expr) -> Result<()> {
    let mut relations = std::collections::BTreeSet::new();
    on.referenced_relations(&mut relations);
    if relations.is_empty() {
        return Err(EngineError::new(
            ErrorKind::UnsupportedSyntax,
            "JOIN ... ON condition must reference a column from each side",
        ));
    }
    Ok(())
}

/// Walk an ON condition's AND-tree, pairing each `Eq` comparison's operand
/// identities to the side (left/right) whose relation set they belong to
/// (§4.2: "`left_columns`/`right_columns` are extracted from the ON
/// expression by walking AND nodes").
pub fn extract_join_fields(
    on: &Expr,
    left_relations: &[String],
    right_relations: &[String],
) -> (Vec<crate::schema::ColumnId>, Vec<crate::schema::ColumnId>) {
    let mut left_cols = Vec::new();
    let mut right_cols = Vec::new();
    walk_eq_operands(on, left_relations, right_relations, &mut left_cols, &mut right_cols);
    (left_cols, right_cols)
}

fn walk_eq_operands(
    expr: &Expr,
    left_relations: &[String],
    right_relations: &[String],
    left_cols: &mut Vec<crate::schema::ColumnId>,
    right_cols: &mut Vec<crate::schema::ColumnId>,
) {
    match &expr.kind {
        ExprKind::And(l, r) => {
            walk_eq_operands(l, left_relations, right_relations, left_cols, right_cols);
            walk_eq_operands(r, left_relations, right_relations, left_cols, right_cols);
        }
        ExprKind::Comparison {
            op: crate::expr::ComparisonOp::Eq,
            left,
            right,
        } => {
            place_operand(left, left_relations, right_relations, left_cols, right_cols);
            place_operand(right, left_relations, right_relations, left_cols, right_cols);
        }
        _ => {}
    }
}

fn place_operand(
    expr: &Expr,
    left_relations: &[String],
    right_relations: &[String],
    left_cols: &mut Vec<crate::schema::ColumnId>,
    right_cols: &mut Vec<crate::schema::ColumnId>,
) {
    let mut relations = std::collections::BTreeSet::new();
    expr.referenced_relations(&mut relations);
    let id = match expr.schema_column {
        Some(id) => id,
        None => return,
    };
    if relations.iter().any(|r| left_relations.contains(r)) {
        left_cols.push(id);
    } else if relations.iter().any(|r| right_relations.contains(r)) {
        right_cols.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::lower::lower_statement;
    use flint_parser::parse_statements;
    use flint_types::ScalarValue;
    use std::sync::Arc;

    struct TestCatalog;

    impl Catalog for TestCatalog {
        fn resolve_dataset(&self, relation: &str) -> Result<crate::catalog::DatasetDescriptor> {
            let mut schema = RelationSchema::new(relation);
            schema.push(Column::new_flat("id", DataType::Int64, relation));
            schema.push(Column::new_flat("name", DataType::Utf8, relation));
            schema.push(Column::new_flat("planetId", DataType::Int64, relation));
            Ok(crate::catalog::DatasetDescriptor {
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

    fn bound_plan(sql: &str) -> LogicalPlan {
        let stmts = parse_statements(sql).unwrap();
        let mut plan = lower_statement(&stmts[0]).unwrap();
        bind_plan(&mut plan, &TestCatalog).unwrap();
        plan
    }

    #[test]
    fn select_star_resolves_every_identifier() {
        let plan = bound_plan("SELECT * FROM satellites");
        let exit = &plan.step;
        if let Step::Exit(e) = exit {
            assert_eq!(e.columns.len(), 3);
            for c in &e.columns {
                assert!(c.schema_column.is_some());
            }
        } else {
            panic!("expected Exit");
        }
    }

    #[test]
    fn unknown_column_suggests_closest_match() {
        let stmts = parse_statements("SELECT nam FROM satellites").unwrap();
        let mut plan = lower_statement(&stmts[0]).unwrap();
        let err = bind_plan(&mut plan, &TestCatalog).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
        assert_eq!(err.suggestion(), Some("name"));
    }

    #[test]
    fn ambiguous_alias_is_rejected() {
        let stmts = parse_statements("SELECT * FROM satellites AS a, satellites AS a").unwrap();
        let mut plan = lower_statement(&stmts[0]).unwrap();
        let err = bind_plan(&mut plan, &TestCatalog).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousDataset);
    }

    #[test]
    fn group_by_prunes_unreferenced_columns() {
        let plan = bound_plan("SELECT planetId, COUNT(*) FROM satellites GROUP BY planetId");
        if let Step::Project(p) = &plan.children[0].step {
            assert_eq!(p.columns.len(), 2);
        } else {
            panic!("expected Project above AggregateAndGroup");
        }
    }

    #[test]
    fn using_join_creates_shared_schema() {
        let mut plan = {
            let stmts = parse_statements(
                "SELECT * FROM satellites JOIN satellites AS s2 USING (planetId)",
            )
            .unwrap();
            lower_statement(&stmts[0]).unwrap()
        };
        bind_plan(&mut plan, &TestCatalog).unwrap();
        let join = &plan.children[0].children[0].step;
        if let Step::Join(j) = join {
            assert_eq!(j.left_columns.len(), 1);
            assert_eq!(j.right_columns.len(), 1);
        } else {
            panic!("expected Join, got {join:?}");
        }
        let _ = Arc::new(());
    }
}
