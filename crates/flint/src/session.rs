//! [`Connection`] and [`Session`] (§4.8): the embeddable surface that wires
//! parser → binder → optimizer → executor together and owns session state
//! across calls to `execute`.
//!
//! Grounded on `rayexec_execution/src/engine/session.rs`'s `Session::execute`
//! (parse one batch, plan each statement, drive it to a result stream) with
//! the scheduler/channel machinery dropped — there's no multi-connection
//! server here, so a `Session` just holds the catalog/variable state a
//! single caller's queries need.

use std::sync::Arc;

use flint_connector::{Connector, ConnectorRegistry, MemoryConnector, RegistryCatalog};
use flint_core::catalog::Catalog;
use flint_core::logical::{LogicalPlan, ShowColumnsStep, ShowVariableStep, Step};
use flint_error::{EngineError, ErrorKind, Result};
use flint_parser::Statement;
use flint_physical::evaluator::{evaluate, EvalCache};
use flint_physical::OperatorStream;
use flint_types::array::PrimitiveArray;
use flint_types::{Array, Morsel, ScalarValue};

use crate::catalog::SessionCatalog;
use crate::config::SessionConfig;
use crate::variables::{GlobalVariables, SessionVariables};

/// One statement's result: its output column names, in order, and the
/// morsel stream producing its rows. `Set`/`EXPLAIN`/`SHOW` statements
/// return a stream of at most one morsel; an ordinary query's stream is
/// however long the physical pipeline runs.
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub stream: OperatorStream,
}

/// Owns the connector registry and `@@name` globals shared by every
/// [`Session`] spawned from it (§4.8).
pub struct Connection {
    registry: Arc<ConnectorRegistry>,
    #[allow(dead_code)]
    config: SessionConfig,
    globals: Arc<GlobalVariables>,
}

impl Connection {
    pub fn new(config: SessionConfig) -> Self {
        let registry = ConnectorRegistry::new(Arc::new(MemoryConnector::new()));
        Connection { registry: Arc::new(registry), config, globals: GlobalVariables::new() }
    }

    /// Register `connector` to serve every relation whose name starts with
    /// `prefix` (§6, `DATASET_PREFIX_MAPPING`). Must be called before any
    /// `Session` is spawned — the registry is immutable once a query may be
    /// running against it (§5).
    pub fn register_connector(mut self, prefix: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Arc::get_mut(&mut self.registry)
            .expect("register_connector called after a Session was already spawned")
            .register_prefix(prefix, connector);
        self
    }

    pub fn session(&self) -> Session {
        Session { registry: self.registry.clone(), globals: self.globals.clone(), variables: SessionVariables::new() }
    }
}

pub struct Session {
    registry: Arc<ConnectorRegistry>,
    globals: Arc<GlobalVariables>,
    variables: SessionVariables,
}

impl Session {
    /// Parse `sql` as a `;`-separated batch and plan+execute each statement
    /// in turn, binding `params` to the batch's `?` placeholders under
    /// `$1`, `$2`, ... (§6, `qmark` paramstyle).
    pub fn execute(&mut self, sql: &str, params: &[ScalarValue]) -> Result<Vec<ExecutionResult>> {
        tracing::debug!(num_params = params.len(), "executing batch");
        self.variables.bind_params(params);
        let statements = flint_parser::parse_statements(sql)?;
        statements.iter().map(|stmt| self.execute_statement(stmt)).collect()
    }

    fn execute_statement(&mut self, stmt: &Statement) -> Result<ExecutionResult> {
        let (plan, warnings) = {
            let registry_catalog = RegistryCatalog::new(self.registry.clone());
            let catalog = SessionCatalog::new(registry_catalog, &self.variables, self.globals.clone());
            flint_core::plan_statement(stmt, &catalog)?
        };
        for warning in &warnings {
            tracing::warn!(%warning, "non-fatal plan warning");
        }

        match &plan.step {
            Step::Set(set) => {
                let value = eval_scalar(&set.value, &self.registry)?;
                tracing::trace!(name = %set.name, session = set.session, "setting variable");
                if set.session {
                    self.variables.set_local(set.name.clone(), value);
                } else {
                    self.globals.set(set.name.clone(), value);
                }
                Ok(ExecutionResult { columns: Vec::new(), stream: Box::new(std::iter::empty()) })
            }
            Step::ShowColumns(show) => self.execute_show_columns(show),
            Step::ShowVariable(show) => self.execute_show_variable(show),
            Step::Explain(_) => self.execute_explain(&plan, &warnings),
            _ => self.execute_query(&plan),
        }
    }

    fn execute_show_columns(&self, show: &ShowColumnsStep) -> Result<ExecutionResult> {
        let relation = show.table.join(".");
        let registry_catalog = RegistryCatalog::new(self.registry.clone());
        let descriptor = registry_catalog.resolve_dataset(&relation)?;
        let names: Vec<String> = descriptor.schema.columns.iter().map(|c| c.name.clone()).collect();
        let types: Vec<String> = descriptor.schema.columns.iter().map(|c| c.data_type.to_string()).collect();
        single_morsel_result(
            vec!["name".to_string(), "type".to_string()],
            vec![Array::Utf8(PrimitiveArray::from_values(names)), Array::Utf8(PrimitiveArray::from_values(types))],
        )
    }

    fn execute_show_variable(&self, show: &ShowVariableStep) -> Result<ExecutionResult> {
        if show.name == "FUNCTIONS" {
            let names: Vec<String> = flint_core::functions::all_names().map(str::to_string).collect();
            return single_morsel_result(vec!["function".to_string()], vec![Array::Utf8(PrimitiveArray::from_values(names))]);
        }

        if show.name.is_empty() {
            let mut names = self.variables.names();
            names.extend(self.globals.names());
            let values: Vec<String> = names
                .iter()
                .map(|n| self.variables.get_local(n).or_else(|| self.globals.get(n)).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            return single_morsel_result(
                vec!["name".to_string(), "value".to_string()],
                vec![Array::Utf8(PrimitiveArray::from_values(names)), Array::Utf8(PrimitiveArray::from_values(values))],
            );
        }

        let value = self.variables.get_local(&show.name).or_else(|| self.globals.get(&show.name)).ok_or_else(|| {
            EngineError::new(ErrorKind::VariableNotFound, format!("unknown variable '{}'", show.name)).with_qualifier(show.name.clone())
        })?;
        single_morsel_result(
            vec!["name".to_string(), "value".to_string()],
            vec![
                Array::Utf8(PrimitiveArray::from_values(vec![show.name.clone()])),
                Array::Utf8(PrimitiveArray::from_values(vec![value.to_string()])),
            ],
        )
    }

    fn execute_explain(&self, plan: &LogicalPlan, warnings: &[String]) -> Result<ExecutionResult> {
        let mut rendered = crate::explain::render(plan.only_child()).render();
        for warning in warnings {
            rendered.push_str("\nwarning: ");
            rendered.push_str(warning);
        }
        single_morsel_result(vec!["plan".to_string()], vec![Array::Utf8(PrimitiveArray::from_values(vec![rendered]))])
    }

    fn execute_query(&self, plan: &LogicalPlan) -> Result<ExecutionResult> {
        let columns = match &plan.step {
            Step::Exit(exit) => exit.columns.iter().map(|c| c.query_column.clone().unwrap_or_else(|| "column".to_string())).collect(),
            _ => Vec::new(),
        };
        let stream = flint_physical::build_physical_plan(plan, &self.registry)?;
        Ok(ExecutionResult { columns, stream })
    }
}

fn eval_scalar(expr: &flint_core::expr::Expr, registry: &Arc<ConnectorRegistry>) -> Result<ScalarValue> {
    let empty = Morsel::empty_with_num_rows(1);
    let mut cache = EvalCache::new();
    let arr = evaluate(expr, &empty, &[], registry, &mut cache)?;
    Ok(arr.scalar(0))
}

fn single_morsel_result(columns: Vec<String>, arrays: Vec<Array>) -> Result<ExecutionResult> {
    Ok(ExecutionResult { columns, stream: Box::new(std::iter::once(Morsel::try_new(arrays))) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(session: &mut Session, sql: &str) -> Vec<ExecutionResult> {
        session.execute(sql, &[]).unwrap()
    }

    #[test]
    fn selects_from_a_builtin_fixture() {
        let conn = Connection::new(SessionConfig::default());
        let mut session = conn.session();
        let mut results = run(&mut session, "SELECT name FROM $planets");
        let result = results.remove(0);
        assert_eq!(result.columns, vec!["name".to_string()]);
        let rows: usize = result.stream.map(|m| m.unwrap().num_rows()).sum();
        assert!(rows > 0);
    }

    #[test]
    fn set_and_read_back_a_session_variable() {
        let conn = Connection::new(SessionConfig::default());
        let mut session = conn.session();
        run(&mut session, "SET @threshold = 5");
        let mut results = run(&mut session, "SELECT @threshold AS t FROM $planets LIMIT 1");
        let result = results.remove(0);
        let morsel = result.stream.into_iter().next().unwrap().unwrap();
        assert_eq!(morsel.column(0).unwrap().scalar(0), ScalarValue::Int64(5));
    }

    #[test]
    fn explain_renders_a_plan_tree() {
        let conn = Connection::new(SessionConfig::default());
        let mut session = conn.session();
        let mut results = run(&mut session, "EXPLAIN SELECT name FROM $planets");
        let result = results.remove(0);
        let morsel = result.stream.into_iter().next().unwrap().unwrap();
        let rendered = match morsel.column(0).unwrap().scalar(0) {
            ScalarValue::Utf8(s) => s,
            other => panic!("expected a rendered plan string, got {other:?}"),
        };
        assert!(rendered.contains("Exit"));
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let conn = Connection::new(SessionConfig::default());
        let mut session = conn.session();
        let err = session.execute("SHOW VARIABLE nope", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VariableNotFound);
    }
}
