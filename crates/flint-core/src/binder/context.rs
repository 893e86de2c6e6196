//! [`BindContext`]: the per-node traversal state the binder clones at every
//! visit and merges back at the parent (§4.2).

use indexmap::IndexMap;
use std::collections::BTreeSet;

use flint_error::{suggest_closest, EngineError, ErrorKind, Result};
use flint_types::DataType;

use crate::schema::{ColumnId, RelationSchema, DERIVED_SCHEMA};

#[derive(Debug, Clone, Default)]
pub struct BindContext {
    pub schemas: IndexMap<String, RelationSchema>,
    pub relations: BTreeSet<String>,
    /// Non-fatal hint-validation messages (§4.1), surfaced through `EXPLAIN`.
    pub warnings: Vec<String>,
}

impl BindContext {
    /// A fresh scope with an empty `$derived` schema (Invariant 3).
    pub fn new() -> Self {
        let mut schemas = IndexMap::new();
        schemas.insert(DERIVED_SCHEMA.to_string(), RelationSchema::new(DERIVED_SCHEMA));
        BindContext {
            schemas,
            relations: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    pub fn derived_mut(&mut self) -> &mut RelationSchema {
        self.schemas
            .entry(DERIVED_SCHEMA.to_string())
            .or_insert_with(|| RelationSchema::new(DERIVED_SCHEMA))
    }

    /// Union this context with a sibling's, the way the binder merges child
    /// contexts back into their parent. Synthetic scopes (`$derived`, ...)
    /// union their columns; colliding physical relation names are an error
    /// (the same alias bound on both sides of a join).
    pub fn merge(mut self, other: BindContext) -> Result<Self> {
        for (name, schema) in other.schemas {
            match self.schemas.get_mut(&name) {
                Some(existing) if schema.is_synthetic() => {
                    existing.columns.extend(schema.columns);
                }
                Some(_) => {
                    return Err(EngineError::new(
                        ErrorKind::AmbiguousDataset,
                        format!("relation '{name}' is bound more than once in this scope"),
                    )
                    .with_qualifier(name));
                }
                None => {
                    self.schemas.insert(name, schema);
                }
            }
        }
        self.relations.extend(other.relations);
        self.warnings.extend(other.warnings);
        Ok(self)
    }

    fn find_schema(&self, name: &str) -> Option<&RelationSchema> {
        self.schemas
            .get(name)
            .or_else(|| self.schemas.values().find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    /// `locate_identifier` (§4.2): resolve a possibly-qualified identifier
    /// against this context's schemas.
    pub fn locate_identifier(
        &self,
        source: Option<&str>,
        column: &str,
    ) -> Result<(ColumnId, DataType, String)> {
        if let Some(source) = source {
            let schema = self.find_schema(source).ok_or_else(|| {
                EngineError::new(
                    ErrorKind::UnexpectedDatasetReference,
                    format!("no relation '{source}' in this scope"),
                )
                .with_qualifier(source)
            })?;
            return match schema.find_column(column) {
                Some(c) => Ok((c.id, c.data_type.clone(), c.name.clone())),
                None => {
                    let mut err = EngineError::new(
                        ErrorKind::ColumnNotFound,
                        format!("column '{column}' not found in '{source}'"),
                    )
                    .with_qualifier(source);
                    if let Some(s) = suggest_closest(column, schema.column_names()) {
                        err = err.with_suggestion(s);
                    }
                    Err(err)
                }
            };
        }

        let mut matches: Vec<(&str, ColumnId, DataType, String)> = Vec::new();
        for schema in self.schemas.values() {
            if schema.name == DERIVED_SCHEMA {
                continue;
            }
            if let Some(c) = schema.find_column(column) {
                matches.push((schema.name.as_str(), c.id, c.data_type.clone(), c.name.clone()));
            }
        }
        // Fall back to $derived if nothing else matched (references to
        // expression-valued columns created earlier in the same clause).
        if matches.is_empty() {
            if let Some(c) = self.schemas.get(DERIVED_SCHEMA).and_then(|s| s.find_column(column)) {
                matches.push((DERIVED_SCHEMA, c.id, c.data_type.clone(), c.name.clone()));
            }
        }

        match matches.len() {
            0 => {
                let all_names: Vec<&str> = self
                    .schemas
                    .values()
                    .flat_map(|s| s.columns.iter().map(|c| c.name.as_str()))
                    .collect();
                let mut err =
                    EngineError::new(ErrorKind::ColumnNotFound, format!("column '{column}' not found"));
                if let Some(s) = suggest_closest(column, all_names) {
                    err = err.with_suggestion(s);
                }
                Err(err)
            }
            1 => {
                let (_, id, dtype, name) = matches.remove(0);
                Ok((id, dtype, name))
            }
            _ => {
                let relations: Vec<&str> = matches.iter().map(|(r, ..)| *r).collect();
                Err(EngineError::new(
                    ErrorKind::AmbiguousIdentifier,
                    format!(
                        "column '{column}' is ambiguous; present in relations {}",
                        relations.join(", ")
                    ),
                ))
            }
        }
    }
}
