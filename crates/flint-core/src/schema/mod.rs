//! Column identity and relation schemas (§3).
//!
//! A [`ColumnId`] is assigned once, at the point a column is created by the
//! binder, and is never rewritten by subsequent plan rewrites (Invariant 2).
//! Every downstream reference to that column — in an expression, in a join's
//! `left_columns`/`right_columns`, in a group-by list — goes through this id,
//! not through the column's display name.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use flint_types::DataType;

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnId(pub u64);

impl ColumnId {
    /// Mint a fresh, globally unique column identity.
    pub fn fresh() -> Self {
        ColumnId(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A special-typed disposition a column can carry, used by `FAKE` datasets
/// and a handful of builtin functions that need to tag a column beyond its
/// raw [`DataType`] (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Name,
    Age,
}

/// Whether a column is backed by a physical/derived value, or is a
/// compile-time constant folded in by the binder or optimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// An ordinary column: physical, derived from an expression, or the
    /// output of an aggregate.
    Flat,
    /// A literal value known at bind time.
    Constant(flint_types::ScalarValue),
}

/// A single column as tracked through binding and planning.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub data_type: DataType,
    pub kind: ColumnKind,
    pub disposition: Option<Disposition>,
    /// Relation name(s) this column originated from. More than one entry
    /// only after a USING/NATURAL join merges columns into a `$shared`
    /// schema.
    pub origin: Vec<String>,
    pub aliases: Vec<String>,
}

impl Column {
    pub fn new_flat(name: impl Into<String>, data_type: DataType, origin: impl Into<String>) -> Self {
        Column {
            id: ColumnId::fresh(),
            name: name.into(),
            data_type,
            kind: ColumnKind::Flat,
            disposition: None,
            origin: vec![origin.into()],
            aliases: Vec::new(),
        }
    }

    pub fn new_constant(name: impl Into<String>, value: flint_types::ScalarValue) -> Self {
        let data_type = value.datatype();
        Column {
            id: ColumnId::fresh(),
            name: name.into(),
            data_type,
            kind: ColumnKind::Constant(value),
            disposition: None,
            origin: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ColumnKind::Constant(_))
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// The `$derived`, `$project`, `$calculated`, `$shared-…`, `$values-…`
/// prefixes named in §3.
pub fn is_synthetic_relation_name(name: &str) -> bool {
    name.starts_with('$')
}

pub const DERIVED_SCHEMA: &str = "$derived";
pub const PROJECT_SCHEMA: &str = "$project";
pub const CALCULATED_SCHEMA: &str = "$calculated";

pub fn shared_schema_name() -> String {
    format!("$shared-{:x}", rand::random::<u32>())
}

pub fn values_schema_name() -> String {
    format!("$values-{:x}", rand::random::<u32>())
}

/// A relation visible in the current binding scope: a physical/derived
/// table, or a synthetic schema such as `$derived`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub aliases: Vec<String>,
}

impl RelationSchema {
    pub fn new(name: impl Into<String>) -> Self {
        RelationSchema {
            name: name.into(),
            columns: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        is_synthetic_relation_name(&self.name)
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.matches_name(name))
    }

    pub fn find_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.matches_name(name))
    }

    pub fn push(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn remove_by_id(&mut self, id: ColumnId) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.id == id)?;
        Some(self.columns.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_ids_are_never_reused() {
        let a = ColumnId::fresh();
        let b = ColumnId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn synthetic_relation_names_start_with_dollar() {
        assert!(is_synthetic_relation_name(DERIVED_SCHEMA));
        assert!(!is_synthetic_relation_name("satellites"));
    }
}
