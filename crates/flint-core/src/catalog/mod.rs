//! The binder's `Catalog` collaborator (§4.2, §4.6).
//!
//! Connector implementations, file-format decoders, and cache backends are
//! external collaborators per §1; this module only names the narrow
//! contract the binder needs to attach catalog metadata to a `Scan` node.
//! `flint-connector` provides concrete `Catalog` implementations.

use flint_types::ScalarValue;

use crate::schema::RelationSchema;

/// What the catalog knows about a relation before it's bound: its schema,
/// plus the connector capability markers named in §6 (`Partitionable`,
/// `Cacheable`) that drive the binder's cache-decorator and partition-date
/// propagation decisions.
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    pub schema: RelationSchema,
    pub connector_name: String,
    pub cacheable: bool,
    pub partitionable: bool,
}

/// Catalog lookups the binder performs while walking a logical plan (§4.2).
///
/// Implementations are immutable after initialization (§5): there is no
/// mutation path from inside a query.
pub trait Catalog: Send + Sync {
    fn resolve_dataset(&self, relation: &str) -> flint_error::Result<DatasetDescriptor>;

    /// `@name` / `@@name` session and global variables (§3, §6).
    fn session_variable(&self, name: &str) -> Option<ScalarValue>;

    /// All relation names the catalog can resolve, used for fuzzy
    /// `DatasetNotFound` suggestions.
    fn known_relations(&self) -> Vec<String> {
        Vec::new()
    }
}
