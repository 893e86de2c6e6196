//! `RegistryCatalog` (§4.6): the `flint_core::Catalog` implementation the
//! binder actually talks to, backed by a [`ConnectorRegistry`].
//!
//! The specification's §4.6 pseudocode names a catalog trait with a
//! `get_connector`-style lookup that returns the connector directly; the
//! binder only ever needs the relation's *schema* plus its capability
//! flags to decide on cache-decoration and partition propagation (§4.2), so
//! `flint-core::Catalog` asks for a [`DatasetDescriptor`] instead and
//! `flint-connector` resolves the connector underneath. See `DESIGN.md`.

use std::sync::Arc;

use flint_core::catalog::{Catalog, DatasetDescriptor};
use flint_error::Result;
use flint_types::ScalarValue;

use crate::registry::ConnectorRegistry;

/// Session-scoped `@name` variables layered on top of the connector
/// registry. `@@name` globals are out of scope for this adapter — a
/// `Session` in the `flint` façade owns those (§4.8).
pub struct RegistryCatalog {
    registry: Arc<ConnectorRegistry>,
    variables: std::collections::HashMap<String, ScalarValue>,
}

impl RegistryCatalog {
    pub fn new(registry: Arc<ConnectorRegistry>) -> Self {
        RegistryCatalog { registry, variables: std::collections::HashMap::new() }
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: ScalarValue) {
        self.variables.insert(name.into(), value);
    }
}

impl Catalog for RegistryCatalog {
    fn resolve_dataset(&self, relation: &str) -> Result<DatasetDescriptor> {
        let connector = self.registry.resolve(relation)?;
        let schema = connector.get_dataset_schema(relation)?;
        let caps = connector.capabilities();
        Ok(DatasetDescriptor {
            schema,
            connector_name: connector.id().to_string(),
            cacheable: caps.cacheable,
            partitionable: caps.partitionable,
        })
    }

    fn session_variable(&self, name: &str) -> Option<ScalarValue> {
        self.variables.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;

    #[test]
    fn resolves_builtin_planets_schema() {
        let registry = Arc::new(ConnectorRegistry::new(Arc::new(MemoryConnector::new())));
        let catalog = RegistryCatalog::new(registry);
        let descriptor = catalog.resolve_dataset("$planets").unwrap();
        assert_eq!(descriptor.schema.columns.len(), 20);
        assert_eq!(descriptor.connector_name, "memory");
    }

    #[test]
    fn session_variable_round_trips() {
        let registry = Arc::new(ConnectorRegistry::new(Arc::new(MemoryConnector::new())));
        let mut catalog = RegistryCatalog::new(registry);
        catalog.set_variable("limit", ScalarValue::Int64(10));
        assert_eq!(catalog.session_variable("limit"), Some(ScalarValue::Int64(10)));
        assert_eq!(catalog.session_variable("missing"), None);
    }
}
