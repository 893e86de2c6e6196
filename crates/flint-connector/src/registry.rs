//! `ConnectorRegistry` (§6, §9): maps a relation name to the connector that
//! owns it by longest matching prefix, with `$`-prefixed names bypassing the
//! mapping to resolve straight to the built-in in-memory connector.

use std::sync::Arc;

use flint_error::{EngineError, ErrorKind, Result};

use crate::connector::Connector;

/// Registers connectors under relation-name prefixes and resolves a bare
/// relation name to the connector that should serve it.
///
/// Prefixes are matched longest-first so a more specific mapping (e.g.
/// `"lake.raw."`) wins over a broader one (e.g. `"lake."`) registered
/// earlier or later — registration order doesn't matter, only specificity.
pub struct ConnectorRegistry {
    builtin: Arc<dyn Connector>,
    mapping: Vec<(String, Arc<dyn Connector>)>,
}

impl ConnectorRegistry {
    pub fn new(builtin: Arc<dyn Connector>) -> Self {
        ConnectorRegistry { builtin, mapping: Vec::new() }
    }

    /// Register `connector` to serve every relation whose name starts with
    /// `prefix`. Re-registering the same prefix replaces the previous entry.
    pub fn register_prefix(&mut self, prefix: impl Into<String>, connector: Arc<dyn Connector>) {
        let prefix = prefix.into();
        self.mapping.retain(|(p, _)| p != &prefix);
        self.mapping.push((prefix, connector));
        self.mapping.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Resolve `relation` to the connector that should serve it. Names
    /// starting with `$` always resolve to the built-in in-memory connector
    /// (the fixture datasets), regardless of registered prefixes.
    pub fn resolve(&self, relation: &str) -> Result<Arc<dyn Connector>> {
        if relation.starts_with('$') {
            return Ok(self.builtin.clone());
        }
        self.mapping
            .iter()
            .find(|(prefix, _)| relation.starts_with(prefix.as_str()))
            .map(|(_, connector)| connector.clone())
            .ok_or_else(|| {
                EngineError::new(ErrorKind::DatasetNotFound, format!("no connector registered for '{relation}'"))
            })
    }

    pub fn builtin(&self) -> Arc<dyn Connector> {
        self.builtin.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectorCapabilities;
    use crate::memory::MemoryConnector;
    use flint_core::schema::RelationSchema;
    use flint_types::Morsel;

    #[derive(Debug)]
    struct StubConnector(&'static str);

    impl Connector for StubConnector {
        fn id(&self) -> &str {
            self.0
        }
        fn capabilities(&self) -> ConnectorCapabilities {
            ConnectorCapabilities::NONE
        }
        fn get_dataset_schema(&self, relation: &str) -> Result<RelationSchema> {
            Ok(RelationSchema::new(relation))
        }
        fn read_dataset(
            &self,
            _relation: &str,
            _columns: Option<&[flint_core::schema::ColumnId]>,
            _predicates: &[crate::connector::PushedPredicate],
            _just_schema: bool,
        ) -> Result<Box<dyn Iterator<Item = Result<Morsel>> + Send>> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    #[test]
    fn dollar_prefixed_relations_bypass_the_mapping() {
        let registry = ConnectorRegistry::new(Arc::new(MemoryConnector::new()));
        let resolved = registry.resolve("$planets").unwrap();
        assert_eq!(resolved.id(), "memory");
    }

    #[test]
    fn longest_prefix_wins() {
        let mut registry = ConnectorRegistry::new(Arc::new(MemoryConnector::new()));
        registry.register_prefix("lake.", Arc::new(StubConnector("broad")));
        registry.register_prefix("lake.raw.", Arc::new(StubConnector("specific")));
        let resolved = registry.resolve("lake.raw.events").unwrap();
        assert_eq!(resolved.id(), "specific");
    }

    #[test]
    fn unregistered_prefix_errors() {
        let registry = ConnectorRegistry::new(Arc::new(MemoryConnector::new()));
        assert!(registry.resolve("unknown.table").is_err());
    }
}
