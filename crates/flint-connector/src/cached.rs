//! `CachedConnector` (§4.7): decorates a `Cacheable` connector's blob reads
//! with the read-through cache, the way the binder's `Scan` step decides to
//! wrap a connector when it advertises `cacheable` and the query didn't
//! carry a `NO_CACHE` hint (§4.2).

use std::sync::Arc;

use flint_error::Result;
use flint_types::Morsel;

use crate::cache::ReadThroughCache;
use crate::connector::{Connector, ConnectorCapabilities, PushedPredicate};

#[derive(Debug)]
pub struct CachedConnector {
    inner: Arc<dyn Connector>,
    cache: Arc<ReadThroughCache>,
}

impl CachedConnector {
    pub fn new(inner: Arc<dyn Connector>, cache: Arc<ReadThroughCache>) -> Self {
        CachedConnector { inner, cache }
    }
}

impl Connector for CachedConnector {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        self.inner.capabilities()
    }

    fn get_dataset_schema(&self, relation: &str) -> Result<flint_core::schema::RelationSchema> {
        self.inner.get_dataset_schema(relation)
    }

    fn read_dataset(
        &self,
        relation: &str,
        columns: Option<&[flint_core::schema::ColumnId]>,
        predicates: &[PushedPredicate],
        just_schema: bool,
    ) -> Result<Box<dyn Iterator<Item = Result<Morsel>> + Send>> {
        self.inner.read_dataset(relation, columns, predicates, just_schema)
    }

    fn read_blob(&self, blob_name: &str) -> Result<Vec<u8>> {
        let id = self.inner.id().to_string();
        if self.cache.is_disabled(&id) {
            return self.inner.read_blob(blob_name);
        }
        let inner = &self.inner;
        self.cache.get_or_fetch(&id, blob_name, || inner.read_blob(blob_name))
    }

    fn get_list_of_blob_names(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.get_list_of_blob_names(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flint_core::schema::RelationSchema;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct CountingConnector {
        calls: AtomicU32,
    }

    impl Connector for CountingConnector {
        fn id(&self) -> &str {
            "counting"
        }
        fn capabilities(&self) -> ConnectorCapabilities {
            ConnectorCapabilities { partitionable: false, cacheable: true, predicate_pushable: false }
        }
        fn get_dataset_schema(&self, relation: &str) -> Result<RelationSchema> {
            Ok(RelationSchema::new(relation))
        }
        fn read_dataset(
            &self,
            _relation: &str,
            _columns: Option<&[flint_core::schema::ColumnId]>,
            _predicates: &[PushedPredicate],
            _just_schema: bool,
        ) -> Result<Box<dyn Iterator<Item = Result<Morsel>> + Send>> {
            Ok(Box::new(std::iter::empty()))
        }
        fn read_blob(&self, _blob_name: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![9])
        }
    }

    #[test]
    fn repeated_reads_hit_the_cache_once() {
        let inner = Arc::new(CountingConnector { calls: AtomicU32::new(0) });
        let cached = CachedConnector::new(inner.clone(), Arc::new(ReadThroughCache::new()));
        for _ in 0..4 {
            assert_eq!(cached.read_blob("x.parquet").unwrap(), vec![9]);
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
