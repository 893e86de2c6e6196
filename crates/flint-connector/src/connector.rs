//! The connector contract (§6): what every data source implements, and the
//! capability markers that opt a connector into extended protocol with the
//! engine (pushdown, partitioning, caching).

use flint_error::Result;
use flint_types::Morsel;

use flint_core::expr::ComparisonOp;
use flint_core::schema::{ColumnId, RelationSchema};

/// A predicate the physical `Scan` operator offers to push into the
/// connector, already restricted to a pushable comparison
/// (`ComparisonOp::is_pushable`) over a pushable type
/// (`DataType::is_pushable`, §4.4, §6). The connector may ignore it — the
/// caller is responsible for re-evaluating anything it can't guarantee was
/// applied.
#[derive(Debug, Clone)]
pub struct PushedPredicate {
    pub column: ColumnId,
    pub op: ComparisonOp,
    pub value: flint_types::ScalarValue,
}

/// Capability flags a connector advertises to the binder (§3: "Scan"; §6).
/// Kept as a plain value rather than runtime trait-object downcasting so a
/// `dyn Connector` can be queried without `Any` — the three marker traits
/// below exist for concrete types to implement as documentation of intent
/// (per the specification's "interface traits composed into concrete
/// connector types"), while `Connector::capabilities` is what the binder and
/// physical planner actually consult.
#[derive(Debug, Clone, Copy)]
pub struct ConnectorCapabilities {
    pub partitionable: bool,
    pub cacheable: bool,
    pub predicate_pushable: bool,
}

impl ConnectorCapabilities {
    pub const NONE: ConnectorCapabilities = ConnectorCapabilities {
        partitionable: false,
        cacheable: false,
        predicate_pushable: false,
    };
}

/// A data source the engine can scan. Implemented by every connector;
/// `flint-connector` ships one (the built-in in-memory fixture connector),
/// real storage backends are out of scope (§1 Non-goals).
pub trait Connector: std::fmt::Debug + Send + Sync {
    /// A short, stable identifier used for cache keys and `EXPLAIN` output.
    fn id(&self) -> &str;

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities::NONE
    }

    fn get_dataset_schema(&self, relation: &str) -> Result<RelationSchema>;

    /// Read a dataset, honoring `columns` (a projection, `None` meaning
    /// "all") and `predicates` (best-effort pushdown) if it can. When
    /// `just_schema` is set, the connector should return without
    /// materializing any rows — used to probe shape during planning.
    fn read_dataset(
        &self,
        relation: &str,
        columns: Option<&[ColumnId]>,
        predicates: &[PushedPredicate],
        just_schema: bool,
    ) -> Result<Box<dyn Iterator<Item = Result<Morsel>> + Send>>;

    /// Read a single blob by name. Only meaningful for connectors backed by
    /// blob storage; the default rejects it.
    fn read_blob(&self, blob_name: &str) -> Result<Vec<u8>> {
        flint_error::not_implemented!("connector '{}' does not support blob reads ({blob_name})", self.id())
    }

    /// List blob names under `prefix`. Connectors may cache this result for
    /// the lifetime of a query (§9 design note); invalidation is per-query.
    fn get_list_of_blob_names(&self, prefix: &str) -> Result<Vec<String>> {
        flint_error::not_implemented!("connector '{}' does not support blob listing ({prefix})", self.id())
    }
}

/// Marker: the connector accepts `start_date`/`end_date` and a partition
/// scheme (§4.2's "Scan" binding step propagates these when present).
pub trait Partitionable: Connector {}

/// Marker: the connector's blob reader should be wrapped with read-through
/// caching unless the `Scan` carries the `NO_CACHE` hint.
pub trait Cacheable: Connector {}

/// Marker: the connector understands [`PushedPredicate`]s and applies at
/// least the ones whose operator and column type report `is_pushable()`.
pub trait PredicatePushable: Connector {}
