//! Data source integration (§6, §9): the `Connector` contract, the built-in
//! in-memory fixture connector, the read-through blob cache, and the
//! registry that resolves a relation name to the connector that owns it.
//!
//! `flint-core` plans against the narrow [`flint_core::Catalog`] trait and
//! never sees a connector directly; [`catalog::RegistryCatalog`] is the
//! bridge, and `flint`'s `Session` is what wires a [`registry::ConnectorRegistry`]
//! into a catalog for a query.

pub mod cache;
pub mod cached;
pub mod catalog;
pub mod connector;
pub mod memory;
pub mod registry;

pub use cache::ReadThroughCache;
pub use cached::CachedConnector;
pub use catalog::RegistryCatalog;
pub use connector::{Cacheable, Connector, ConnectorCapabilities, Partitionable, PredicatePushable, PushedPredicate};
pub use memory::MemoryConnector;
pub use registry::ConnectorRegistry;
