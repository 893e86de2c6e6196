//! Per-process configuration (§4.8): the knobs `Connection::new` reads once
//! at startup. Mirrors the teacher's own config structs in carrying plain
//! serializable fields rather than a builder.

use serde::{Deserialize, Serialize};

/// 64 MiB, the morsel consolidation target a `Connection` aims for when a
/// connector doesn't otherwise dictate batch size.
pub const DEFAULT_PAGE_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `(prefix, connector id)` pairs consulted longest-prefix-first when a
    /// relation name doesn't start with `$`. Forwarded into the
    /// `ConnectorRegistry` a `Connection` builds at construction time.
    pub dataset_prefix_mapping: Vec<(String, String)>,
    /// Date-partitioning scheme name a `Partitionable` connector interprets
    /// its `start_date`/`end_date` hints against. `None` disables
    /// partition-aware scan rewriting.
    pub partition_scheme: Option<String>,
    pub max_cache_evictions: u32,
    pub max_size_single_cache_item: usize,
    pub local_buffer_pool_size: usize,
    pub page_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            dataset_prefix_mapping: Vec::new(),
            partition_scheme: None,
            max_cache_evictions: 25,
            max_size_single_cache_item: 8 * 1024 * 1024,
            local_buffer_pool_size: 256,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_cache_evictions, 25);
        assert_eq!(config.local_buffer_pool_size, 256);
        assert_eq!(config.page_size, 64 * 1024 * 1024);
    }

    #[test]
    fn round_trips_through_json() {
        let config = SessionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_cache_evictions, config.max_cache_evictions);
    }
}
