//! The read-through blob cache (§4.7, §9): single-flight per
//! `(connector_id, blob_name)`, with a per-connector consecutive-failure
//! counter that permanently disables caching for a connector once it trips.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use flint_error::{EngineError, ErrorKind, Result};

/// Disable caching for a connector after this many consecutive read
/// failures. There is no automatic re-enable (§4.7): a connector that trips
/// the breaker stays uncached until the process restarts.
const FAILURE_THRESHOLD: u32 = 10;

type CacheKey = (String, String);

/// A single-flight, process-wide read-through cache for connector blob
/// reads. Multiple concurrent readers asking for the same key block on one
/// underlying fetch rather than racing duplicate reads, via
/// `OnceCell::get_or_try_init`.
#[derive(Default, Debug)]
pub struct ReadThroughCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<Vec<u8>>>>>,
    failures: Mutex<HashMap<String, u32>>,
    disabled: Mutex<std::collections::HashSet<String>>,
}

impl ReadThroughCache {
    pub fn new() -> Self {
        ReadThroughCache {
            entries: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            disabled: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Whether `connector_id` has tripped the failure breaker. Callers
    /// should fall back to reading straight through the connector without
    /// caching the result.
    pub fn is_disabled(&self, connector_id: &str) -> bool {
        self.disabled.lock().contains(connector_id)
    }

    /// Fetch `blob_name` from `connector_id`, calling `fetch` at most once
    /// per key no matter how many callers race on it. A failed fetch is not
    /// cached (so the next caller retries it), but counts toward the
    /// connector's consecutive-failure total.
    pub fn get_or_fetch(
        &self,
        connector_id: &str,
        blob_name: &str,
        fetch: impl FnOnce() -> Result<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let key = (connector_id.to_string(), blob_name.to_string());
        let cell = {
            let mut entries = self.entries.lock();
            entries.entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        let result = cell.get_or_try_init(fetch);
        match result {
            Ok(bytes) => {
                self.failures.lock().remove(connector_id);
                Ok(bytes.clone())
            }
            Err(err) => {
                self.record_failure(connector_id);
                Err(EngineError::new(
                    ErrorKind::InvalidInternalState,
                    format!("blob read failed for '{connector_id}:{blob_name}': {err}"),
                ))
            }
        }
    }

    fn record_failure(&self, connector_id: &str) {
        let mut failures = self.failures.lock();
        let count = failures.entry(connector_id.to_string()).or_insert(0);
        *count += 1;
        if *count >= FAILURE_THRESHOLD {
            self.disabled.lock().insert(connector_id.to_string());
            tracing::warn!(connector_id, "disabling read-through cache after {FAILURE_THRESHOLD} consecutive failures");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn successful_fetch_is_cached() {
        let cache = ReadThroughCache::new();
        let calls = AtomicU32::new(0);
        for _ in 0..5 {
            let result = cache.get_or_fetch("s3", "blob.parquet", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            });
            assert_eq!(result.unwrap(), vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_fetch_independently() {
        let cache = ReadThroughCache::new();
        let a = cache.get_or_fetch("s3", "a", || Ok(vec![1]));
        let b = cache.get_or_fetch("s3", "b", || Ok(vec![2]));
        assert_eq!(a.unwrap(), vec![1]);
        assert_eq!(b.unwrap(), vec![2]);
    }

    #[test]
    fn connector_disables_after_threshold_failures() {
        let cache = ReadThroughCache::new();
        for i in 0..FAILURE_THRESHOLD {
            let blob = format!("blob-{i}");
            let _ = cache.get_or_fetch("flaky", &blob, || {
                Err(EngineError::internal("boom"))
            });
        }
        assert!(cache.is_disabled("flaky"));
    }

    #[test]
    fn connector_stays_enabled_below_threshold() {
        let cache = ReadThroughCache::new();
        for i in 0..FAILURE_THRESHOLD - 1 {
            let blob = format!("blob-{i}");
            let _ = cache.get_or_fetch("flaky", &blob, || {
                Err(EngineError::internal("boom"))
            });
        }
        assert!(!cache.is_disabled("flaky"));
    }
}
