//! Process-wide TTL cache for computed results.
//!
//! One table, one TTL check. Values are type-erased and cloned out on hit.
//! The lock is not held while computing, so concurrent misses on the same
//! key may both compute; the later write wins.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::errors::EngineResult;

/// Time source for entry ages.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    written_at: Instant,
}

/// Shared handle to the cache. Clones share the same table.
#[derive(Clone)]
pub struct ResultCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.lock().len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    /// Default TTL for callers that do not pick their own.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live value for `key`, or compute, store and return it.
    /// Failed computations are not cached.
    pub fn get_or_compute<T, F>(&self, key: &str, ttl: Duration, compute: F) -> EngineResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> EngineResult<T>,
    {
        let now = self.clock.now();
        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(key) {
                if now.saturating_duration_since(entry.written_at) < ttl {
                    if let Some(value) = entry.value.downcast_ref::<T>() {
                        debug!(key, "Cache hit");
                        return Ok(value.clone());
                    }
                }
            }
        }

        debug!(key, "Cache miss");
        let value = compute()?;
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                value: Arc::new(value.clone()),
                written_at: self.clock.now(),
            },
        );
        Ok(value)
    }

    /// Empty the cache, returning how many entries were removed.
    pub fn flush(&self) -> usize {
        let removed = {
            let mut entries = self.entries.lock();
            let n = entries.len();
            entries.clear();
            n
        };
        info!(removed, "Result cache flushed");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use std::cell::Cell;

    const TTL: Duration = Duration::from_secs(300);

    fn cache() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ResultCache::with_clock(TTL, clock.clone()), clock)
    }

    #[test]
    fn test_computes_once_within_ttl() {
        let (cache, clock) = cache();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(vec![1, 2, 3])
        };

        assert_eq!(cache.get_or_compute("k", TTL, compute).unwrap(), vec![1, 2, 3]);
        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get_or_compute("k", TTL, compute).unwrap(), vec![1, 2, 3]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_recomputes_after_expiry() {
        let (cache, clock) = cache();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, EngineError>(calls.get())
        };

        assert_eq!(cache.get_or_compute("k", TTL, compute).unwrap(), 1);
        clock.advance(TTL);
        assert_eq!(cache.get_or_compute("k", TTL, compute).unwrap(), 2);
        assert_eq!(cache.get_or_compute("k", TTL, compute).unwrap(), 2);
    }

    #[test]
    fn test_flush_forces_recompute() {
        let (cache, _clock) = cache();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, EngineError>("value".to_string())
        };

        cache.get_or_compute("a", TTL, compute).unwrap();
        cache.get_or_compute("b", TTL, compute).unwrap();
        assert_eq!(cache.flush(), 2);
        assert!(cache.is_empty());
        cache.get_or_compute("a", TTL, compute).unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(cache.flush(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let (cache, _clock) = cache();
        let first: EngineResult<u32> =
            cache.get_or_compute("k", TTL, || Err(EngineError::EmptyPortfolio));
        assert!(first.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_compute("k", TTL, || Ok(7u32)).unwrap(), 7);
    }

    #[test]
    fn test_clones_share_the_table() {
        let (cache, _clock) = cache();
        let other = cache.clone();
        cache.get_or_compute("k", TTL, || Ok(1u8)).unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other.get_or_compute("k", TTL, || Ok(9u8)).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = ResultCache::new(TTL);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = cache.clone();
                std::thread::spawn(move || {
                    let key = format!("k{}", i % 4);
                    c.get_or_compute(&key, TTL, || Ok(i % 4)).unwrap()
                })
            })
            .collect();
        for h in handles {
            let v = h.join().unwrap();
            assert!(v < 4);
        }
        assert_eq!(cache.len(), 4);
    }
}
