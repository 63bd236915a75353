//! Time-windowed cache for fetched thread listings
//!
//! Process-wide, in-memory, purely time-based invalidation: entries expire
//! after a fixed TTL and are never invalidated by content.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::model::{SortOrder, Thread, TimeWindow};

/// Cache key for one listing request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub sort: SortOrder,
    pub window: TimeWindow,
    pub limit: u32,
}

struct CacheEntry {
    inserted_at: Instant,
    threads: Vec<Thread>,
}

/// TTL cache mapping `(sort, window, limit)` to the listing it returned
pub struct FetchCache {
    ttl: Duration,
    entries: Mutex<HashMap<FetchKey, CacheEntry>>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached listing for a key, if present and not expired.
    /// Expired entries are removed on access.
    pub fn get(&self, key: &FetchKey) -> Option<Vec<Thread>> {
        let mut entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                tracing::debug!(sort = %key.sort.as_str(), window = %key.window.as_str(), limit = key.limit, "Listing cache hit");
                Some(entry.threads.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: FetchKey, threads: Vec<Thread>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                threads,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::test_support::thread;

    fn key(limit: u32) -> FetchKey {
        FetchKey {
            sort: SortOrder::Top,
            window: TimeWindow::All,
            limit,
        }
    }

    #[test]
    fn hit_within_ttl_returns_same_threads() {
        let cache = FetchCache::new(Duration::from_secs(3600));
        cache.insert(key(5), vec![thread("a", "first"), thread("b", "second")]);

        let hit = cache.get(&key(5)).unwrap();
        assert_eq!(hit.len(), 2);
        assert_eq!(hit[0].id, "a");
    }

    #[test]
    fn different_key_misses() {
        let cache = FetchCache::new(Duration::from_secs(3600));
        cache.insert(key(5), vec![thread("a", "first")]);

        assert!(cache.get(&key(3)).is_none());
        assert!(cache
            .get(&FetchKey {
                sort: SortOrder::New,
                window: TimeWindow::All,
                limit: 5,
            })
            .is_none());
    }

    #[test]
    fn expired_entry_is_dropped() {
        let cache = FetchCache::new(Duration::from_millis(20));
        cache.insert(key(5), vec![thread("a", "first")]);

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&key(5)).is_none());
    }
}
