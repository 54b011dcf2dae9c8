//! Memoized scan cache with fixed time-to-live.
//!
//! One `Mutex` around a plain map. Entries expire by age only — there is no
//! size cap and no background sweep; [`ScanCache::clear_expired`] is the
//! explicit purge the admin endpoint triggers. Concurrent misses on the same
//! key may each recompute; the last `store` wins.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Full identity of one scan request. Requests differing in any field are
/// distinct cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanKey {
    pub birth_date: String,
    pub year: i32,
    pub single_digit: bool,
    pub include_zodiac: bool,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    created: Instant,
}

/// TTL key-value store for computed scan results.
///
/// Owned explicitly and injected into request handlers (never a module
/// singleton), so tests get a fresh store each.
#[derive(Debug)]
pub struct ScanCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<ScanKey, Entry<V>>>,
}

impl<V: Clone> ScanCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ScanKey, Entry<V>>> {
        // A poisoned lock means a panic mid-operation; the map itself is
        // still coherent, so keep serving rather than cascading the panic.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the stored value verbatim while its age is within the TTL.
    /// Expired entries behave as misses and stay put until the next sweep.
    pub fn lookup(&self, key: &ScanKey) -> Option<V> {
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| entry.created.elapsed() <= self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Insert or overwrite `key` with a fresh timestamp.
    pub fn store(&self, key: ScanKey, value: V) {
        let mut entries = self.lock();
        entries.insert(
            key,
            Entry {
                value,
                created: Instant::now(),
            },
        );
    }

    /// Drop every entry older than the TTL; unexpired entries are untouched.
    /// Returns the number of removed entries.
    pub fn clear_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.created.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
