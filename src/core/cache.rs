use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Bounded TTL store with LRU eviction for request-keyed results.
///
/// Entries expire `ttl` after insertion regardless of reads; a hit moves the
/// key to the most-recently-used end without refreshing its TTL. All access
/// is serialized by a single mutex and the lock is never held across await
/// points.
pub struct TtlCache<V> {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<CacheInner<V>>,
}

struct CacheInner<V> {
    entries: HashMap<u64, Entry<V>>,
    /// Keys ordered LRU-first; holds exactly one slot per live entry.
    order: VecDeque<u64>,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner { entries: HashMap::new(), order: VecDeque::new() }),
        }
    }

    pub fn get(&self, key: u64) -> Option<V> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let fresh = match inner.entries.get(&key) {
            Some(entry) => entry.inserted_at.elapsed() < self.ttl,
            None => return None,
        };
        if !fresh {
            inner.entries.remove(&key);
            inner.order.retain(|k| *k != key);
            return None;
        }
        let value = inner.entries.get(&key).map(|entry| entry.value.clone());
        inner.touch(key);
        value
    }

    pub fn put(&self, key: u64, value: V) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        if inner.entries.insert(key, Entry { value, inserted_at: Instant::now() }).is_some() {
            inner.order.retain(|k| *k != key);
        }
        inner.order.push_back(key);

        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(lru) => {
                    inner.entries.remove(&lru);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V> CacheInner<V> {
    fn touch(&mut self, key: u64) {
        self.order.retain(|k| *k != key);
        self.order.push_back(key);
    }
}

/// Cache key: hash of (operation, domain-or-TOP scope, normalized filters).
pub fn cache_key(operation: &str, scope: &str, filters: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    operation.hash(&mut hasher);
    scope.hash(&mut hasher);
    filters.hash(&mut hasher);
    hasher.finish()
}
