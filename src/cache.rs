//! Thread-safe cache with optional TTL-based expiration

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A cache entry with an optional expiry
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// Generic thread-safe cache
///
/// With a TTL, entries expire after the configured duration and are removed
/// when next accessed; without one they live until invalidated or cleared.
#[derive(Debug)]
pub struct Cache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Option<Duration>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self::with_ttl(Some(ttl))
    }

    /// Create a cache whose entries never expire
    pub fn unbounded() -> Self {
        Self::with_ttl(None)
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a value if present and not expired
    ///
    /// Expired entries are removed during this operation.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.remove_if_expired(key).await;
        None
    }

    /// Store a value, replacing any previous one
    pub async fn set(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry::new(value, self.ttl));
    }

    /// Remove one entry; true if it existed
    pub async fn invalidate(&self, key: &K) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    /// Remove every entry matching `pred`
    pub async fn invalidate_where(&self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !pred(key));
        before - entries.len()
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    async fn remove_if_expired(&self, key: &K) {
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
        }
    }

    /// Drop all expired entries, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
