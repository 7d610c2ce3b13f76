//! Tick-based expiring map.
//!
//! Time is the host's tick counter, passed in by the caller; the cache never
//! reads a clock. Expired entries stay in the map until
//! [`ExpiringCache::evict_expired`] hands them back, so the owner can run
//! cleanup for them.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::core::Tick;

struct Entry<V> {
    value: V,
    expires_at: Tick,
}

/// Map whose entries expire `ttl` ticks after they were last written.
pub struct ExpiringCache<K, V> {
    ttl: u64,
    entries: FxHashMap<K, Entry<V>>,
}

impl<K: Eq + Hash + Clone, V> ExpiringCache<K, V> {
    pub fn new(ttl: u64) -> Self {
        Self {
            ttl,
            entries: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Live value for `key` at `now`.
    #[must_use]
    pub fn get(&self, key: &K, now: Tick) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| &entry.value)
    }

    /// Value for `key` whether or not it has expired.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Store `value`, restarting its TTL. Returns the previous value, expired or not.
    pub fn insert(&mut self, key: K, value: V, now: Tick) -> Option<V> {
        let expires_at = now.after(self.ttl);
        self.entries
            .insert(key, Entry { value, expires_at })
            .map(|entry| entry.value)
    }

    /// Restart the TTL of `key` without replacing its value. `false` if absent.
    pub fn touch(&mut self, key: &K, now: Tick) -> bool {
        let expires_at = now.after(self.ttl);
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Remove and return every entry expired at `now`.
    pub fn evict_expired(&mut self, now: Tick) -> Vec<(K, V)> {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| {
                let entry = self.entries.remove(&key)?;
                Some((key, entry.value))
            })
            .collect()
    }

    /// Every key, expired or not.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> std::fmt::Debug for ExpiringCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("ttl", &self.ttl)
            .field("len", &self.entries.len())
            .finish()
    }
}
