//! Read-through cache for repeated remote lookups

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use uuid::Uuid;

use super::{ListInfo, UserRecord};

/// A keyed read-through cache.
///
/// Reads take the shared lock. Two callers missing on the same key both
/// compute the value and the later write wins; values for one key are
/// expected to be equal, so the overwrite is harmless.
#[derive(Debug)]
pub struct ReadThrough<K, V> {
    enabled: bool,
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> ReadThrough<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if !self.enabled {
            return None;
        }
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    pub fn insert(&self, key: K, value: V) {
        if !self.enabled {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, value);
        }
    }

    /// Cached value, or compute and remember it. Errors are not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caches shared by all content units of one transformation run
#[derive(Debug)]
pub struct LookupCache {
    /// Keyed by [`UserQuery::cache_key`](super::UserQuery::cache_key)
    pub users: ReadThrough<String, Vec<UserRecord>>,
    pub lists: ReadThrough<Uuid, Option<ListInfo>>,
    /// Lowercased source path to the path of the transferred copy
    pub assets: ReadThrough<String, String>,
}

impl LookupCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            users: ReadThrough::new(enabled),
            lists: ReadThrough::new(enabled),
            assets: ReadThrough::new(enabled),
        }
    }

    /// Pass-through cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(false)
    }
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new(true)
    }
}
