use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use std::hash::Hash;
use std::sync::Arc;

/// A bounded read-through cache in front of rocksdb point lookups, keyed by
/// the already-decoded `(NamespaceId, Key)` pair. Eviction picks a random
/// occupant rather than tracking LRU order — `IndexMap::swap_remove_index`
/// makes that O(1), the same trade-off `kaspa-database::cache::Cache` makes
/// for its `CachePolicy::Unit` mode.
#[derive(Clone)]
pub struct ReadCache<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    inner: Arc<RwLock<IndexMap<K, V>>>,
    capacity: usize,
}

impl<K, V> ReadCache<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(RwLock::new(IndexMap::with_capacity(capacity))), capacity }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut guard = self.inner.write();
        if guard.len() >= self.capacity && !guard.contains_key(&key) {
            let victim = rand::thread_rng().gen_range(0..guard.len());
            guard.swap_remove_index(victim);
        }
        guard.insert(key, value);
    }

    pub fn remove(&self, key: &K) {
        self.inner.write().swap_remove(key);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
