use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::vec::IntoIter;

use keva_types::{Entry, Key, NamespaceId};

use crate::cache::Cache;

/// Streams `(Key, Entry)` pairs for one namespace in lexicographic key
/// order, merging a cache diff over a store snapshot the way `Cache::apply`
/// merges two caches (spec §4.3): on a key present in both, the cache's
/// value supersedes the store's; a key the cache tombstoned is skipped
/// entirely even though it is still physically present in the store
/// snapshot. Modeled on the layered-collection merge in
/// `consensus/core/src/utxo/utxo_diff.rs`, adapted from a UTXO set diff to
/// a namespace key-value diff.
///
/// Built from the store's already-sorted snapshot and the cache's
/// already-sorted `BTreeMap` range for the namespace — both sides are
/// consumed by two peekable cursors walked in lockstep, so the merge itself
/// never re-sorts or re-allocates beyond the two cloned input vectors.
pub struct MergedIterator {
    store: Peekable<IntoIter<(Key, Entry)>>,
    cache: Peekable<IntoIter<(Key, Entry)>>,
    deleted: BTreeSet<Key>,
}

impl MergedIterator {
    /// `store_entries` must already be sorted by `Key` (as returned by
    /// `Store::iterate_keys`); this constructor does not re-sort it.
    pub fn new(store_entries: Vec<(Key, Entry)>, cache: &Cache, ns: &NamespaceId) -> Self {
        let mut cache_entries: Vec<(Key, Entry)> = cache.entries_in(ns).map(|(k, e)| (k.clone(), e.clone())).collect();
        cache_entries.sort_by(|a, b| a.0.cmp(&b.0));
        let deleted: BTreeSet<Key> = cache.deleted_in(ns).cloned().collect();
        Self { store: store_entries.into_iter().peekable(), cache: cache_entries.into_iter().peekable(), deleted }
    }
}

impl Iterator for MergedIterator {
    type Item = (Key, Entry);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match (self.store.peek(), self.cache.peek()) {
                (None, None) => None,
                (Some(_), None) => match self.next_from_store() {
                    Some(item) => Some(item),
                    None => continue,
                },
                (None, Some(_)) => self.cache.next(),
                (Some((store_key, _)), Some((cache_key, _))) => match store_key.cmp(cache_key) {
                    Ordering::Less => match self.next_from_store() {
                        Some(item) => Some(item),
                        None => continue,
                    },
                    Ordering::Greater => self.cache.next(),
                    Ordering::Equal => {
                        self.store.next();
                        self.cache.next()
                    }
                },
            };
        }
    }
}

impl MergedIterator {
    fn next_from_store(&mut self) -> Option<(Key, Entry)> {
        let (key, entry) = self.store.next().expect("caller only invokes this when store.peek() is Some");
        if self.deleted.contains(&key) {
            None
        } else {
            Some((key, entry))
        }
    }
}
