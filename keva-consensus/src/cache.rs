use std::collections::{BTreeMap, BTreeSet};

use keva_store::{EntryWrite, StoreBatch};
use keva_types::{Entry, Key, NamespaceId};

type EntryKey = (NamespaceId, Key);
type AssociationKey = (NamespaceId, NamespaceId);

/// An in-memory diff over the persistent `Store` (spec §2 component 3,
/// §4.2). Created per block (or per speculative evaluation), mutated only
/// by its owner, and either discarded or merged into a parent `Cache` /
/// flushed to the store. `BTreeMap`/`BTreeSet` are the idiomatic
/// realization of the spec's `OrderedMap`/`OrderedSet` — they keep
/// `entries` and `associations` walkable in the same lexicographic
/// `(namespace, key)` order the `MergedIterator` requires.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    entries: BTreeMap<EntryKey, Entry>,
    deleted: BTreeSet<EntryKey>,
    associations: BTreeMap<AssociationKey, Entry>,
    disassociations: BTreeSet<AssociationKey>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, ns: NamespaceId, key: Key, entry: Entry) {
        let cache_key = (ns, key);
        self.deleted.remove(&cache_key);
        self.entries.insert(cache_key, entry);
    }

    pub fn remove(&mut self, ns: NamespaceId, key: Key) {
        let cache_key = (ns, key);
        self.entries.remove(&cache_key);
        self.deleted.insert(cache_key);
    }

    pub fn associate(&mut self, from: NamespaceId, to: NamespaceId, entry: Entry) {
        let cache_key = (from, to);
        self.disassociations.remove(&cache_key);
        self.associations.insert(cache_key, entry);
    }

    pub fn disassociate(&mut self, from: NamespaceId, to: NamespaceId) {
        let cache_key = (from, to);
        self.associations.remove(&cache_key);
        self.disassociations.insert(cache_key);
    }

    /// Returns a cached entry if any; does not consult the store and does
    /// not report a cached deletion as anything — a tombstoned key reads as
    /// `None` here exactly as it would for a key this cache never touched.
    /// Callers wanting merged (store + cache + tombstone) semantics go
    /// through the `View` stack or the `MergedIterator` (spec §4.2).
    pub fn get(&self, ns: &NamespaceId, key: &Key) -> Option<Entry> {
        self.entries.get(&(ns.clone(), key.clone())).cloned()
    }

    pub fn get_association(&self, from: &NamespaceId, to: &NamespaceId) -> Option<Entry> {
        self.associations.get(&(from.clone(), to.clone())).cloned()
    }

    pub fn is_deleted(&self, ns: &NamespaceId, key: &Key) -> bool {
        self.deleted.contains(&(ns.clone(), key.clone()))
    }

    pub fn is_disassociated(&self, from: &NamespaceId, to: &NamespaceId) -> bool {
        self.disassociations.contains(&(from.clone(), to.clone()))
    }

    pub fn entries_in(&self, ns: &NamespaceId) -> impl Iterator<Item = (&Key, &Entry)> {
        self.entries.range((ns.clone(), Key::new_unchecked(keva_types::primitives::bytes_from(Vec::new())))..).take_while(move |((k_ns, _), _)| k_ns == ns).map(|((_, k), e)| (k, e))
    }

    pub fn deleted_in<'a>(&'a self, ns: &'a NamespaceId) -> impl Iterator<Item = &'a Key> + 'a {
        self.deleted.range((ns.clone(), Key::new_unchecked(keva_types::primitives::bytes_from(Vec::new())))..).take_while(move |(k_ns, _)| k_ns == ns).map(|(_, k)| k)
    }

    pub fn associations_in(&self, ns: &NamespaceId) -> impl Iterator<Item = (&NamespaceId, &Entry)> {
        self.associations
            .range((ns.clone(), NamespaceId::new_unchecked(keva_types::primitives::bytes_from(Vec::new())))..)
            .take_while(move |((k_ns, _), _)| k_ns == ns)
            .map(|((_, to), e)| (to, e))
    }

    pub fn disassociations_in<'a>(&'a self, ns: &'a NamespaceId) -> impl Iterator<Item = &'a NamespaceId> + 'a {
        self.disassociations
            .range((ns.clone(), NamespaceId::new_unchecked(keva_types::primitives::bytes_from(Vec::new())))..)
            .take_while(move |(k_ns, _)| k_ns == ns)
            .map(|(_, to)| to)
    }

    /// Deterministically merges `other` into `self` by replaying, in
    /// order: `other`'s entries (as `set`), `other`'s associations (as
    /// `associate`), `other`'s deletions (as `remove`), `other`'s
    /// disassociations (as `disassociate`). This ordering is load-bearing
    /// (spec §4.2): a later `remove` inside `other` must tombstone a
    /// co-present `set` rather than the reverse.
    pub fn apply(&mut self, other: &Cache) {
        for ((ns, key), entry) in &other.entries {
            self.set(ns.clone(), key.clone(), entry.clone());
        }
        for ((from, to), entry) in &other.associations {
            self.associate(from.clone(), to.clone(), entry.clone());
        }
        for (ns, key) in &other.deleted {
            self.remove(ns.clone(), key.clone());
        }
        for (from, to) in &other.disassociations {
            self.disassociate(from.clone(), to.clone());
        }
    }

    /// Emits one write per `entries`/`associations` record and one erase
    /// per `deleted`/`disassociated` record into the store's atomic batch
    /// (spec §4.2, §4.7).
    pub fn write_batch(&self, batch: &mut StoreBatch) {
        for ((ns, key), entry) in &self.entries {
            batch.entries.push(EntryWrite::Set { ns: ns.clone(), key: key.as_ref().to_vec(), entry: entry.clone() });
        }
        for (ns, key) in &self.deleted {
            batch.entries.push(EntryWrite::Delete { ns: ns.clone(), key: key.as_ref().to_vec() });
        }
        for ((from, to), entry) in &self.associations {
            batch.associations.push(EntryWrite::Set { ns: from.clone(), key: to.as_ref().to_vec(), entry: entry.clone() });
        }
        for (from, to) in &self.disassociations {
            batch.associations.push(EntryWrite::Delete { ns: from.clone(), key: to.as_ref().to_vec() });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.deleted.is_empty() && self.associations.is_empty() && self.disassociations.is_empty()
    }
}
