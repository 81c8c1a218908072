use std::cmp::Ordering;
use std::collections::BTreeSet;

use keva_store::{Store, StoreBatch, StoreResult};
use keva_types::{Entry, Key, NamespaceId, Outpoint};

use crate::cache::Cache;
use crate::merged_iterator::MergedIterator;

/// The layered read interface the validator and query paths see (spec
/// §4.7): `CacheView → [CacheView …] → StoreView`. Reads walk the stack
/// top-down, stopping at the first hit or tombstone; this trait is what
/// lets the Applier and the RPC-facing query layer share code regardless
/// of how many speculative caches sit above the persistent store. Modeled
/// on the teacher's `UtxoView` trait (`consensus/core/src/utxo/utxo_view.rs`),
/// narrowed to the keva record families.
pub trait View {
    fn get(&self, ns: &NamespaceId, key: &Key) -> StoreResult<Option<Entry>>;
    fn get_association(&self, from: &NamespaceId, to: &NamespaceId) -> StoreResult<Option<Entry>>;
    fn iterate_keys(&self, ns: &NamespaceId) -> StoreResult<Vec<(Key, Entry)>>;
    fn iterate_associations(&self, ns: &NamespaceId) -> StoreResult<Vec<(NamespaceId, Entry)>>;
    fn get_best_block(&self) -> StoreResult<Option<[u8; 32]>>;
}

/// The bottom of the stack: a read-only window onto the persistent store.
/// Committing a flushed cache back through the store happens via
/// `StoreView::commit`, not through the `View` trait itself, since commit
/// also needs the caller's coin diff and new best-block hash (spec §4.7) —
/// concerns the keva-only `View` trait has no business naming.
pub struct StoreView<'s> {
    store: &'s Store,
}

impl<'s> StoreView<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Batches `cache`'s accumulated diff together with the new best-block
    /// hash into the single atomic write described in spec §4.7/§3
    /// invariant 5. The coin diff is an external collaborator's concern
    /// (spec §1 scope boundary) and is committed by that collaborator
    /// through its own store, not through this call.
    pub fn commit(&self, cache: &Cache, best_block: [u8; 32], height: u32) -> StoreResult<()> {
        let mut batch = StoreBatch::default();
        cache.write_batch(&mut batch);
        batch.best_block = Some(best_block);
        batch.height = Some(height);
        self.store.commit_batch(batch)
    }
}

impl View for StoreView<'_> {
    fn get(&self, ns: &NamespaceId, key: &Key) -> StoreResult<Option<Entry>> {
        self.store.get(ns, key)
    }

    fn get_association(&self, from: &NamespaceId, to: &NamespaceId) -> StoreResult<Option<Entry>> {
        self.store.get_association(from, to)
    }

    fn iterate_keys(&self, ns: &NamespaceId) -> StoreResult<Vec<(Key, Entry)>> {
        self.store.iterate_keys(ns)
    }

    fn iterate_associations(&self, ns: &NamespaceId) -> StoreResult<Vec<(NamespaceId, Entry)>> {
        self.store.iterate_associations(ns)
    }

    fn get_best_block(&self) -> StoreResult<Option<[u8; 32]>> {
        self.store.get_best_block()
    }
}

/// A single speculative layer over a parent `View`. Writes (`set`,
/// `delete`, `associate`, `disassociate`) mutate only this layer's own
/// `Cache`; reads fall through to the parent on a miss and stop short on a
/// tombstone, exactly as spec §4.7 requires. `cache` is public so an
/// `Applier` can record undo data alongside each mutation without this
/// type growing undo-awareness of its own.
pub struct CacheView<'p> {
    pub cache: Cache,
    parent: &'p dyn View,
}

impl<'p> CacheView<'p> {
    pub fn new(parent: &'p dyn View) -> Self {
        Self { cache: Cache::new(), parent }
    }

    pub fn set(&mut self, ns: NamespaceId, key: Key, entry: Entry) {
        self.cache.set(ns, key, entry);
    }

    pub fn delete(&mut self, ns: NamespaceId, key: Key) {
        self.cache.remove(ns, key);
    }

    pub fn associate(&mut self, from: NamespaceId, to: NamespaceId, entry: Entry) {
        self.cache.associate(from, to, entry);
    }

    pub fn disassociate(&mut self, from: NamespaceId, to: NamespaceId) {
        self.cache.disassociate(from, to);
    }

    /// Pops this layer's diff into its parent cache (spec §4.7: "Flushing
    /// pops a cache into its parent via `Cache::apply`").
    pub fn flush_into(self, parent_cache: &mut Cache) {
        parent_cache.apply(&self.cache);
    }
}

impl<'p> View for CacheView<'p> {
    fn get(&self, ns: &NamespaceId, key: &Key) -> StoreResult<Option<Entry>> {
        if self.cache.is_deleted(ns, key) {
            return Ok(None);
        }
        if let Some(entry) = self.cache.get(ns, key) {
            return Ok(Some(entry));
        }
        self.parent.get(ns, key)
    }

    fn get_association(&self, from: &NamespaceId, to: &NamespaceId) -> StoreResult<Option<Entry>> {
        if self.cache.is_disassociated(from, to) {
            return Ok(None);
        }
        if let Some(entry) = self.cache.get_association(from, to) {
            return Ok(Some(entry));
        }
        self.parent.get_association(from, to)
    }

    /// Delegates the parent-side merge to `MergedIterator`, reusing it one
    /// layer at a time: the parent already returns its own fully-merged,
    /// sorted view, so folding this layer's cache on top handles a stack of
    /// any depth without this type needing to know how deep it is.
    fn iterate_keys(&self, ns: &NamespaceId) -> StoreResult<Vec<(Key, Entry)>> {
        let parent_entries = self.parent.iterate_keys(ns)?;
        Ok(MergedIterator::new(parent_entries, &self.cache, ns).collect())
    }

    fn iterate_associations(&self, ns: &NamespaceId) -> StoreResult<Vec<(NamespaceId, Entry)>> {
        let parent_associations = self.parent.iterate_associations(ns)?;
        Ok(merge_associations(parent_associations, &self.cache, ns))
    }

    fn get_best_block(&self) -> StoreResult<Option<[u8; 32]>> {
        self.parent.get_best_block()
    }
}

/// `MergedIterator`'s sibling for the association bucket: same streaming
/// merge, keyed by target namespace rather than by `Key`.
fn merge_associations(mut store: Vec<(NamespaceId, Entry)>, cache: &Cache, ns: &NamespaceId) -> Vec<(NamespaceId, Entry)> {
    let disassociated: BTreeSet<NamespaceId> = cache.disassociations_in(ns).cloned().collect();
    store.retain(|(to, _)| !disassociated.contains(to));

    let mut cache_entries: Vec<(NamespaceId, Entry)> = cache.associations_in(ns).map(|(to, e)| (to.clone(), e.clone())).collect();
    cache_entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::with_capacity(store.len() + cache_entries.len());
    let mut store_iter = store.into_iter().peekable();
    let mut cache_iter = cache_entries.into_iter().peekable();
    loop {
        match (store_iter.peek(), cache_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => out.push(store_iter.next().unwrap()),
            (None, Some(_)) => out.push(cache_iter.next().unwrap()),
            (Some((store_to, _)), Some((cache_to, _))) => match store_to.cmp(cache_to) {
                Ordering::Less => out.push(store_iter.next().unwrap()),
                Ordering::Greater => out.push(cache_iter.next().unwrap()),
                Ordering::Equal => {
                    store_iter.next();
                    out.push(cache_iter.next().unwrap());
                }
            },
        }
    }
    out
}

/// The coin input/output collaborator the core treats as opaque (spec §1
/// scope boundary, §4.5 structural rules): the validator only needs to
/// know whether an outpoint is spent, and its value and script, never how
/// the UTXO set backing it is stored or indexed.
pub trait CoinView {
    fn get_coin(&self, outpoint: &Outpoint) -> Option<Coin>;
}

#[derive(Debug, Clone)]
pub struct Coin {
    pub script_pubkey: Vec<u8>,
    pub value: u64,
    pub is_coinbase: bool,
}
