use keva_store::StoreResult;
use keva_types::derive::{decode_base58check, encode_base58check};
use keva_types::{Entry, Height, Key, NamespaceId, Outpoint, TxUndo, Value};
use log::trace;

use crate::notifier::Notifier;
use crate::tx::Transaction;
use crate::validator::{ValidatedOp, ValidatedTx};
use crate::view::{CacheView, View};

/// Per-block undo log: a vector preserving insertion order, replayed in
/// reverse on disconnection (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct BlockUndo(pub Vec<TxUndo>);

impl BlockUndo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tx_undo: TxUndo) {
        self.0.push(tx_undo);
    }

    pub fn undo_all(&self, view: &mut CacheView) {
        for tx_undo in self.0.iter().rev() {
            Applier::undo_tx(tx_undo, view);
        }
    }
}

/// Mutates a `Cache` (via its topmost `CacheView`) given a validated
/// transaction, and records per-op undo data into the block-level undo
/// log (spec §2 component 6, §4.6). Modeled on the teacher's virtual
/// processor applying a populated UTXO diff, narrowed to the keva record
/// families this core owns.
pub struct Applier;

impl Applier {
    pub fn apply_tx(tx: &Transaction, validated: &ValidatedTx, height: Height, view: &mut CacheView, block_undo: &mut BlockUndo, notifier: &Notifier) -> StoreResult<()> {
        let (ns, key, new_value, is_registration) = match &validated.op {
            ValidatedOp::NamespaceRegister { ns, display_name } => (ns.clone(), Key::namespace_display_name(), Some(display_name.clone()), true),
            ValidatedOp::Put { ns, key, value } => (ns.clone(), key.clone(), Some(value.clone()), false),
            ValidatedOp::Delete { ns, key } => (ns.clone(), key.clone(), None, false),
        };

        let old_entry = view.get(&ns, &key)?;
        let is_new = old_entry.is_none();
        block_undo.push(TxUndo::new(ns.clone(), key.clone(), is_new, old_entry.clone()));

        let ns_encoded = encode_base58check(&ns);
        let mut written_entry = None;

        match new_value {
            None => {
                if old_entry.is_some() {
                    view.delete(ns.clone(), key.clone());
                    trace!("KeyDeleted ns={ns_encoded} key={key}", key = String::from_utf8_lossy(key.as_ref()));
                    notifier.key_deleted(tx.hash, height, &ns_encoded, key.as_ref());
                }
            }
            Some(value) => {
                let entry = Entry::new(value.clone(), height, Outpoint::new(tx.hash, validated.out_index as u32));
                view.set(ns.clone(), key.clone(), entry.clone());
                if is_registration {
                    trace!("NamespaceCreated ns={ns_encoded}");
                    notifier.namespace_created(tx.hash, height, &ns_encoded);
                } else {
                    trace!("KeyUpdated ns={ns_encoded} key={key}", key = String::from_utf8_lossy(key.as_ref()));
                    notifier.key_updated(tx.hash, height, &ns_encoded, key.as_ref(), value.as_ref());
                }
                written_entry = Some(entry);
            }
        }

        apply_association_delta(&ns, &key, written_entry, view);
        Ok(())
    }

    /// Reverses a single `TxUndo` record (spec §4.6): `is_new` entries are
    /// deleted back out (tolerating absence); others are restored to their
    /// recorded prior value.
    pub fn undo_tx(tx_undo: &TxUndo, view: &mut CacheView) {
        reverse_association_delta(&tx_undo.ns, &tx_undo.key, tx_undo.old_entry.as_ref(), view);
        if tx_undo.is_new {
            view.delete(tx_undo.ns.clone(), tx_undo.key.clone());
        } else {
            let old_entry = tx_undo.old_entry.clone().expect("old_entry is populated whenever is_new is false");
            view.set(tx_undo.ns.clone(), tx_undo.key.clone(), old_entry);
        }
    }
}

/// An association is a materialized view over a single `_g:<target>` key's
/// entry: present exactly when that entry exists with a non-empty value.
/// Reusing that equivalence means the "parallel undo entry" spec §4.6
/// calls for needs no separate on-disk record — the same `old_entry`
/// already carried by `TxUndo` is sufficient to recompute the prior
/// association state, via `reverse_association_delta` below.
fn apply_association_delta(ns: &NamespaceId, key: &Key, written_entry: Option<Entry>, view: &mut CacheView) {
    let Some(target) = resolve_association_target(key) else { return };
    match written_entry {
        Some(entry) if !entry.value.as_ref().is_empty() => view.associate(target, ns.clone(), entry),
        _ => view.disassociate(target, ns.clone()),
    }
}

fn reverse_association_delta(ns: &NamespaceId, key: &Key, old_entry: Option<&Entry>, view: &mut CacheView) {
    let Some(target) = resolve_association_target(key) else { return };
    match old_entry {
        Some(entry) if !entry.value.as_ref().is_empty() => view.associate(target, ns.clone(), entry.clone()),
        _ => view.disassociate(target, ns.clone()),
    }
}

fn resolve_association_target(key: &Key) -> Option<NamespaceId> {
    decode_base58check(key.association_target()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::StoreView;
    use keva_store::{Store, DEFAULT_CACHE_SIZE};
    use keva_types::ChainParams;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), DEFAULT_CACHE_SIZE).unwrap();
        (dir, store)
    }

    fn registration(ns: NamespaceId, display_name: &str) -> ValidatedTx {
        ValidatedTx { out_index: 0, op: ValidatedOp::NamespaceRegister { ns, display_name: Value::new(display_name.as_bytes().to_vec()).unwrap() } }
    }

    fn put(ns: NamespaceId, key: &str, value: &str) -> ValidatedTx {
        ValidatedTx { out_index: 0, op: ValidatedOp::Put { ns, key: Key::new(key.as_bytes().to_vec()).unwrap(), value: Value::new(value.as_bytes().to_vec()).unwrap() } }
    }

    fn delete(ns: NamespaceId, key: &str) -> ValidatedTx {
        ValidatedTx { out_index: 0, op: ValidatedOp::Delete { ns, key: Key::new(key.as_bytes().to_vec()).unwrap() } }
    }

    fn tx(hash: [u8; 32]) -> Transaction {
        Transaction { hash, is_kevacoin: true, inputs: Vec::new(), outputs: Vec::new() }
    }

    #[test]
    fn put_then_undo_restores_prior_absence() {
        let (_dir, store) = temp_store();
        let store_view = StoreView::new(&store);
        let mut cache_view = CacheView::new(&store_view);
        let notifier = Notifier::new();
        let ns = NamespaceId::new(b"ns".to_vec()).unwrap();

        let validated = put(ns.clone(), "k", "v");
        let mut undo = BlockUndo::new();
        Applier::apply_tx(&tx([1u8; 32]), &validated, 10, &mut cache_view, &mut undo, &notifier).unwrap();
        assert_eq!(cache_view.cache.get(&ns, &Key::new(b"k".to_vec()).unwrap()).unwrap().value.as_ref(), b"v");

        undo.undo_all(&mut cache_view);
        assert_eq!(cache_view.cache.get(&ns, &Key::new(b"k".to_vec()).unwrap()), None);
        assert!(cache_view.cache.is_deleted(&ns, &Key::new(b"k".to_vec()).unwrap()));
    }

    #[test]
    fn delete_then_undo_restores_old_value() {
        let (_dir, store) = temp_store();
        let ns = NamespaceId::new(b"ns".to_vec()).unwrap();
        let key = Key::new(b"k".to_vec()).unwrap();

        // Seed the store with an existing entry, as if a prior block had put it.
        let mut batch = keva_store::StoreBatch::default();
        batch.entries.push(keva_store::EntryWrite::Set { ns: ns.clone(), key: key.as_ref().to_vec(), entry: Entry::new(Value::new(b"old".to_vec()).unwrap(), 5, Outpoint::new([9u8; 32], 0)) });
        store.commit_batch(batch).unwrap();

        let store_view = StoreView::new(&store);
        let mut cache_view = CacheView::new(&store_view);
        let notifier = Notifier::new();

        let validated = delete(ns.clone(), "k");
        let mut undo = BlockUndo::new();
        Applier::apply_tx(&tx([2u8; 32]), &validated, 11, &mut cache_view, &mut undo, &notifier).unwrap();
        assert_eq!(cache_view.cache.get(&ns, &key), None);
        assert!(cache_view.cache.is_deleted(&ns, &key));

        undo.undo_all(&mut cache_view);
        assert_eq!(cache_view.cache.get(&ns, &key).unwrap().value.as_ref(), b"old");
    }

    #[test]
    fn put_association_key_materializes_and_undoes_the_link() {
        let (_dir, store) = temp_store();
        let store_view = StoreView::new(&store);
        let mut cache_view = CacheView::new(&store_view);
        let notifier = Notifier::new();

        let params = ChainParams::regtest();
        let initiator = NamespaceId::new(b"initiator".to_vec()).unwrap();
        let target = keva_types::derive::derive_namespace(&params, &[4u8; 32], 0, true);
        let association_key = format!("_g:{}", encode_base58check(&target));

        let validated = put(initiator.clone(), &association_key, "assoc");
        let mut undo = BlockUndo::new();
        Applier::apply_tx(&tx([3u8; 32]), &validated, 12, &mut cache_view, &mut undo, &notifier).unwrap();

        assert!(cache_view.cache.get_association(&target, &initiator).is_some());

        undo.undo_all(&mut cache_view);
        assert!(cache_view.cache.get_association(&target, &initiator).is_none());
        assert!(cache_view.cache.is_disassociated(&target, &initiator));
    }
}
