//! End-to-end scenarios spanning Codec → Store → Cache/View → Validator →
//! Applier → Undo, using a real `tempfile`-backed rocksdb store (mirroring
//! `kaspa-database`'s temp-db test pattern) and an in-memory `CoinView`
//! stand-in for the external UTXO collaborator.

use std::cell::RefCell;
use std::collections::HashMap;

use keva_consensus::{Applier, BlockUndo, CacheView, Coin, CoinView, StoreView, Transaction, TxInput, TxOutput, Validator};
use keva_types::derive::{derive_namespace, encode_base58check};
use keva_types::{ChainParams, Entry, Height, Key, Outpoint, ValidationError, Value};

const OP_KEVA_NAMESPACE: u8 = 0xd1;
const OP_KEVA_PUT: u8 = 0xd2;
const OP_KEVA_DELETE: u8 = 0xd3;
const OP_2DROP: u8 = 0x6d;
const OP_DROP: u8 = 0x75;

fn push(bytes: &[u8]) -> Vec<u8> {
    let mut out = vec![bytes.len() as u8];
    out.extend_from_slice(bytes);
    out
}

fn namespace_script(ns: &[u8], display_name: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_KEVA_NAMESPACE];
    script.extend(push(ns));
    script.extend(push(display_name));
    script.push(OP_2DROP);
    script
}

fn put_script(ns: &[u8], key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_KEVA_PUT];
    script.extend(push(ns));
    script.extend(push(key));
    script.extend(push(value));
    script.push(OP_2DROP);
    script.push(OP_DROP);
    script
}

fn delete_script(ns: &[u8], key: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_KEVA_DELETE];
    script.extend(push(ns));
    script.extend(push(key));
    script.push(OP_2DROP);
    script
}

fn build_tx(hash: [u8; 32], prev_outpoint: Outpoint, value: u64, script_pubkey: Vec<u8>) -> Transaction {
    Transaction { hash, is_kevacoin: true, inputs: vec![TxInput { prev_outpoint }], outputs: vec![TxOutput { value, script_pubkey }] }
}

/// One-block-per-call harness backed by a real temp store, tracking the
/// coins spendable by a later tx the way an external UTXO set would.
struct Harness {
    store: keva_store::Store,
    params: ChainParams,
    coins: RefCell<HashMap<Outpoint, Coin>>,
    notifier: keva_consensus::Notifier,
}

impl Harness {
    fn new() -> (tempfile::TempDir, Self) {
        let dir = tempfile::tempdir().unwrap();
        let store = keva_store::Store::open(dir.path(), keva_store::DEFAULT_CACHE_SIZE).unwrap();
        (dir, Self { store, params: ChainParams::regtest(), coins: RefCell::new(HashMap::new()), notifier: keva_consensus::Notifier::new() })
    }

    /// Validates and applies `tx` as the sole transaction of a one-tx block
    /// at `height`, commits its effects, and registers its keva output (if
    /// any) as spendable for a later tx's input.
    fn apply_block(&self, tx: &Transaction, height: Height) -> BlockUndo {
        let validated = Validator::check_tx(tx, height, &self.params, self).unwrap().expect("tx carries a keva op");
        let store_view = StoreView::new(&self.store);
        let mut cache_view = CacheView::new(&store_view);
        let mut undo = BlockUndo::new();
        Applier::apply_tx(tx, &validated, height, &mut cache_view, &mut undo, &self.notifier).unwrap();
        store_view.commit(&cache_view.cache, [height as u8; 32], height).unwrap();

        let out_index = validated.out_index;
        self.coins.borrow_mut().insert(
            Outpoint::new(tx.hash, out_index as u32),
            Coin { script_pubkey: tx.outputs[out_index].script_pubkey.clone(), value: tx.outputs[out_index].value, is_coinbase: false },
        );
        undo
    }

    fn disconnect_block(&self, undo: &BlockUndo, disconnected_to_height: Height) {
        let store_view = StoreView::new(&self.store);
        let mut cache_view = CacheView::new(&store_view);
        undo.undo_all(&mut cache_view);
        store_view.commit(&cache_view.cache, [disconnected_to_height as u8; 32], disconnected_to_height).unwrap();
    }
}

impl CoinView for Harness {
    fn get_coin(&self, outpoint: &Outpoint) -> Option<Coin> {
        self.coins.borrow().get(outpoint).cloned()
    }
}

#[test]
fn scenario_1_register_then_read() {
    let (_dir, harness) = Harness::new();
    let prev_outpoint = Outpoint::new([0xaa; 32], 0);
    let ns = derive_namespace(&harness.params, &prev_outpoint.tx_hash, prev_outpoint.vout, true);

    let tx1 = build_tx([0x11; 32], prev_outpoint, 1_000_000, namespace_script(ns.as_ref(), b"hello"));
    harness.apply_block(&tx1, 100);

    let expected = Entry::new(Value::new(b"hello".to_vec()).unwrap(), 100, Outpoint::new(tx1.hash, 0));
    assert_eq!(harness.store.get(&ns, &Key::namespace_display_name()).unwrap(), Some(expected));
}

#[test]
fn scenario_2_put_get_delete() {
    let (_dir, harness) = Harness::new();
    let prev_outpoint = Outpoint::new([0xaa; 32], 0);
    let ns = derive_namespace(&harness.params, &prev_outpoint.tx_hash, prev_outpoint.vout, true);
    let key = Key::new(b"k".to_vec()).unwrap();

    let tx1 = build_tx([0x11; 32], prev_outpoint, 1_000_000, namespace_script(ns.as_ref(), b"hello"));
    harness.apply_block(&tx1, 100);

    let tx2 = build_tx([0x22; 32], Outpoint::new(tx1.hash, 0), 1_000_000, put_script(ns.as_ref(), b"k", b"v"));
    harness.apply_block(&tx2, 101);
    assert_eq!(harness.store.get(&ns, &key).unwrap(), Some(Entry::new(Value::new(b"v".to_vec()).unwrap(), 101, Outpoint::new(tx2.hash, 0))));

    let tx3 = build_tx([0x33; 32], Outpoint::new(tx2.hash, 0), 1_000_000, delete_script(ns.as_ref(), b"k"));
    harness.apply_block(&tx3, 102);
    assert_eq!(harness.store.get(&ns, &key).unwrap(), None);
}

#[test]
fn scenario_3_undo_round_trip() {
    let (_dir, harness) = Harness::new();
    let prev_outpoint = Outpoint::new([0xaa; 32], 0);
    let ns = derive_namespace(&harness.params, &prev_outpoint.tx_hash, prev_outpoint.vout, true);
    let key = Key::new(b"k".to_vec()).unwrap();

    let tx1 = build_tx([0x11; 32], prev_outpoint, 1_000_000, namespace_script(ns.as_ref(), b"hello"));
    let undo1 = harness.apply_block(&tx1, 100);

    let tx2 = build_tx([0x22; 32], Outpoint::new(tx1.hash, 0), 1_000_000, put_script(ns.as_ref(), b"k", b"v"));
    let undo2 = harness.apply_block(&tx2, 101);

    let tx3 = build_tx([0x33; 32], Outpoint::new(tx2.hash, 0), 1_000_000, delete_script(ns.as_ref(), b"k"));
    let undo3 = harness.apply_block(&tx3, 102);

    harness.disconnect_block(&undo3, 101);
    harness.disconnect_block(&undo2, 100);
    harness.disconnect_block(&undo1, 99);

    assert_eq!(harness.store.get(&ns, &key).unwrap(), None);
    assert_eq!(harness.store.get(&ns, &Key::namespace_display_name()).unwrap(), None);
}

#[test]
fn scenario_4_put_after_registration_is_visible_once_committed() {
    let (_dir, harness) = Harness::new();
    let prev_outpoint = Outpoint::new([0xaa; 32], 0);
    let ns = derive_namespace(&harness.params, &prev_outpoint.tx_hash, prev_outpoint.vout, true);

    let tx1 = build_tx([0x11; 32], prev_outpoint, 1_000_000, namespace_script(ns.as_ref(), b"hello"));
    harness.apply_block(&tx1, 100);

    // Stands in for a `T_put` accepted into the mempool and then mined;
    // the mempool-side projection half of this scenario (last-writer-wins,
    // eviction on commit) is exercised in `keva-mempool`'s own tests.
    let t_put = build_tx([0x55; 32], Outpoint::new(tx1.hash, 0), 1_000_000, put_script(ns.as_ref(), b"k", b"mem"));
    harness.apply_block(&t_put, 101);

    let key = Key::new(b"k".to_vec()).unwrap();
    assert_eq!(harness.store.get(&ns, &key).unwrap().unwrap().value.as_ref(), b"mem");
}

#[test]
fn scenario_5_association_lifecycle() {
    let (_dir, harness) = Harness::new();

    let prev_outpoint = Outpoint::new([0xaa; 32], 0);
    let ns = derive_namespace(&harness.params, &prev_outpoint.tx_hash, prev_outpoint.vout, true);
    let tx1 = build_tx([0x11; 32], prev_outpoint, 1_000_000, namespace_script(ns.as_ref(), b"hello"));
    harness.apply_block(&tx1, 100);

    let prev_outpoint_prime = Outpoint::new([0xbb; 32], 0);
    let ns_prime = derive_namespace(&harness.params, &prev_outpoint_prime.tx_hash, prev_outpoint_prime.vout, true);
    let tx1b = build_tx([0x12; 32], prev_outpoint_prime, 1_000_000, namespace_script(ns_prime.as_ref(), b"other"));
    harness.apply_block(&tx1b, 100);

    let assoc_key = format!("_g:{}", encode_base58check(&ns_prime));
    let tx4 = build_tx([0x44; 32], Outpoint::new(tx1.hash, 0), 1_000_000, put_script(ns.as_ref(), assoc_key.as_bytes(), b"assoc"));
    harness.apply_block(&tx4, 101);

    let associations = harness.store.iterate_associations(&ns_prime).unwrap();
    assert!(associations.iter().any(|(initiator, _)| initiator == &ns));

    let tx5 = build_tx([0x45; 32], Outpoint::new(tx4.hash, 0), 1_000_000, delete_script(ns.as_ref(), assoc_key.as_bytes()));
    harness.apply_block(&tx5, 102);

    let associations = harness.store.iterate_associations(&ns_prime).unwrap();
    assert!(!associations.iter().any(|(initiator, _)| initiator == &ns));
}

#[test]
fn scenario_6_greedy_name_rejection() {
    let (_dir, harness) = Harness::new();
    let prev_outpoint = Outpoint::new([0xaa; 32], 0);
    let ns = derive_namespace(&harness.params, &prev_outpoint.tx_hash, prev_outpoint.vout, true);

    let tx1 = build_tx([0x11; 32], prev_outpoint, 999_999, namespace_script(ns.as_ref(), b"hello"));
    let result = Validator::check_tx(&tx1, 100, &harness.params, &harness);

    assert_eq!(result, Err(ValidationError::GreedyName(999_999, 1_000_000)));
    assert_eq!(harness.store.get(&ns, &Key::namespace_display_name()).unwrap(), None);
}
