use keva_consensus::{CoinView, ValidatedOp, ValidatedTx, Validator};
use keva_types::{ChainParams, Height, Key, NamespaceId, TxHash, Value};

use crate::conflict::{ConflictReason, ConflictTracker};
use crate::errors::MempoolResult;

fn empty_value() -> Value {
    Value::new(Vec::new()).expect("empty value trivially fits the length budget")
}

/// Unconfirmed, tx-acceptance-to-block-commit view of keva writes (spec §2
/// component 7, §4.4). Two append-only lists keyed by `tx_hash`; the
/// projection never touches the `Store` itself — query layers consult this
/// first and fall through to `view.get` on a miss.
#[derive(Default)]
pub struct MempoolProjection {
    unconfirmed_namespaces: Vec<(TxHash, NamespaceId, Value)>,
    unconfirmed_kvs: Vec<(TxHash, NamespaceId, Key, Value)>,
    conflicts: ConflictTracker,
}

impl MempoolProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conflict_callback(callback: Box<dyn Fn(TxHash, &ConflictReason) + Send + Sync>) -> Self {
        Self { unconfirmed_namespaces: Vec::new(), unconfirmed_kvs: Vec::new(), conflicts: ConflictTracker::with_callback(callback) }
    }

    /// Appends the tuple(s) a validated op projects into the mempool view.
    /// Multiple unconfirmed writes may legitimately target the same
    /// `(ns, key)` at once — `get_unconfirmed_kv` resolves that by
    /// last-writer-wins (spec §4.4, §8 P8) — so `add` never evicts on its
    /// own; only a caller-detected double-spend goes through
    /// `evict_conflicting`.
    pub fn add(&mut self, tx_hash: TxHash, op: ValidatedOp) {
        match op {
            ValidatedOp::NamespaceRegister { ns, display_name } => {
                self.unconfirmed_namespaces.push((tx_hash, ns, display_name));
            }
            ValidatedOp::Put { ns, key, value } => {
                self.unconfirmed_kvs.push((tx_hash, ns, key, value));
            }
            ValidatedOp::Delete { ns, key } => {
                self.unconfirmed_kvs.push((tx_hash, ns, key, empty_value()));
            }
        }
    }

    /// Evicts `reason.evicted_tx` because the caller independently detected
    /// it conflicts with `winning_tx` (spec §7, `Mempool` kind: "would
    /// create a conflict with an already-accepted unconfirmed tx... the
    /// mempool driver records the removal reason `KEVA_CONFLICT`"). This
    /// projection has no UTXO view of its own, so it never infers a
    /// conflict purely from two txs claiming the same `(ns, key)` — that is
    /// ordinary last-writer-wins, not a double-spend. The driver calls this
    /// once it has resolved a real input-level conflict elsewhere.
    pub fn evict_conflicting(&mut self, winning_tx: TxHash, reason: ConflictReason) {
        self.remove(reason.evicted_tx);
        self.conflicts.record(winning_tx, reason);
    }

    /// Removes the single entry with `tx_hash` from each list, if present.
    /// `Vec::retain` is O(n) and preserves the insertion order of the
    /// surviving elements, as required by spec §4.4 (ordering is
    /// externally observable through `list_unconfirmed_*`).
    pub fn remove(&mut self, tx_hash: TxHash) {
        self.unconfirmed_namespaces.retain(|(h, _, _)| *h != tx_hash);
        self.unconfirmed_kvs.retain(|(h, _, _, _)| *h != tx_hash);
    }

    /// Last matching unconfirmed write wins (spec §8 P8); a pending delete
    /// shows up here as `Some` of an empty `Value`, the same encoding the
    /// list carries it in — callers distinguish "no unconfirmed write" from
    /// "unconfirmed delete" by checking emptiness, not by `Option`.
    pub fn get_unconfirmed_kv(&self, ns: &NamespaceId, key: &Key) -> Option<Value> {
        self.unconfirmed_kvs.iter().rev().find(|(_, n, k, _)| n == ns && k == key).map(|(_, _, _, v)| v.clone())
    }

    pub fn list_unconfirmed_kvs(&self, ns_filter: Option<&NamespaceId>) -> Vec<(NamespaceId, Key, Value, TxHash)> {
        self.unconfirmed_kvs.iter().filter(|(_, n, _, _)| ns_filter.is_none_or(|f| f == n)).map(|(h, n, k, v)| (n.clone(), k.clone(), v.clone(), *h)).collect()
    }

    pub fn list_unconfirmed_namespaces(&self) -> Vec<(NamespaceId, Value, TxHash)> {
        self.unconfirmed_namespaces.iter().map(|(h, n, d)| (n.clone(), d.clone(), *h)).collect()
    }

    pub fn conflicts(&self) -> &ConflictTracker {
        &self.conflicts
    }

    /// Structural check ahead of `add`: delegates to the same
    /// `Validator::check_tx` the confirmed path runs, evaluated at the
    /// mempool's own notion of `height` (typically `chain_tip + 1`) so the
    /// ns-fix activation rule of spec §4.5 is applied consistently.
    pub fn check_tx(tx: &keva_consensus::Transaction, height: Height, params: &ChainParams, coin_view: &dyn CoinView) -> MempoolResult<Option<ValidatedTx>> {
        Ok(Validator::check_tx(tx, height, params, coin_view)?)
    }
}
