use keva_types::{Key, NamespaceId, TxHash};
use log::warn;

/// Why an already-accepted unconfirmed tx was evicted (spec §7, `Mempool`
/// kind: "the mempool driver records the removal reason `KEVA_CONFLICT`").
/// The only conflict this projection can see is two unconfirmed txs
/// claiming the same keva input — a UTXO-level double-spend the projection
/// re-derives locally since it does not own the UTXO mempool itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictReason {
    pub evicted_tx: TxHash,
    pub ns: NamespaceId,
    pub key: Option<Key>,
}

/// Realizes the source's `CNameConflictTracker` (Design Note §9) as an
/// owned log plus a callback invoked at the moment of eviction, rather than
/// a construction/destruction-coupled observer registered with the
/// mempool.
#[derive(Default)]
pub struct ConflictTracker {
    log: Vec<(TxHash, ConflictReason)>,
    on_conflict: Option<Box<dyn Fn(TxHash, &ConflictReason) + Send + Sync>>,
}

impl ConflictTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: Box<dyn Fn(TxHash, &ConflictReason) + Send + Sync>) -> Self {
        Self { log: Vec::new(), on_conflict: Some(callback) }
    }

    pub fn record(&mut self, winning_tx: TxHash, reason: ConflictReason) {
        warn!("keva mempool conflict: tx {:?} evicted by {:?} in namespace {}", reason.evicted_tx, winning_tx, reason.ns);
        if let Some(callback) = &self.on_conflict {
            callback(winning_tx, &reason);
        }
        self.log.push((winning_tx, reason));
    }

    pub fn history(&self) -> &[(TxHash, ConflictReason)] {
        &self.log
    }
}
