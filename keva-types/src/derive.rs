//! Namespace derivation and its base58check encoding at the RPC boundary.
//!
//! `derive_namespace` is the one piece of the core that both the
//! `Validator` (consensus-critical) and the mempool projection (policy
//! check on `OP_KEVA_NAMESPACE`) must compute identically — hence it lives
//! in `keva-types` rather than `keva-consensus`, so `keva-mempool` does not
//! need to depend on the validator crate just to call it (spec P5).
use crate::config::ChainParams;
use crate::primitives::{bytes_from, NamespaceId, TxHash};
use ripemd::{Digest, Ripemd160};

/// `derive_namespace = prefix ‖ ripemd160( tx_hash ‖ (ns_fix ? ascii_decimal(vout) : ∅) )`
/// (spec §4.5).
pub fn derive_namespace(params: &ChainParams, prev_tx_hash: &TxHash, prev_vout: u32, ns_fix: bool) -> NamespaceId {
    let mut hasher = Ripemd160::new();
    hasher.update(prev_tx_hash);
    if ns_fix {
        hasher.update(prev_vout.to_string().as_bytes());
    }
    let digest = hasher.finalize();

    let mut bytes = Vec::with_capacity(1 + digest.len());
    bytes.push(params.namespace_prefix);
    bytes.extend_from_slice(&digest);
    NamespaceId::new_unchecked(bytes_from(bytes))
}

pub fn encode_base58check(ns: &NamespaceId) -> String {
    bs58::encode(ns.as_ref()).with_check().into_string()
}

pub fn decode_base58check(encoded: &[u8]) -> Option<NamespaceId> {
    let decoded = bs58::decode(encoded).with_check(None).into_vec().ok()?;
    NamespaceId::new(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let params = ChainParams::regtest();
        let tx_hash = [0xaa; 32];
        let a = derive_namespace(&params, &tx_hash, 0, true);
        let b = derive_namespace(&params, &tx_hash, 0, true);
        assert_eq!(a, b);
    }

    #[test]
    fn ns_fix_changes_the_derived_namespace() {
        let params = ChainParams::regtest();
        let tx_hash = [0xaa; 32];
        let with_fix = derive_namespace(&params, &tx_hash, 0, true);
        let without_fix = derive_namespace(&params, &tx_hash, 0, false);
        assert_ne!(with_fix, without_fix);
    }

    #[test]
    fn ns_fix_is_sensitive_to_vout() {
        let params = ChainParams::regtest();
        let tx_hash = [0xaa; 32];
        let vout0 = derive_namespace(&params, &tx_hash, 0, true);
        let vout1 = derive_namespace(&params, &tx_hash, 1, true);
        assert_ne!(vout0, vout1);
    }

    #[test]
    fn derived_namespace_starts_with_the_keva_namespace_prefix_byte() {
        // spec §8 scenario 1: N = 0x35 ‖ ripemd160(...); 0x35 is decimal 53,
        // not 0x53 (decimal 83).
        let ns = derive_namespace(&ChainParams::mainnet(), &[0xaa; 32], 0, true);
        assert_eq!(ns.as_ref()[0], 0x35);
    }

    #[test]
    fn base58check_round_trips() {
        let ns = derive_namespace(&ChainParams::regtest(), &[1u8; 32], 0, true);
        let encoded = encode_base58check(&ns);
        assert_eq!(decode_base58check(encoded.as_bytes()), Some(ns));
    }
}
