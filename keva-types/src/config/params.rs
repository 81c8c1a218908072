/// Chain this instance is validating for. Scoped to what `ChainParams`
/// actually needs to vary on: the ns-fix activation height and the
/// namespace derivation prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

/// The single known consensus fork window in the core (spec §4.5 / §9):
/// whether `derive_namespace` mixes the input's vout index into the hash.
///
/// Modeled after the `ForkActivation` pattern (explicit height threshold,
/// no global mutable state) rather than a bare `bool`, so the activation
/// rule reads the same way at every call site and a future fork can reuse
/// the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsFixActivation(Option<u32>);

impl NsFixActivation {
    /// Active once `height > threshold`.
    pub const fn after(threshold: u32) -> Self {
        Self(Some(threshold))
    }

    /// Active at every height.
    pub const fn always() -> Self {
        Self(None)
    }

    pub fn is_active(self, height: u32) -> bool {
        match self.0 {
            Some(threshold) => height > threshold,
            None => true,
        }
    }
}

/// Chain-specific values threaded explicitly through `derive_namespace`,
/// the `Applier` and RPC-facing encoders, replacing the source's singleton
/// `Params()` (Design Note §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    pub network: NetworkType,
    /// One-byte chain-specific prefix prepended to a namespace's raw
    /// ripemd160 digest (`KEVA_NAMESPACE`).
    pub namespace_prefix: u8,
    pub ns_fix: NsFixActivation,
}

impl ChainParams {
    pub const MAX_NAMESPACE_LENGTH: usize = 255;
    pub const MAX_KEY_LENGTH: usize = 255;
    pub const MAX_VALUE_LENGTH: usize = 520;
    pub const KEVA_LOCKED_AMOUNT: u64 = 1_000_000;

    pub const fn mainnet() -> Self {
        Self { network: NetworkType::Mainnet, namespace_prefix: 53, ns_fix: NsFixActivation::after(130_112) }
    }

    pub const fn testnet() -> Self {
        Self { network: NetworkType::Testnet, namespace_prefix: 53, ns_fix: NsFixActivation::always() }
    }

    pub const fn signet() -> Self {
        Self { network: NetworkType::Signet, namespace_prefix: 53, ns_fix: NsFixActivation::always() }
    }

    pub const fn regtest() -> Self {
        Self { network: NetworkType::Regtest, namespace_prefix: 53, ns_fix: NsFixActivation::always() }
    }

    pub fn is_ns_fix_active(&self, height: u32) -> bool {
        self.ns_fix.is_active(height)
    }
}
