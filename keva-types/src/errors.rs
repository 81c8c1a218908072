use crate::primitives::NamespaceId;
use thiserror::Error;

/// Rejection reasons for `Validator::check_tx` (spec §4.5, §7). Every
/// variant here is a `Structural | PolicyLimit | ConsensusDerivation |
/// InputBinding` verdict: the transaction is rejected and no state is
/// mutated. Storage failures are a distinct, fatal error kind — see
/// `keva-store::StoreError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // --- Structural ---
    #[error("transaction has {0} keva inputs, at most one is allowed")]
    MultipleKevaInputs(usize),
    #[error("transaction has {0} keva outputs, at most one is allowed")]
    MultipleKevaOutputs(usize),
    #[error("non-kevacoin transaction carries a keva input or output")]
    UnexpectedKevaIo,
    #[error("kevacoin transaction carries no keva output")]
    MissingKevaOutput,
    #[error("a put/delete requires a prior keva input")]
    MissingKevaInput,

    // --- PolicyLimit ---
    #[error("key is {0} bytes, maximum is {1}")]
    KeyTooLong(usize, usize),
    #[error("value is {0} bytes, maximum is {1}")]
    ValueTooLong(usize, usize),
    #[error("display name is {0} bytes, maximum is {1}")]
    DisplayNameTooLong(usize, usize),
    #[error("keva output locks {0} satoshi, minimum is {1}")]
    GreedyName(u64, u64),

    // --- ConsensusDerivation ---
    #[error("declared namespace does not match the derivation of its registering input")]
    NamespaceDerivationMismatch,

    // --- InputBinding ---
    #[error("update's input namespace {0} does not match output namespace {1}")]
    NamespaceMismatch(NamespaceIdDisplay, NamespaceIdDisplay),
    #[error("update's keva input is neither a registration nor a prior update")]
    InvalidInputChain,
}

/// Thin wrapper so `NamespaceId` (which intentionally has no `Copy`) can sit
/// inside a `Clone` error variant without forcing every caller to clone the
/// full byte buffer just to log a mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceIdDisplay(pub NamespaceId);

impl std::fmt::Display for NamespaceIdDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
