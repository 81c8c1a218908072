use keva_types::ValidationError;
use thiserror::Error;

/// Rejection reasons surfaced at the mempool boundary (spec §7, `Mempool`
/// kind). A structural/policy/derivation/binding failure from the
/// validator is forwarded unchanged; the mempool adds nothing of its own
/// here because a same-input conflict is *recovered*, not rejected (see
/// `ConflictReason`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type MempoolResult<T> = Result<T, MempoolError>;
