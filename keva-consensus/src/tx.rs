use keva_types::{Outpoint, TxHash};

/// Minimal transaction shape the validator and applier need (spec §4.5,
/// §4.6): a previous-outpoint per input and a value/script per output.
/// Signature verification, the rest of the wire format, and the PoW
/// header are external collaborators' concerns (spec §1 scope boundary);
/// this type exists only so `Validator`/`Applier` have something concrete
/// to index into.
pub struct Transaction {
    pub hash: TxHash,
    /// Whether the tx's version flag marks it as carrying keva semantics
    /// at all (spec §4.5 structural extraction).
    pub is_kevacoin: bool,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

pub struct TxInput {
    pub prev_outpoint: Outpoint,
}

pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}
