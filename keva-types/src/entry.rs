use crate::primitives::{Height, Outpoint, Value};

/// Authoritative record stored at a `(NamespaceId, Key)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Value,
    pub height: Height,
    pub update_outpoint: Outpoint,
}

impl Entry {
    pub fn new(value: Value, height: Height, update_outpoint: Outpoint) -> Self {
        Self { value, height, update_outpoint }
    }
}
