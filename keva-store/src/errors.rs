use thiserror::Error;

/// A `Store` failure is always `StorageIntegrity` in the taxonomy of spec
/// §7: it is fatal, and the block-connection driver is expected to halt
/// the node and request a reindex. The store itself never panics or exits
/// the process — it returns the error and lets the caller decide.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rocksdb error: {0}")]
    Db(#[from] rocksdb::Error),
    #[error("corrupted record at key {0:?}: {1}")]
    Corrupted(Vec<u8>, keva_types::codec::CodecError),
    #[error("database contains a legacy 'c' record; an upgrade via -reindex-chainstate is required")]
    LegacyRecordPresent,
    #[error("best-block marker is missing after a partial batch")]
    MissingBestBlock,
}

pub type StoreResult<T> = Result<T, StoreError>;
