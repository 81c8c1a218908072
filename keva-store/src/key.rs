use smallvec::SmallVec;

/// Single-byte tag discriminators for the persistent key layout (spec §4.1,
/// §6). `Coin` and `Legacy` are carried only so the store can recognize and
/// refuse a pre-upgrade database (§6); the core never writes a `Coin`
/// record itself — coin storage belongs to the external `CoinView`
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Coin = b'C',
    BestBlock = b'B',
    HeadBlocks = b'H',
    Entry = b'n',
    Association = b'a',
    Legacy = b'c',
}

impl From<Tag> for u8 {
    fn from(t: Tag) -> Self {
        t as u8
    }
}

/// A composed on-disk key: `tag ‖ bucket ‖ key`, built by direct byte
/// concatenation with no length-prefixing anywhere in the path. This is
/// what lets rocksdb's default byte-wise comparator order `'n' ‖ ns ‖ key`
/// records by `(namespace, key)` lexicographically — a length prefix would
/// make two keys of different lengths compare by length first, breaking
/// the ordering guarantee the `MergedIterator` streaming merge depends on
/// (spec §4.1, §4.3). Modeled on `kaspa-database::key::DbKey`.
#[derive(Clone)]
pub struct DbKey {
    path: SmallVec<[u8; 40]>,
    bucket_len: usize,
}

impl DbKey {
    pub fn tag_only(tag: Tag) -> Self {
        let mut path = SmallVec::new();
        path.push(tag.into());
        Self { path, bucket_len: 0 }
    }

    pub fn with_bucket(tag: Tag, bucket: &[u8]) -> Self {
        let mut key = Self::tag_only(tag);
        key.path.extend_from_slice(bucket);
        key.bucket_len = bucket.len();
        key
    }

    pub fn with_bucket_and_key(tag: Tag, bucket: &[u8], key: &[u8]) -> Self {
        let mut db_key = Self::with_bucket(tag, bucket);
        db_key.path.extend_from_slice(key);
        db_key
    }

    /// Length of `tag ‖ bucket`, i.e. the byte offset at which the
    /// variable `key` tail starts. Callers strip this prefix off a raw
    /// rocksdb key to recover the original `key` bytes during iteration.
    pub fn bucket_prefix_len(&self) -> usize {
        1 + self.bucket_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}
