use std::sync::Arc;

use keva_types::codec::{decode_entry, encode_entry};
use keva_types::primitives::bytes_from;
use keva_types::{Bytes, Entry, NamespaceId};
use rocksdb::{Direction, IteratorMode, ReadOptions};

use crate::cache::ReadCache;
use crate::db::DB;
use crate::errors::{StoreError, StoreResult};
use crate::key::{DbKey, Tag};
use crate::writer::DbWriter;

type CacheKey = (NamespaceId, Bytes);

/// Store access for `'n' ‖ namespace ‖ key → Entry` and
/// `'a' ‖ from ‖ to → Entry` records (spec §4.1). Both record kinds share
/// this implementation since they differ only in which tag and which pair
/// of byte strings make up the composed key — the pair's first element is
/// always the namespace a caller iterates by.
#[derive(Clone)]
pub struct EntryAccess {
    db: Arc<DB>,
    tag: Tag,
    cache: ReadCache<CacheKey, Entry>,
}

impl EntryAccess {
    pub fn new(db: Arc<DB>, tag: Tag, cache_capacity: usize) -> Self {
        Self { db, tag, cache: ReadCache::new(cache_capacity) }
    }

    fn cache_key(bucket: &NamespaceId, key: &[u8]) -> CacheKey {
        (bucket.clone(), bytes_from(key.to_vec()))
    }

    pub fn get(&self, bucket: &NamespaceId, key: &[u8]) -> StoreResult<Option<Entry>> {
        let cache_key = Self::cache_key(bucket, key);
        if let Some(entry) = self.cache.get(&cache_key) {
            return Ok(Some(entry));
        }
        let db_key = DbKey::with_bucket_and_key(self.tag, bucket.as_ref(), key);
        match self.db.get_pinned(db_key.as_ref())? {
            Some(slice) => {
                let entry = decode_entry(&slice).map_err(|e| StoreError::Corrupted(db_key.as_ref().to_vec(), e))?;
                self.cache.insert(cache_key, entry.clone());
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    pub fn put(&self, mut writer: impl DbWriter, bucket: &NamespaceId, key: &[u8], entry: &Entry) -> StoreResult<()> {
        let db_key = DbKey::with_bucket_and_key(self.tag, bucket.as_ref(), key);
        writer.put(db_key.as_ref(), &encode_entry(entry))?;
        self.cache.insert(Self::cache_key(bucket, key), entry.clone());
        Ok(())
    }

    pub fn delete(&self, mut writer: impl DbWriter, bucket: &NamespaceId, key: &[u8]) -> StoreResult<()> {
        let db_key = DbKey::with_bucket_and_key(self.tag, bucket.as_ref(), key);
        writer.delete(db_key.as_ref())?;
        self.cache.remove(&Self::cache_key(bucket, key));
        Ok(())
    }

    /// Iterates `(key_tail, Entry)` in lexicographic key order for a fixed
    /// namespace bucket, used by both `iterate_keys` and
    /// `iterate_associations` (spec §4.1).
    pub fn iterate_bucket(&self, bucket: &NamespaceId) -> StoreResult<Vec<(Vec<u8>, Entry)>> {
        let prefix = DbKey::with_bucket(self.tag, bucket.as_ref());
        let prefix_len = prefix.bucket_prefix_len();
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(rocksdb::PrefixRange(prefix.as_ref()));
        let iter = self.db.iterator_opt(IteratorMode::From(prefix.as_ref(), Direction::Forward), read_opts);

        let mut out = Vec::new();
        for item in iter {
            let (raw_key, raw_value) = item?;
            let tail = raw_key[prefix_len..].to_vec();
            let entry = decode_entry(&raw_value).map_err(|e| StoreError::Corrupted(raw_key.to_vec(), e))?;
            out.push((tail, entry));
        }
        Ok(out)
    }
}

/// A single-record store value addressed only by its tag: the best-block
/// marker (`'B'`) and the head-blocks vector (`'H'`), spec §4.1.
#[derive(Clone)]
pub struct SingletonAccess {
    db: Arc<DB>,
    tag: Tag,
}

impl SingletonAccess {
    pub fn new(db: Arc<DB>, tag: Tag) -> Self {
        Self { db, tag }
    }

    pub fn get_raw(&self) -> StoreResult<Option<Vec<u8>>> {
        let key = DbKey::tag_only(self.tag);
        Ok(self.db.get_pinned(key.as_ref())?.map(|v| v.to_vec()))
    }

    pub fn put_raw(&self, mut writer: impl DbWriter, value: &[u8]) -> StoreResult<()> {
        let key = DbKey::tag_only(self.tag);
        writer.put(key.as_ref(), value)?;
        Ok(())
    }
}

/// Checks whether the database carries the deprecated `'c'` tag (spec §6):
/// if so the store refuses to operate until the caller reindexes.
pub fn has_legacy_records(db: &DB) -> StoreResult<bool> {
    has_tag_records(db, Tag::Legacy)
}

/// Checks whether any `'n'` entry record exists, regardless of namespace.
/// Used by `Store::open` to detect a database that has entry writes but no
/// best-block marker — the on-disk symptom of a partial batch (spec §7,
/// `StorageIntegrity`: "missing best-block after partial batch") since
/// `commit_batch` always writes both in the same atomic batch.
pub fn has_entry_records(db: &DB) -> StoreResult<bool> {
    has_tag_records(db, Tag::Entry)
}

fn has_tag_records(db: &DB, tag: Tag) -> StoreResult<bool> {
    let prefix = DbKey::tag_only(tag);
    let mut read_opts = ReadOptions::default();
    read_opts.set_iterate_range(rocksdb::PrefixRange(prefix.as_ref()));
    let mut iter = db.iterator_opt(IteratorMode::From(prefix.as_ref(), Direction::Forward), read_opts);
    Ok(iter.next().is_some())
}
