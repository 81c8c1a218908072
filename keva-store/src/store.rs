use std::path::Path;
use std::sync::Arc;

use keva_types::{Entry, Key, NamespaceId};
use log::debug;
use rocksdb::WriteBatch;

use crate::access::{has_entry_records, has_legacy_records, EntryAccess, SingletonAccess};
use crate::db::DB;
use crate::errors::{StoreError, StoreResult};
use crate::key::Tag;
use crate::writer::{BatchDbWriter, DirectDbWriter};

pub const DEFAULT_CACHE_SIZE: usize = 10_000;

/// The authoritative, on-disk keva store (spec §2 component 2). Owns the
/// `'n'`, `'a'`, `'B'` and `'H'` record families described in §4.1 and
/// applies mutations to them only through `commit_batch`, the single
/// atomic write that also updates the best-block marker (§3 invariant 5,
/// §5 P1).
pub struct Store {
    db: Arc<DB>,
    entries: EntryAccess,
    associations: EntryAccess,
    best_block: SingletonAccess,
    head_blocks: SingletonAccess,
}

/// One namespace-key mutation queued for a batch commit.
pub enum EntryWrite {
    Set { ns: NamespaceId, key: Vec<u8>, entry: Entry },
    Delete { ns: NamespaceId, key: Vec<u8> },
}

/// The full diff a single block commit applies atomically: entry writes,
/// association writes, and the new best-block hash. Head-blocks is updated
/// by a distinct call since it is maintained by the reorg driver, not by
/// per-transaction mutation (spec §4.1).
#[derive(Default)]
pub struct StoreBatch {
    pub entries: Vec<EntryWrite>,
    pub associations: Vec<EntryWrite>,
    pub best_block: Option<[u8; 32]>,
    pub height: Option<u32>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>, cache_size: usize) -> StoreResult<Self> {
        let db = Arc::new(DB::open(path)?);
        if has_legacy_records(&db)? {
            return Err(StoreError::LegacyRecordPresent);
        }
        let best_block = SingletonAccess::new(db.clone(), Tag::BestBlock);
        if best_block.get_raw()?.is_none() && has_entry_records(&db)? {
            return Err(StoreError::MissingBestBlock);
        }
        Ok(Self {
            entries: EntryAccess::new(db.clone(), Tag::Entry, cache_size),
            associations: EntryAccess::new(db.clone(), Tag::Association, cache_size),
            head_blocks: SingletonAccess::new(db.clone(), Tag::HeadBlocks),
            best_block,
            db,
        })
    }

    pub fn get(&self, ns: &NamespaceId, key: &Key) -> StoreResult<Option<Entry>> {
        self.entries.get(ns, key.as_ref())
    }

    pub fn get_association(&self, from: &NamespaceId, to: &NamespaceId) -> StoreResult<Option<Entry>> {
        self.associations.get(from, to.as_ref())
    }

    /// `(Key, Entry)` pairs for `ns`, in lexicographic key order (spec §4.1,
    /// §6 query surface `iterate_keys`).
    pub fn iterate_keys(&self, ns: &NamespaceId) -> StoreResult<Vec<(Key, Entry)>> {
        self.entries
            .iterate_bucket(ns)?
            .into_iter()
            .map(|(raw_key, entry)| Ok((Key::new_unchecked(keva_types::primitives::bytes_from(raw_key)), entry)))
            .collect()
    }

    /// `(initiator_namespace, Entry)` pairs for `ns` acting as the
    /// association *target* (spec §3, §6 `iterate_associations`).
    pub fn iterate_associations(&self, ns: &NamespaceId) -> StoreResult<Vec<(NamespaceId, Entry)>> {
        self.associations
            .iterate_bucket(ns)?
            .into_iter()
            .map(|(raw_ns, entry)| Ok((NamespaceId::new_unchecked(keva_types::primitives::bytes_from(raw_ns)), entry)))
            .collect()
    }

    pub fn get_best_block(&self) -> StoreResult<Option<[u8; 32]>> {
        Ok(self.best_block.get_raw()?.map(|v| {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&v);
            hash
        }))
    }

    pub fn get_head_blocks(&self) -> StoreResult<Vec<[u8; 32]>> {
        match self.head_blocks.get_raw()? {
            Some(raw) => Ok(raw.chunks_exact(32).map(|c| c.try_into().expect("chunked by 32")).collect()),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_head_blocks(&self, hashes: &[[u8; 32]]) -> StoreResult<()> {
        let mut raw = Vec::with_capacity(hashes.len() * 32);
        hashes.iter().for_each(|h| raw.extend_from_slice(h));
        self.head_blocks.put_raw(DirectDbWriter::new(&self.db), &raw)
    }

    /// Applies a block's accumulated diff in a single rocksdb write batch:
    /// per spec §3 invariant 5 / §8 P1, readers never observe a partially
    /// applied block, because the best-block marker and every record
    /// mutation land in the same underlying `WriteBatch::write` call.
    pub fn commit_batch(&self, batch: StoreBatch) -> StoreResult<()> {
        let mut write_batch = WriteBatch::default();
        {
            let mut writer = BatchDbWriter::new(&mut write_batch);
            for write in &batch.entries {
                apply_entry_write(&self.entries, &mut writer, write)?;
            }
            for write in &batch.associations {
                apply_entry_write(&self.associations, &mut writer, write)?;
            }
            if let Some(best) = batch.best_block {
                self.best_block.put_raw(&mut writer, &best)?;
            }
        }
        let batch_len = write_batch.len();
        let height = batch.height;
        self.db.write(write_batch)?;
        match height {
            Some(height) => debug!("store committed batch of {batch_len} writes at height {height}"),
            None => debug!("store committed batch of {batch_len} writes"),
        }
        Ok(())
    }
}

fn apply_entry_write(access: &EntryAccess, writer: &mut impl crate::writer::DbWriter, write: &EntryWrite) -> StoreResult<()> {
    match write {
        EntryWrite::Set { ns, key, entry } => access.put(writer, ns, key, entry),
        EntryWrite::Delete { ns, key } => access.delete(writer, ns, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keva_types::{Outpoint, Value};

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), DEFAULT_CACHE_SIZE).unwrap();
        (dir, store)
    }

    fn entry(v: &str, height: u32) -> Entry {
        Entry::new(Value::new(v.as_bytes().to_vec()).unwrap(), height, Outpoint::new([9u8; 32], 0))
    }

    #[test]
    fn get_set_delete_round_trip() {
        let (_dir, store) = temp_store();
        let ns = NamespaceId::new(b"ns".to_vec()).unwrap();
        let key = Key::new(b"k".to_vec()).unwrap();

        assert_eq!(store.get(&ns, &key).unwrap(), None);

        let batch = StoreBatch {
            entries: vec![EntryWrite::Set { ns: ns.clone(), key: key.as_ref().to_vec(), entry: entry("v", 1) }],
            associations: vec![],
            best_block: Some([1u8; 32]),
            height: Some(1),
        };
        store.commit_batch(batch).unwrap();
        assert_eq!(store.get(&ns, &key).unwrap(), Some(entry("v", 1)));
        assert_eq!(store.get_best_block().unwrap(), Some([1u8; 32]));

        let batch = StoreBatch {
            entries: vec![EntryWrite::Delete { ns: ns.clone(), key: key.as_ref().to_vec() }],
            associations: vec![],
            best_block: None,
            height: Some(2),
        };
        store.commit_batch(batch).unwrap();
        assert_eq!(store.get(&ns, &key).unwrap(), None);
    }

    #[test]
    fn iterate_keys_is_lexicographic() {
        let (_dir, store) = temp_store();
        let ns = NamespaceId::new(b"ns".to_vec()).unwrap();
        let batch = StoreBatch {
            entries: vec![
                EntryWrite::Set { ns: ns.clone(), key: b"b".to_vec(), entry: entry("b", 1) },
                EntryWrite::Set { ns: ns.clone(), key: b"a".to_vec(), entry: entry("a", 1) },
                EntryWrite::Set { ns: ns.clone(), key: b"ab".to_vec(), entry: entry("ab", 1) },
            ],
            associations: vec![],
            best_block: None,
            height: Some(1),
        };
        store.commit_batch(batch).unwrap();
        let keys: Vec<_> = store.iterate_keys(&ns).unwrap().into_iter().map(|(k, _)| k.as_ref().to_vec()).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"ab".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn refuses_to_open_over_legacy_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = DB::open(dir.path()).unwrap();
            db.put([Tag::Legacy.into()], b"legacy").unwrap();
        }
        assert!(matches!(Store::open(dir.path(), DEFAULT_CACHE_SIZE), Err(StoreError::LegacyRecordPresent)));
    }

    #[test]
    fn refuses_to_open_with_entries_but_no_best_block() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path(), DEFAULT_CACHE_SIZE).unwrap();
            let ns = NamespaceId::new(b"ns".to_vec()).unwrap();
            let batch = StoreBatch {
                entries: vec![EntryWrite::Set { ns, key: b"k".to_vec(), entry: entry("v", 1) }],
                associations: vec![],
                best_block: None,
                height: Some(1),
            };
            store.commit_batch(batch).unwrap();
        }
        assert!(matches!(Store::open(dir.path(), DEFAULT_CACHE_SIZE), Err(StoreError::MissingBestBlock)));
    }
}
