use rocksdb::WriteBatch;

use crate::db::DB;

/// Abstraction over direct vs. batched rocksdb writes, so `Access` methods
/// can be shared between immediate single-record writes and the one atomic
/// batch a block commit assembles (spec §4.7). Modeled on
/// `kaspa-database::writer`.
pub trait DbWriter {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), rocksdb::Error>;
    fn delete(&mut self, key: &[u8]) -> Result<(), rocksdb::Error>;
}

pub struct DirectDbWriter<'a> {
    db: &'a DB,
}

impl<'a> DirectDbWriter<'a> {
    pub fn new(db: &'a DB) -> Self {
        Self { db }
    }
}

impl DbWriter for DirectDbWriter<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), rocksdb::Error> {
        self.db.put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), rocksdb::Error> {
        self.db.delete(key)
    }
}

pub struct BatchDbWriter<'a> {
    batch: &'a mut WriteBatch,
}

impl<'a> BatchDbWriter<'a> {
    pub fn new(batch: &'a mut WriteBatch) -> Self {
        Self { batch }
    }
}

impl DbWriter for BatchDbWriter<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), rocksdb::Error> {
        self.batch.put(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), rocksdb::Error> {
        self.batch.delete(key);
        Ok(())
    }
}

impl<T: DbWriter> DbWriter for &mut T {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), rocksdb::Error> {
        (*self).put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), rocksdb::Error> {
        (*self).delete(key)
    }
}
