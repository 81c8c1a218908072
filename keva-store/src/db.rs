use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteBatch};
use std::ops::Deref;
use std::path::Path;

/// The rocksdb handle backing a `Store`. `MultiThreaded` so readers
/// (queries, iteration) can run concurrently with each other, as required
/// by spec §5; the single chainstate writer lock that serializes block
/// connect/disconnect lives one layer up, in `Store`.
pub struct DB {
    inner: DBWithThreadMode<MultiThreaded>,
}

impl DB {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, rocksdb::Error> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.increase_parallelism(num_cpus::get() as i32);
        let inner = DBWithThreadMode::<MultiThreaded>::open(&options, path)?;
        Ok(Self { inner })
    }

    pub fn write(&self, batch: WriteBatch) -> Result<(), rocksdb::Error> {
        self.inner.write(batch)
    }
}

impl Deref for DB {
    type Target = DBWithThreadMode<MultiThreaded>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
