mod access;
mod cache;
mod db;
mod errors;
mod key;
mod store;
mod writer;

pub mod prelude {
    pub use crate::db::DB;
    pub use crate::errors::{StoreError, StoreResult};
    pub use crate::key::{DbKey, Tag};
    pub use crate::store::{EntryWrite, Store, StoreBatch, DEFAULT_CACHE_SIZE};
    pub use crate::writer::{BatchDbWriter, DbWriter, DirectDbWriter};
}

pub use prelude::*;
