pub mod codec;
pub mod config;
pub mod derive;
pub mod entry;
pub mod errors;
pub mod primitives;

pub use codec::TxUndo;
pub use config::ChainParams;
pub use entry::Entry;
pub use errors::{ValidationError, ValidationResult};
pub use primitives::{Bytes, Height, Key, NamespaceId, Outpoint, TxHash, Value};
