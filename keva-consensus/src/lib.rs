mod applier;
mod cache;
mod merged_iterator;
mod notifier;
mod script;
mod tx;
mod validator;
mod view;

pub mod prelude {
    pub use crate::applier::{Applier, BlockUndo};
    pub use crate::cache::Cache;
    pub use crate::merged_iterator::MergedIterator;
    pub use crate::notifier::{Notification, NotificationSink, Notifier};
    pub use crate::script::{parse_keva_script, KevaOp, ParsedKevaScript, OP_KEVA_DELETE, OP_KEVA_NAMESPACE, OP_KEVA_PUT};
    pub use crate::tx::{Transaction, TxInput, TxOutput};
    pub use crate::validator::{ValidatedOp, ValidatedTx, Validator};
    pub use crate::view::{CacheView, Coin, CoinView, StoreView, View};
}

pub use prelude::*;
