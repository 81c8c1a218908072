use keva_types::{Height, TxHash};
use log::warn;
use serde::{Deserialize, Serialize};

/// One of the three fan-out events emitted by the `Applier` once a
/// mutation is visible in the topmost `CacheView` (spec §4.8). `Serialize`/
/// `Deserialize` let a sink relay a notification across a process boundary
/// (e.g. a ZMQ-style publisher) via `bincode`, the same way the teacher
/// reaches for `serde`+`bincode` for values that are opaque blobs rather
/// than part of a consensus-critical wire format (SPEC_FULL.md §1.1) — a
/// notification is fire-and-forget, never replayed into consensus state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    NamespaceCreated { tx_hash: TxHash, height: Height, ns_encoded: String },
    KeyUpdated { tx_hash: TxHash, height: Height, ns_encoded: String, key: String, value: String },
    KeyDeleted { tx_hash: TxHash, height: Height, ns_encoded: String, key: String },
}

impl Notification {
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Notification has no unsupported types for bincode")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Re-architected per Design Note §9: a plain callback held by the
/// notifier rather than a construction/destruction-coupled publish/
/// subscribe service. A sink's failure is swallowed (logged, not
/// propagated) — notifier delivery must never affect consensus-critical
/// state (spec §4.8).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn namespace_created(&self, tx_hash: TxHash, height: Height, ns_encoded: &str) {
        self.dispatch(Notification::NamespaceCreated { tx_hash, height, ns_encoded: ns_encoded.to_string() });
    }

    pub fn key_updated(&self, tx_hash: TxHash, height: Height, ns_encoded: &str, key: &[u8], value: &[u8]) {
        self.dispatch(Notification::KeyUpdated {
            tx_hash,
            height,
            ns_encoded: ns_encoded.to_string(),
            key: String::from_utf8_lossy(key).into_owned(),
            value: String::from_utf8_lossy(value).into_owned(),
        });
    }

    pub fn key_deleted(&self, tx_hash: TxHash, height: Height, ns_encoded: &str, key: &[u8]) {
        self.dispatch(Notification::KeyDeleted {
            tx_hash,
            height,
            ns_encoded: ns_encoded.to_string(),
            key: String::from_utf8_lossy(key).into_owned(),
        });
    }

    fn dispatch(&self, notification: Notification) {
        if self.sinks.is_empty() {
            warn!("no notification sinks registered, dropping {notification:?}");
        }
        for sink in &self.sinks {
            sink.notify(notification.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct RecordingSink(Arc<Mutex<Vec<Notification>>>);
    impl NotificationSink for RecordingSink {
        fn notify(&self, notification: Notification) {
            self.0.lock().push(notification);
        }
    }

    #[test]
    fn notification_round_trips_through_bincode() {
        let n = Notification::KeyUpdated { tx_hash: [3u8; 32], height: 42, ns_encoded: "Nabc".into(), key: "k".into(), value: "v".into() };
        assert_eq!(Notification::from_bytes(&n.to_bytes()).unwrap(), n);
    }

    #[test]
    fn dispatches_to_every_registered_sink() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = Notifier::new();
        notifier.register(Box::new(RecordingSink(received.clone())));

        notifier.key_updated([1u8; 32], 10, "Nabc", b"k", b"v");

        let events = received.lock();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Notification::KeyUpdated { key, value, .. } if key == "k" && value == "v"));
    }
}
