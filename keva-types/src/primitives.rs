use std::fmt::{self, Display};
use std::sync::Arc;

/// Immutable byte sequence, cheaply cloneable.
///
/// The overlay passes namespaces, keys and values through many layers
/// (cache, store, codec, validator); `Arc<[u8]>` avoids re-allocating on
/// every clone while keeping value semantics for comparisons and ordering.
pub type Bytes = Arc<[u8]>;

pub fn bytes_from(v: impl Into<Vec<u8>>) -> Bytes {
    Arc::from(v.into().into_boxed_slice())
}

/// Reserved key under which a namespace's display name is stored.
pub const NAMESPACE_DISPLAY_NAME_KEY: &[u8] = b"_KEVA_NS_";

/// Prefix marking an association key: `"_g:" || base58check(to_namespace)`.
pub const ASSOCIATION_KEY_PREFIX: &[u8] = b"_g:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LengthError {
    #[error("namespace id is {0} bytes, maximum is {1}")]
    Namespace(usize, usize),
    #[error("key is {0} bytes, maximum is {1}")]
    Key(usize, usize),
    #[error("value is {0} bytes, maximum is {1}")]
    Value(usize, usize),
}

macro_rules! bytes_newtype {
    ($name:ident, $max:expr, $err:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Bytes);

        impl $name {
            pub const MAX_LEN: usize = $max;

            pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, LengthError> {
                let v = bytes.into();
                if v.len() > Self::MAX_LEN {
                    return Err(LengthError::$err(v.len(), Self::MAX_LEN));
                }
                Ok(Self(Arc::from(v.into_boxed_slice())))
            }

            /// Builds without re-checking the length invariant; callers must have
            /// validated the source (e.g. data already round-tripped through the
            /// codec, which never emits an oversized value).
            pub fn new_unchecked(bytes: Bytes) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&faster_hex::hex_string(&self.0))
            }
        }
    };
}

bytes_newtype!(NamespaceId, 255, Namespace);
bytes_newtype!(Key, 255, Key);
bytes_newtype!(Value, 520, Value);

impl Key {
    pub fn namespace_display_name() -> Self {
        Self::new(NAMESPACE_DISPLAY_NAME_KEY).expect("constant key fits in the length budget")
    }

    pub fn is_namespace_display_name(&self) -> bool {
        self.as_ref() == NAMESPACE_DISPLAY_NAME_KEY
    }

    /// Returns the base58check-encoded target namespace if this key has the
    /// `"_g:<encoded>"` association shape.
    pub fn association_target(&self) -> Option<&[u8]> {
        self.as_ref().strip_prefix(ASSOCIATION_KEY_PREFIX)
    }
}

pub type TxHash = [u8; 32];

/// Reference to a transaction output: `(tx_hash, vout)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Outpoint {
    pub tx_hash: TxHash,
    pub vout: u32,
}

impl Outpoint {
    pub fn new(tx_hash: TxHash, vout: u32) -> Self {
        Self { tx_hash, vout }
    }
}

impl Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", faster_hex::hex_string(&self.tx_hash), self.vout)
    }
}

pub type Height = u32;
