//! Deterministic serialization for the keva wire/on-disk formats.
//!
//! `VARINT` uses a continuation-bit little-endian encoding, 7 payload bits
//! per byte (Design Note §9): the low 7 bits of each byte carry payload,
//! the high bit is set on every byte except the last. This is the encoding
//! used for `vout` wherever it appears (including inside store keys, see
//! `keva-store`) and for every variable-length field packed into a value
//! blob (`Entry`, `TxUndo`).
use crate::entry::Entry;
use crate::primitives::{bytes_from, Key, NamespaceId, Outpoint, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of buffer while decoding")]
    UnexpectedEof,
    #[error("varint is wider than 64 bits")]
    VarintOverflow,
    #[error("decoded field exceeds its maximum length")]
    FieldTooLarge,
    #[error("trailing bytes after a fully decoded value")]
    TrailingBytes,
}

pub type CodecResult<T> = Result<T, CodecError>;

pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Reads a varint from `buf`, returning the value and the number of bytes
/// consumed.
pub fn read_varint(buf: &[u8]) -> CodecResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 64 {
            return Err(CodecError::VarintOverflow);
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(CodecError::UnexpectedEof)
}

/// A forward-only cursor over a decode buffer, used so the handful of
/// multi-field decoders below (`Entry`, `Outpoint`, `TxUndo`) read
/// linearly without juggling explicit offsets.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining().len() < n {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_varint(&mut self) -> CodecResult<u64> {
        let (value, len) = read_varint(self.remaining())?;
        self.pos += len;
        Ok(value)
    }

    fn take_varint_bytes(&mut self, max_len: usize) -> CodecResult<&'a [u8]> {
        let len = self.take_varint()? as usize;
        if len > max_len {
            return Err(CodecError::FieldTooLarge);
        }
        self.take(len)
    }

    fn finish(self) -> CodecResult<()> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes)
        }
    }
}

fn write_varint_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

pub fn encode_outpoint(buf: &mut Vec<u8>, outpoint: &Outpoint) {
    buf.extend_from_slice(&outpoint.tx_hash);
    write_varint(buf, outpoint.vout as u64);
}

fn decode_outpoint(cursor: &mut Cursor) -> CodecResult<Outpoint> {
    let tx_hash: [u8; 32] = cursor.take(32)?.try_into().map_err(|_| CodecError::UnexpectedEof)?;
    let vout = cursor.take_varint()?;
    if vout > u32::MAX as u64 {
        return Err(CodecError::VarintOverflow);
    }
    Ok(Outpoint::new(tx_hash, vout as u32))
}

pub fn encode_entry(entry: &Entry) -> Vec<u8> {
    let mut buf = Vec::with_capacity(entry.value.len() + 16);
    write_varint_bytes(&mut buf, entry.value.as_ref());
    write_varint(&mut buf, entry.height as u64);
    encode_outpoint(&mut buf, &entry.update_outpoint);
    buf
}

pub fn decode_entry(buf: &[u8]) -> CodecResult<Entry> {
    let mut cursor = Cursor::new(buf);
    let value = Value::new_unchecked(bytes_from(cursor.take_varint_bytes(Value::MAX_LEN)?.to_vec()));
    let height = cursor.take_varint()?;
    if height > u32::MAX as u64 {
        return Err(CodecError::VarintOverflow);
    }
    let update_outpoint = decode_outpoint(&mut cursor)?;
    cursor.finish()?;
    Ok(Entry::new(value, height as u32, update_outpoint))
}

/// `TxUndo` layout (spec §4.6): `ns ‖ key ‖ is_new: u8 ‖ (is_new ? ∅ : entry)`.
/// `ns` and `key` are varint-length-prefixed since this is a value blob, not
/// a store key (store keys never embed a length prefix, see `keva-store`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxUndo {
    pub ns: NamespaceId,
    pub key: Key,
    pub is_new: bool,
    pub old_entry: Option<Entry>,
}

impl TxUndo {
    pub fn new(ns: NamespaceId, key: Key, is_new: bool, old_entry: Option<Entry>) -> Self {
        debug_assert_eq!(is_new, old_entry.is_none(), "is_new must mirror old_entry's presence");
        Self { ns, key, is_new, old_entry }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint_bytes(&mut buf, self.ns.as_ref());
        write_varint_bytes(&mut buf, self.key.as_ref());
        buf.push(self.is_new as u8);
        if let Some(entry) = &self.old_entry {
            buf.extend(encode_entry(entry));
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        let mut cursor = Cursor::new(buf);
        let ns = NamespaceId::new_unchecked(bytes_from(cursor.take_varint_bytes(NamespaceId::MAX_LEN)?.to_vec()));
        let key = Key::new_unchecked(bytes_from(cursor.take_varint_bytes(Key::MAX_LEN)?.to_vec()));
        let is_new = match cursor.take(1)?[0] {
            0 => false,
            1 => true,
            _ => return Err(CodecError::FieldTooLarge),
        };
        let old_entry = if is_new { None } else { Some(decode_entry(cursor.remaining())?) };
        if !is_new {
            // decode_entry already consumed the remainder of the buffer via its own cursor;
            // fast-forward this cursor to match so `finish` below sees no trailing bytes.
            cursor.pos = cursor.buf.len();
        }
        cursor.finish()?;
        Ok(TxUndo::new(ns, key, is_new, old_entry))
    }
}
