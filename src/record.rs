//! On-disk record codec.
//!
//! A record is the encoded unit of a single mutation, either an upsert or
//! a tombstone. Records are laid out as a fixed 21-byte header followed by
//! the key and value bytes, with no padding:
//!
//! ```text
//! checksum (4) | timestamp (8) | key_len (4) | value_len (4) | kind (1)
//! key (key_len) | value (value_len)
//! ```
//!
//! All integers are big-endian. The checksum is CRC-32 Castagnoli over
//! every field after it: timestamp, lengths, kind byte, key and value.
//! Tombstones carry an empty value; a live record with an empty value is
//! distinguished from a tombstone by the kind byte alone.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::options::HEADER_SIZE;
use crate::util::crc;
use crate::{Error, Result};

/// Kind of a record on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    /// Normal value.
    Value = 0,
    /// Deletion marker (tombstone).
    Tombstone = 1,
}

impl RecordKind {
    /// Create from byte value.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(RecordKind::Value),
            1 => Some(RecordKind::Tombstone),
            _ => None,
        }
    }

    /// Convert to byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this is a deletion marker.
    pub fn is_tombstone(&self) -> bool {
        matches!(self, RecordKind::Tombstone)
    }
}

/// A single decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Checksum over the logical fields, as stored on disk.
    crc: u32,
    /// Creation time in nanoseconds since the epoch. Informational only;
    /// replay order, not timestamps, decides which record wins.
    timestamp: i64,
    /// Key bytes.
    key: Bytes,
    /// Value bytes; empty for tombstones.
    value: Bytes,
    /// Live value or tombstone.
    kind: RecordKind,
}

impl Record {
    /// Create a live record carrying a value.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::create(key.into(), value.into(), RecordKind::Value)
    }

    /// Create a tombstone record for a key.
    pub fn tombstone(key: impl Into<Bytes>) -> Self {
        Self::create(key.into(), Bytes::new(), RecordKind::Tombstone)
    }

    fn create(key: Bytes, value: Bytes, kind: RecordKind) -> Self {
        let timestamp = now_nanos();
        let crc = checksum(timestamp, &key, &value, kind);

        Self {
            crc,
            timestamp,
            key,
            value,
            kind,
        }
    }

    /// Get the key bytes.
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    /// Get the value bytes.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Consume the record, returning the value bytes.
    pub fn into_value(self) -> Bytes {
        self.value
    }

    /// Get the creation timestamp in nanoseconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Check if this record marks a deletion.
    pub fn is_tombstone(&self) -> bool {
        self.kind.is_tombstone()
    }

    /// Total encoded size in bytes, header included.
    pub fn encoded_len(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }

    /// Encode the record to its on-disk representation.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len() as usize);
        buf.put_u32(self.crc);
        buf.put_i64(self.timestamp);
        buf.put_u32(self.key.len() as u32);
        buf.put_u32(self.value.len() as u32);
        buf.put_u8(self.kind.to_byte());
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    /// Decode a record from exactly one encoded record's bytes.
    ///
    /// Fails with a corruption error if the input is shorter than the
    /// header, if the header's declared lengths disagree with the input
    /// length, if the stored checksum does not match the recomputed one,
    /// or if the kind byte is unknown.
    pub fn decode(data: &[u8]) -> Result<Record> {
        if data.len() < HEADER_SIZE {
            return Err(Error::corruption(format!(
                "record too short: {} bytes, header needs {}",
                data.len(),
                HEADER_SIZE
            )));
        }

        let mut buf = data;
        let stored_crc = buf.get_u32();
        let timestamp = buf.get_i64();
        let key_len = buf.get_u32() as usize;
        let value_len = buf.get_u32() as usize;
        let kind_byte = buf.get_u8();

        if HEADER_SIZE + key_len + value_len != data.len() {
            return Err(Error::corruption(format!(
                "record length mismatch: header declares {} bytes, got {}",
                HEADER_SIZE + key_len + value_len,
                data.len()
            )));
        }

        let actual_crc = crc::crc32(&data[4..]);
        if actual_crc != stored_crc {
            return Err(Error::CrcMismatch {
                expected: stored_crc,
                actual: actual_crc,
            });
        }

        let kind = RecordKind::from_byte(kind_byte)
            .ok_or_else(|| Error::corruption(format!("invalid record kind: {}", kind_byte)))?;

        let key = buf.copy_to_bytes(key_len);
        let value = buf.copy_to_bytes(value_len);

        Ok(Record {
            crc: stored_crc,
            timestamp,
            key,
            value,
            kind,
        })
    }
}

/// Compute the checksum over a record's logical fields.
fn checksum(timestamp: i64, key: &[u8], value: &[u8], kind: RecordKind) -> u32 {
    let mut meta = [0u8; HEADER_SIZE - 4];
    meta[0..8].copy_from_slice(&timestamp.to_be_bytes());
    meta[8..12].copy_from_slice(&(key.len() as u32).to_be_bytes());
    meta[12..16].copy_from_slice(&(value.len() as u32).to_be_bytes());
    meta[16] = kind.to_byte();

    crc::crc32_multi(&[&meta, key, value])
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
