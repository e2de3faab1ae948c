//! In-memory key directory.
//!
//! The directory maps every live key to the on-disk location of its most
//! recent record. It is process-private, never persisted, and rebuilt
//! from the segment files on open. Tombstoned keys have no entry.

use std::collections::HashMap;

use bytes::Bytes;

/// Location of one record's bytes on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    /// Id of the segment holding the record.
    pub segment_id: u64,
    /// Byte offset of the record's first byte within the segment.
    pub offset: u64,
    /// Total record size in bytes, header included.
    pub size: u64,
}

impl Locator {
    /// Create a new locator.
    pub fn new(segment_id: u64, offset: u64, size: u64) -> Self {
        Self {
            segment_id,
            offset,
            size,
        }
    }
}

/// Map from key bytes to the locator of the key's live record.
#[derive(Debug, Default)]
pub struct KeyDir {
    map: HashMap<Bytes, Locator>,
}

impl KeyDir {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the locator for a key.
    pub fn lookup(&self, key: &[u8]) -> Option<Locator> {
        self.map.get(key).copied()
    }

    /// Insert or replace the locator for a key.
    pub fn upsert(&mut self, key: Bytes, locator: Locator) {
        self.map.insert(key, locator);
    }

    /// Remove a key, returning its previous locator if present.
    pub fn remove(&mut self, key: &[u8]) -> Option<Locator> {
        self.map.remove(key)
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the directory holds no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of all live keys, in no particular order.
    pub fn keys(&self) -> Vec<Bytes> {
        self.map.keys().cloned().collect()
    }
}
