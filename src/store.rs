//! Ordered byte-key store.
//!
//! Everything the module persists (orders, indices, markets, pools, delist
//! requests) lives in one ordered key space. The host chain supplies the real
//! store. `MemStore` backs tests and the simulator.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::key_codec::CodecError;

pub type KvIter<'a> = Box<dyn DoubleEndedIterator<Item = (&'a [u8], &'a [u8])> + 'a>;

pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<&[u8]>;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);

    /// Keys in `[start, end)`, ascending. Reverse with `.rev()`.
    fn range<'a>(&'a self, start: &[u8], end: &[u8]) -> KvIter<'a>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    fn prefix<'a>(&'a self, prefix: &[u8]) -> KvIter<'a> {
        match prefix_end(prefix) {
            Some(end) => self.range(prefix, &end),
            None => self.range(prefix, &[0xff; 64]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("order {0} not found in store")]
    OrderNotFound(String),

    #[error("key codec: {0}")]
    Codec(#[from] CodecError),

    #[error("value serialization failed: {0}")]
    Serialization(String),
}

/// Smallest key greater than every key starting with `prefix`.
/// None when the prefix is all 0xff.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

pub fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn range<'a>(&'a self, start: &[u8], end: &[u8]) -> KvIter<'a> {
        if start >= end {
            return Box::new(std::iter::empty());
        }
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(start), Bound::Excluded(end));
        Box::new(
            self.entries
                .range::<[u8], _>(bounds)
                .map(|(k, v)| (k.as_slice(), v.as_slice())),
        )
    }
}
