//! Ledger state capabilities.
//!
//! The underlying key-value ledger is a collaborator. The core only ever sees
//! it through the narrow capability traits below, passed in per call: a point
//! read, a point write, a prefix scan, and a digest-only read for private
//! partitions. No trait guarantees any iteration order beyond "every key under
//! the prefix is returned exactly once".

use std::collections::HashMap;
use thiserror::Error;

/// Error surfaced by a ledger shim.
///
/// The ledger's own failure text flows through unchanged; layers above add
/// key and operation context when they wrap it.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StateError(pub String);

impl From<String> for StateError {
    fn from(s: String) -> Self {
        StateError(s)
    }
}

impl From<&str> for StateError {
    fn from(s: &str) -> Self {
        StateError(s.to_string())
    }
}

/// Point reads against a ledger partition.
///
/// `Ok(None)` means the key is absent, which is a normal answer and never an
/// error.
pub trait ReadableState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError>;
}

/// Point reads and blind writes against a ledger partition.
pub trait ReadWritableState: ReadableState {
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError>;
}

/// Prefix scans against a ledger partition.
///
/// Returns every key that starts with `prefix`, mapped to its value, with the
/// full key preserved.
pub trait RangeableState {
    fn get_state_range(&self, prefix: &str) -> Result<HashMap<String, Vec<u8>>, StateError>;
}

/// Digest-only reads against a private partition.
///
/// Other organizations cannot see the plaintext of a private partition, only
/// the per-key digest of each stored value. `Ok(None)` means the key is
/// absent.
pub trait OpaqueState {
    fn get_state_hash(&self, key: &str) -> Result<Option<Vec<u8>>, StateError>;
}

/// The digest a private partition exposes for a stored value.
///
/// The lifecycle core predicts `get_state_hash` results with this function
/// during commit-time agreement computation, so every ledger backing a
/// private partition must apply the same digest.
pub fn value_hash(value: &[u8]) -> Vec<u8> {
    blake3::hash(value).as_bytes().to_vec()
}
