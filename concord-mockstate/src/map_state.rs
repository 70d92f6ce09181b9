use std::collections::{BTreeMap, HashMap};

use concord_model::{
    value_hash, OpaqueState, RangeableState, ReadWritableState, ReadableState, StateError,
};

/// A ledger partition backed by an in-memory map.
///
/// Implements every state capability the core consumes. Digest reads apply
/// the same `value_hash` the core uses for agreement prediction, so a record
/// serialized into one shim compares equal through another shim's hashes
/// exactly when the stored bytes agree.
#[derive(Debug, Clone, Default)]
pub struct MapLedgerShim {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MapLedgerShim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a raw value directly, bypassing the serializer. Useful for
    /// planting corrupt or stale entries.
    pub fn insert(&mut self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.to_string(), value);
    }

    /// Drop a key, simulating state that was pruned or never written.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Every stored key, in lexical order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReadableState for MapLedgerShim {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.entries.get(key).cloned())
    }
}

impl ReadWritableState for MapLedgerShim {
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

impl RangeableState for MapLedgerShim {
    fn get_state_range(&self, prefix: &str) -> Result<HashMap<String, Vec<u8>>, StateError> {
        Ok(self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

impl OpaqueState for MapLedgerShim {
    fn get_state_hash(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.entries.get(key).map(|value| value_hash(value)))
    }
}
