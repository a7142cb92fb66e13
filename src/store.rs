//! Key-value persistence used for session and identity state.
//!
//! The actual persistence mechanism belongs to the host. The core only needs a handful of string
//! and integer slots, and treats any storage failure as a missing value.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

pub(crate) const TNT_ID: &str = "tnt.id";
pub(crate) const THIRD_PARTY_ID: &str = "third.party.id";
pub(crate) const EDGE_HOST: &str = "edge.host";
pub(crate) const SESSION_ID: &str = "session.id";
pub(crate) const SESSION_TIMESTAMP: &str = "session.timestamp";

/// Storage for the persisted state of the core.
///
/// Implementations must not panic. Reads that fail should return `None`; writes that fail should
/// be dropped (and possibly logged).
pub trait KeyValueStore: Send {
    /// Read a string value.
    fn get_string(&self, key: &str) -> Option<String>;
    /// Read an integer value.
    fn get_i64(&self, key: &str) -> Option<i64>;
    /// Write a string value.
    fn set_string(&self, key: &str, value: &str);
    /// Write an integer value.
    fn set_i64(&self, key: &str, value: i64);
    /// Remove a value of any type.
    fn remove(&self, key: &str);
}

#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    String(String),
    Integer(i64),
}

/// A thread-safe in-memory [`KeyValueStore`].
///
/// Cloning produces another handle to the same storage, which is handy for hosts that want to
/// inspect what the core persisted.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    values: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Return `true` if the store holds a value for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .map(|values| values.contains_key(key))
            .unwrap_or(false)
    }
}

impl KeyValueStore for InMemoryStore {
    fn get_string(&self, key: &str) -> Option<String> {
        // Poisoned lock reads as a missing value.
        let values = self.values.read().ok()?;
        match values.get(key)? {
            StoredValue::String(s) => Some(s.clone()),
            StoredValue::Integer(_) => None,
        }
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        let values = self.values.read().ok()?;
        match values.get(key)? {
            StoredValue::Integer(i) => Some(*i),
            StoredValue::String(_) => None,
        }
    }

    fn set_string(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_owned(), StoredValue::String(value.to_owned()));
        }
    }

    fn set_i64(&self, key: &str, value: i64) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_owned(), StoredValue::Integer(value));
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.write() {
            values.remove(key);
        }
    }
}
