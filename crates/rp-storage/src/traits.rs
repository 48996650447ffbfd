//! Storage trait definitions.

use crate::StorageResult;

/// Synchronous, string-keyed persistent store.
///
/// This is the contract the relying party needs from `localStorage` or any
/// equivalent backend.
pub trait KeyValueStore: Send + Sync {
    /// Store a value, replacing any previous value for the key.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove a value. Returns whether the key existed.
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
