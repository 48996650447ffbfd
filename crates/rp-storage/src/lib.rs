//! Key/value storage for the OIDC relying party.
//!
//! The session core only needs a synchronous `get`/`set`/`remove` contract,
//! expressed by [`KeyValueStore`]. Two backends ship with the crate:
//! - [`MemoryStore`]: process-local map, for tests and ephemeral sessions
//! - [`JsonFileStore`]: a single JSON object on disk, written through on every change

mod file;
mod keys;
mod memory;
mod traits;

pub use file::JsonFileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the default on-disk store at `~/.oidc-rp/store.json`.
pub fn create_storage() -> StorageResult<Box<dyn KeyValueStore>> {
    let paths = rp_config::Paths::new().map_err(|e| StorageError::Backend(e.to_string()))?;
    let store = JsonFileStore::open_in(&paths)?;
    Ok(Box::new(store))
}
