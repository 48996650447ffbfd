//! Persistent provider bindings.
//!
//! [`ProviderRegistry`] holds no state of its own. It maps `state` tokens to
//! the provider they were issued for, and provider URIs to the serialized
//! client registered with them, both through the shared [`KeyValueStore`].

use crate::{AuthError, AuthResult};
use rp_storage::{KeyValueStore, StorageKeys};
use std::sync::Arc;
use tracing::debug;

/// Store key for the provider bound to `state`.
///
/// Fails with `InvalidState` if `state` is empty.
pub fn key_by_state(state: &str) -> AuthResult<String> {
    if state.is_empty() {
        return Err(AuthError::InvalidState);
    }
    Ok(StorageKeys::by_state(state))
}

/// Store key for the client registered with `provider_uri`.
pub fn key_by_provider(provider_uri: &str) -> String {
    StorageKeys::by_provider(provider_uri)
}

/// Facade over the store for state and client bindings.
#[derive(Clone)]
pub struct ProviderRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl ProviderRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Record that `state` was issued for `provider_uri`.
    pub fn bind_state_to_provider(&self, state: &str, provider_uri: &str) -> AuthResult<()> {
        let key = key_by_state(state)?;
        self.store.set(&key, provider_uri)?;
        debug!(state = %state, provider_uri = %provider_uri, "Bound state to provider");
        Ok(())
    }

    /// Provider previously bound to `state`, if any.
    pub fn provider_for_state(&self, state: &str) -> AuthResult<Option<String>> {
        let key = key_by_state(state)?;
        Ok(self.store.get(&key)?)
    }

    /// Persist a serialized client registration for `provider_uri`.
    pub fn store_client(&self, provider_uri: &str, serialized: &str) -> AuthResult<()> {
        self.store.set(&key_by_provider(provider_uri), serialized)?;
        debug!(provider_uri = %provider_uri, "Stored client registration");
        Ok(())
    }

    /// Serialized client registration for `provider_uri`, if any.
    pub fn stored_client(&self, provider_uri: &str) -> AuthResult<Option<String>> {
        Ok(self.store.get(&key_by_provider(provider_uri))?)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").finish_non_exhaustive()
    }
}
