//! Provider selection.

use crate::browser::Browser;
use crate::popup::ProviderPopup;
use crate::registry::ProviderRegistry;
use crate::uri_state::{extract_state, UriLocation};
use crate::AuthResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Resolves which provider a login should use.
#[async_trait]
pub trait ProviderSelector: Send + Sync {
    /// Resolve a provider URI. `provider_uri` is the caller's explicit choice,
    /// if any. `Ok(None)` means no provider could be determined.
    async fn select_provider(&self, provider_uri: Option<&str>) -> AuthResult<Option<String>>;
}

/// Provider bound to the `state` in the current URI's fragment, if any.
pub fn provider_from_current_uri(
    browser: &dyn Browser,
    registry: &ProviderRegistry,
) -> AuthResult<Option<String>> {
    let current = browser.current_location();
    match extract_state(current.as_deref(), UriLocation::Hash)? {
        Some(state) => registry.provider_for_state(&state),
        None => Ok(None),
    }
}

/// Explicit argument, then the redirect-back `state`, then the popup.
pub struct DefaultProviderSelector {
    browser: Arc<dyn Browser>,
    registry: ProviderRegistry,
    popup: ProviderPopup,
}

impl DefaultProviderSelector {
    pub fn new(browser: Arc<dyn Browser>, registry: ProviderRegistry, popup: ProviderPopup) -> Self {
        Self {
            browser,
            registry,
            popup,
        }
    }
}

#[async_trait]
impl ProviderSelector for DefaultProviderSelector {
    async fn select_provider(&self, provider_uri: Option<&str>) -> AuthResult<Option<String>> {
        if let Some(uri) = provider_uri.filter(|u| !u.is_empty()) {
            debug!(provider_uri = %uri, "Using explicit provider");
            return Ok(Some(uri.to_string()));
        }

        if let Some(uri) = provider_from_current_uri(self.browser.as_ref(), &self.registry)? {
            debug!(provider_uri = %uri, "Resolved provider from redirect state");
            return Ok(Some(uri));
        }

        self.popup.select().await.map(Some)
    }
}
