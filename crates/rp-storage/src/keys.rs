//! Storage key schemes.

/// Key prefixes used by the relying party.
pub struct StorageKeys;

impl StorageKeys {
    /// Prefix for serialized client registrations, keyed by provider URI.
    pub const BY_PROVIDER_PREFIX: &'static str = "oidc.rp.by-provider.";

    /// Prefix for provider URIs, keyed by the `state` of an auth request.
    pub const BY_STATE_PREFIX: &'static str = "oidc.rp.by-state.";

    /// `oidc.rp.by-provider.<provider_uri>`
    pub fn by_provider(provider_uri: &str) -> String {
        format!("{}{}", Self::BY_PROVIDER_PREFIX, provider_uri)
    }

    /// `oidc.rp.by-state.<state>`
    pub fn by_state(state: &str) -> String {
        format!("{}{}", Self::BY_STATE_PREFIX, state)
    }
}
