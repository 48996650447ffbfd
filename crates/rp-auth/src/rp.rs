//! Contract with the external OIDC relying party library.
//!
//! The session core never signs, fetches keys or parses JWTs itself. It talks
//! to an adapter implementing [`RelyingPartyLibrary`] and the
//! [`RelyingPartyClient`] objects it hands out.

use async_trait::async_trait;
use rp_storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Message the RP library reports when the ID Token's signing key is unknown.
pub const STALE_SIGNING_KEY_MESSAGE: &str = "Cannot resolve signing key for ID Token.";

/// Failure reported by the RP library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpLibraryError {
    /// No key in the provider's JWK set matches the ID Token.
    #[error("{}", STALE_SIGNING_KEY_MESSAGE)]
    SigningKeyUnresolved,

    /// The provider rejected the request, or the response failed a check.
    #[error("{0}")]
    Rejected(String),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl RpLibraryError {
    /// True when the failure means the provider rotated its signing keys.
    pub fn is_stale_signing_key(&self) -> bool {
        match self {
            RpLibraryError::SigningKeyUnresolved => true,
            RpLibraryError::Rejected(msg) | RpLibraryError::Other(msg) => {
                msg == STALE_SIGNING_KEY_MESSAGE
            }
            RpLibraryError::Network(_) => false,
        }
    }
}

/// Provider metadata (the subset of the discovery document the core reads).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The provider a client is registered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider URI the client was registered against.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ProviderConfiguration>,
}

impl ProviderInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            configuration: None,
        }
    }

    /// The provider's `end_session_endpoint`, if advertised.
    pub fn end_session_endpoint(&self) -> Option<&str> {
        self.configuration
            .as_ref()
            .and_then(|c| c.end_session_endpoint.as_deref())
            .filter(|e| !e.is_empty())
    }
}

/// Dynamic client registration metadata sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationMetadata {
    pub issuer: String,
    pub grant_types: Vec<String>,
    pub redirect_uris: Vec<String>,
    pub response_types: Vec<String>,
    pub scope: String,
}

/// Defaults the registered client applies to every authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateDefaults {
    pub redirect_uri: String,
    pub response_type: String,
}

/// Options passed alongside registration metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationOptions {
    pub authenticate: AuthenticateDefaults,
}

/// Per-request overrides for `create_request`. Empty means "use the
/// registration defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Claims of a decoded ID Token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(flatten)]
    pub claims: BTreeMap<String, Value>,
}

/// A decoded (already verified) ID Token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedIdToken {
    #[serde(default)]
    pub header: Value,
    pub payload: IdTokenPayload,
}

/// Result of a successful response validation.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    pub decoded: DecodedIdToken,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("id_token", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("decoded", &self.decoded)
            .finish()
    }
}

/// A registered relying party client, bound to one provider.
#[async_trait]
pub trait RelyingPartyClient: Send + Sync {
    /// Provider this client is registered with.
    fn provider(&self) -> &ProviderInfo;

    /// Build an authentication request URI. The library generates the
    /// `state` (and nonce) and keeps what it needs in `store`.
    async fn create_request(
        &self,
        options: &AuthRequestOptions,
        store: &dyn KeyValueStore,
    ) -> Result<String, RpLibraryError>;

    /// Validate the authentication response carried by `current_uri`.
    async fn validate_response(
        &self,
        current_uri: &str,
        store: &dyn KeyValueStore,
    ) -> Result<AuthResponse, RpLibraryError>;

    /// Serialize the client so it can be restored with
    /// [`RelyingPartyLibrary::from_serialized`].
    fn serialize(&self) -> Result<String, RpLibraryError>;
}

impl fmt::Debug for dyn RelyingPartyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelyingPartyClient")
            .field("provider", self.provider())
            .finish()
    }
}

/// Shared handle to a registered client.
pub type SharedClient = Arc<dyn RelyingPartyClient>;

/// Entry points of the RP library that do not need a client.
#[async_trait]
pub trait RelyingPartyLibrary: Send + Sync {
    /// Perform dynamic client registration against `provider_uri`.
    async fn register(
        &self,
        provider_uri: &str,
        registration: &RegistrationMetadata,
        options: &RegistrationOptions,
        store: &dyn KeyValueStore,
    ) -> Result<SharedClient, RpLibraryError>;

    /// Rebuild a client from its serialized form.
    async fn from_serialized(&self, serialized: &str) -> Result<SharedClient, RpLibraryError>;

    /// Issue a proof-of-possession token for `resource_uri` from a validated
    /// session.
    async fn issue_pop_token(
        &self,
        resource_uri: &str,
        session: &AuthResponse,
    ) -> Result<String, RpLibraryError>;
}
