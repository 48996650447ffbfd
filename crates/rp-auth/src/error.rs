//! Authentication error types.

use crate::rp::RpLibraryError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login or registration attempted without a provider URI
    #[error("Cannot load or register client, providerURI missing")]
    MissingProviderUri,

    /// Empty or missing `state` token
    #[error("No state provided")]
    InvalidState,

    /// A non-empty URI that is not a parseable absolute URI
    #[error("Malformed URI '{uri}': {reason}")]
    MalformedUri { uri: String, reason: String },

    /// No relying party client could be loaded or registered
    #[error("Could not load or register a RelyingParty client")]
    NoClient,

    /// The request URI built by the RP library carries no `state`
    #[error("Invalid authentication request uri")]
    InvalidAuthRequestUri,

    /// Dynamic client registration failed
    #[error("Client registration failed: {0}")]
    RegistrationFailed(#[source] RpLibraryError),

    /// Building the authentication request failed
    #[error("Authentication request failed: {0}")]
    RequestFailed(#[source] RpLibraryError),

    /// A stored client registration could not be restored
    #[error("Could not restore stored client: {0}")]
    ClientLoadFailed(#[source] RpLibraryError),

    /// The authentication response did not validate
    #[error("Authentication response validation failed: {0}")]
    ResponseValidationFailed(#[source] RpLibraryError),

    /// The ID Token's signing key could not be resolved (provider key rotation)
    #[error("Cannot resolve signing key for ID Token")]
    StaleSigningKey,

    /// The provider selection popup closed without a selection
    #[error("Provider selection cancelled")]
    SelectionCancelled,

    /// Another login is still running against this session
    #[error("A login is already in progress")]
    LoginInProgress,

    /// No validated session exists
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the login FSM
    #[error("Invalid login state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] rp_storage::StorageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Build a `MalformedUri` error.
    pub fn malformed_uri(uri: &str, reason: impl ToString) -> Self {
        AuthError::MalformedUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Classify a response validation failure.
    ///
    /// An unresolvable signing key becomes `StaleSigningKey`; everything else
    /// is wrapped as `ResponseValidationFailed`.
    pub fn from_validation(error: RpLibraryError) -> Self {
        if error.is_stale_signing_key() {
            AuthError::StaleSigningKey
        } else {
            AuthError::ResponseValidationFailed(error)
        }
    }

    /// Returns true if the caller should simply retry `login`.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AuthError::StaleSigningKey)
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
