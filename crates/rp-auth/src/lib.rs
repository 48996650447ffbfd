//! OpenID Connect implicit-flow session orchestration for browser-resident
//! relying parties.
//!
//! The crate decides whether a user is authenticated and, if not, drives them
//! through provider selection, dynamic client registration, the
//! authentication request and validation of the redirect back. Token
//! cryptography and the registration protocol live behind the
//! [`RelyingPartyLibrary`] contract. Page access lives behind [`Browser`].
//!
//! Two kinds of entries are persisted through the [`KeyValueStore`]:
//! - `oidc.rp.by-state.<state>`: the provider an auth request was sent to
//! - `oidc.rp.by-provider.<provider_uri>`: a serialized client registration
//!
//! # Example
//!
//! ```ignore
//! let controller = SessionController::new(store, library, browser, Config::new());
//! if let Some(web_id) = controller.current_user().await? {
//!     tracing::info!(web_id = %web_id, "Logged in");
//! } else {
//!     controller.login(None).await?;
//! }
//! ```

mod browser;
mod client;
mod error;
pub mod login_fsm;
mod popup;
mod registry;
pub mod rp;
mod selector;
mod session;
pub mod uri_state;

#[cfg(test)]
mod tests;

pub use browser::{Browser, PopupRequest, PopupWindow};
pub use client::RegisterClientOptions;
pub use error::{AuthError, AuthResult};
pub use login_fsm::{LoginMachine, LoginMachineInput, LoginMachineState, LoginState};
pub use popup::{
    popup_channel, PopupEvent, PopupMessageSender, ProviderPopup, DEFAULT_POPUP_PAGE,
    PROVIDER_SELECTED,
};
pub use registry::{key_by_provider, key_by_state, ProviderRegistry};
pub use rp::{
    AuthRequestOptions, AuthResponse, AuthenticateDefaults, DecodedIdToken, IdTokenPayload,
    ProviderConfiguration, ProviderInfo, RegistrationMetadata, RegistrationOptions,
    RelyingPartyClient, RelyingPartyLibrary, RpLibraryError, SharedClient,
    STALE_SIGNING_KEY_MESSAGE,
};
pub use selector::{provider_from_current_uri, DefaultProviderSelector, ProviderSelector};
pub use session::{AuthSession, LogoutOutcome, SessionController, RETURN_TO_URL_PARAM};
pub use uri_state::{extract_state, has_auth_response, UriLocation};

pub use rp_config::Config;
pub use rp_storage::{KeyValueStore, MemoryStore};
