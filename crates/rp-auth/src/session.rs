//! Authentication session controller.
//!
//! [`SessionController`] owns the single [`AuthSession`] of an application
//! context and drives `login`, `logout` and `current_user`. Every login walks
//! the explicit machine in [`crate::login_fsm`], so a second login arriving
//! while one is still running is rejected with `LoginInProgress` instead of
//! racing the first one.
//!
//! Session fields live behind a `std::sync::Mutex` that is never held across
//! an `.await`.

use crate::browser::Browser;
use crate::login_fsm::{LoginMachine, LoginMachineInput, LoginState};
use crate::popup::ProviderPopup;
use crate::registry::ProviderRegistry;
use crate::rp::{
    AuthRequestOptions, AuthResponse, DecodedIdToken, RelyingPartyLibrary, RpLibraryError,
    SharedClient,
};
use crate::selector::{provider_from_current_uri, DefaultProviderSelector, ProviderSelector};
use crate::uri_state::{extract_state, has_auth_response, set_query_param, strip_fragment, UriLocation};
use crate::{AuthError, AuthResult};
use rp_config::Config;
use rp_storage::KeyValueStore;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use url::Url;

/// Query parameter carrying the page to come back to after provider logout.
pub const RETURN_TO_URL_PARAM: &str = "returnToUrl";

/// In-memory authentication state.
#[derive(Clone, Default)]
pub struct AuthSession {
    /// Registered client, bound to `provider_uri`.
    pub current_client: Option<SharedClient>,
    /// Provider currently in use.
    pub provider_uri: Option<String>,
    pub web_id: Option<String>,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    last_response: Option<AuthResponse>,
}

impl AuthSession {
    /// Forget the user and tokens. The client binding is kept.
    fn clear_user(&mut self) {
        self.web_id = None;
        self.id_token = None;
        self.access_token = None;
        self.last_response = None;
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("current_client", &self.current_client)
            .field("provider_uri", &self.provider_uri)
            .field("web_id", &self.web_id)
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What `logout` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The window was sent to the provider's end-session endpoint.
    Redirected { url: String },
    /// Only local state was cleared.
    LocalOnly,
}

/// Puts the machine into `Failed` unless the login settled. Covers both
/// errors and a dropped login future.
struct LoginAttempt<'a> {
    fsm: &'a Mutex<LoginMachine>,
    settled: bool,
}

impl LoginAttempt<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut fsm = self.fsm.lock().unwrap_or_else(PoisonError::into_inner);
        if LoginState::from(fsm.state()).is_transient() {
            let _ = fsm.consume(&LoginMachineInput::Failure);
            debug!("Login attempt failed");
        }
    }
}

/// Orchestrates provider selection, client registration and the
/// request/response halves of the implicit flow.
pub struct SessionController {
    pub(crate) registry: ProviderRegistry,
    pub(crate) library: Arc<dyn RelyingPartyLibrary>,
    pub(crate) browser: Arc<dyn Browser>,
    selector: Arc<dyn ProviderSelector>,
    pub(crate) config: Config,
    fsm: Mutex<LoginMachine>,
    session: Mutex<AuthSession>,
    pub(crate) redirect_uri: Mutex<Option<String>>,
}

impl SessionController {
    /// Create a controller using the default popup-based provider selector.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        library: Arc<dyn RelyingPartyLibrary>,
        browser: Arc<dyn Browser>,
        config: Config,
    ) -> Self {
        let registry = ProviderRegistry::new(store);
        let popup = ProviderPopup::new(browser.clone(), config.popup.clone());
        let selector = Arc::new(DefaultProviderSelector::new(
            browser.clone(),
            registry.clone(),
            popup,
        ));

        Self {
            registry,
            library,
            browser,
            selector,
            config,
            fsm: Mutex::new(LoginMachine::new()),
            session: Mutex::new(AuthSession::default()),
            redirect_uri: Mutex::new(None),
        }
    }

    /// Replace the provider selector.
    pub fn with_selector(mut self, selector: Arc<dyn ProviderSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Use the default selector with a custom popup page.
    pub fn with_popup_page(mut self, page_source: impl Into<String>) -> Self {
        let popup = ProviderPopup::new(self.browser.clone(), self.config.popup.clone())
            .with_page_source(page_source);
        self.selector = Arc::new(DefaultProviderSelector::new(
            self.browser.clone(),
            self.registry.clone(),
            popup,
        ));
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub(crate) fn lock_session(&self) -> MutexGuard<'_, AuthSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the session.
    pub fn session(&self) -> AuthSession {
        self.lock_session().clone()
    }

    pub fn web_id(&self) -> Option<String> {
        self.lock_session().web_id.clone()
    }

    pub fn id_token(&self) -> Option<String> {
        self.lock_session().id_token.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock_session().access_token.clone()
    }

    pub fn provider_uri(&self) -> Option<String> {
        self.lock_session().provider_uri.clone()
    }

    pub fn current_client(&self) -> Option<SharedClient> {
        self.lock_session().current_client.clone()
    }

    /// Redirect URI used by the last registration.
    pub fn redirect_uri(&self) -> Option<String> {
        self.redirect_uri
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current state of the login machine.
    pub fn login_state(&self) -> LoginState {
        let fsm = self.fsm.lock().unwrap_or_else(PoisonError::into_inner);
        LoginState::from(fsm.state())
    }

    fn transition(&self, input: LoginMachineInput) -> AuthResult<LoginState> {
        let mut fsm = self.fsm.lock().unwrap_or_else(PoisonError::into_inner);
        let old_state = LoginState::from(fsm.state());

        fsm.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = LoginState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Login state transition"
            );
        }

        Ok(new_state)
    }

    /// The browser's current location, or `None` when the host exposes none.
    pub fn current_location(&self) -> Option<String> {
        self.browser.current_location().filter(|l| !l.is_empty())
    }

    /// The current location with its fragment removed.
    pub fn current_location_no_hash(&self) -> AuthResult<Option<String>> {
        self.current_location()
            .map(|location| strip_fragment(&location))
            .transpose()
    }

    /// Resolve the user's WebID, logging in.
    ///
    /// Resolves with the WebID when the current URI carries a valid response,
    /// or `None` when a redirect to the provider was issued, no provider was
    /// selected, or the provider's signing keys rotated.
    pub async fn login(&self, provider_uri: Option<&str>) -> AuthResult<Option<String>> {
        self.transition(LoginMachineInput::LoginRequested)
            .map_err(|_| AuthError::LoginInProgress)?;
        let attempt = LoginAttempt {
            fsm: &self.fsm,
            settled: false,
        };

        let web_id = self.run_login(provider_uri).await?;
        attempt.settle();
        Ok(web_id)
    }

    async fn run_login(&self, provider_uri: Option<&str>) -> AuthResult<Option<String>> {
        self.clear_current_user();

        let selected = self
            .selector
            .select_provider(provider_uri)
            .await?
            .filter(|uri| !uri.is_empty());

        let Some(provider_uri) = selected else {
            debug!("No provider selected");
            self.transition(LoginMachineInput::NoProvider)?;
            return Ok(None);
        };
        self.transition(LoginMachineInput::ProviderResolved)?;

        let client = self.load_or_register_client(&provider_uri).await?;
        self.dispatch(&client, true).await
    }

    /// Forget the current user and tokens.
    pub fn clear_current_user(&self) {
        self.lock_session().clear_user();
    }

    /// Clear the session and, if the provider advertises an end-session
    /// endpoint, redirect there so it can drop its own session cookies.
    pub fn logout(&self) -> AuthResult<LogoutOutcome> {
        self.transition(LoginMachineInput::LogoutRequested)
            .map_err(|_| AuthError::LoginInProgress)?;
        self.clear_current_user();

        let Some(endpoint) = self.provider_end_session_endpoint() else {
            debug!("No end session endpoint, logged out locally");
            return Ok(LogoutOutcome::LocalOnly);
        };

        let url = match self.current_location() {
            Some(location) => set_query_param(&endpoint, RETURN_TO_URL_PARAM, &location)?,
            None => Url::parse(&endpoint)
                .map_err(|e| AuthError::malformed_uri(&endpoint, e))?
                .to_string(),
        };

        info!(url = %url, "Redirecting to provider end session endpoint");
        self.browser.redirect_to(&url)?;
        Ok(LogoutOutcome::Redirected { url })
    }

    /// The cached WebID, or a login against the provider bound to the
    /// current URI's `state`, or `None`.
    pub async fn current_user(&self) -> AuthResult<Option<String>> {
        if let Some(web_id) = self.web_id() {
            return Ok(Some(web_id));
        }

        match provider_from_current_uri(self.browser.as_ref(), &self.registry)? {
            Some(provider_uri) => self.login(Some(&provider_uri)).await,
            None => Ok(None),
        }
    }

    /// `end_session_endpoint` of the current client's provider, if any.
    pub fn provider_end_session_endpoint(&self) -> Option<String> {
        self.lock_session()
            .current_client
            .as_ref()
            .and_then(|client| client.provider().end_session_endpoint().map(str::to_string))
    }

    /// Validate the response in the current URI if there is one, otherwise
    /// send a new authentication request.
    pub async fn validate_or_send_auth_request(
        &self,
        client: Option<SharedClient>,
    ) -> AuthResult<Option<String>> {
        let client = client.ok_or(AuthError::NoClient)?;
        self.dispatch(&client, false).await
    }

    async fn dispatch(&self, client: &SharedClient, drive_fsm: bool) -> AuthResult<Option<String>> {
        let current = self.current_location();

        if has_auth_response(current.as_deref())? {
            if drive_fsm {
                self.transition(LoginMachineInput::ResponseDetected)?;
            }
            let web_id = self.init_user_from_response(client).await?;
            if drive_fsm {
                let input = if web_id.is_some() {
                    LoginMachineInput::UserVerified
                } else {
                    LoginMachineInput::NoUser
                };
                self.transition(input)?;
            }
            Ok(web_id)
        } else {
            if drive_fsm {
                self.transition(LoginMachineInput::RequestNeeded)?;
            }
            self.send_auth_request(client).await?;
            if drive_fsm {
                self.transition(LoginMachineInput::RedirectIssued)?;
            }
            Ok(None)
        }
    }

    /// Build an authentication request, remember which provider its `state`
    /// belongs to, and redirect to it.
    pub async fn send_auth_request(&self, client: &SharedClient) -> AuthResult<()> {
        let provider_uri = client.provider().url.clone();

        let auth_uri = client
            .create_request(&AuthRequestOptions::default(), self.registry.store())
            .await
            .map_err(AuthError::RequestFailed)?;

        let state = extract_state(Some(&auth_uri), UriLocation::Query)?
            .ok_or(AuthError::InvalidAuthRequestUri)?;
        self.registry.bind_state_to_provider(&state, &provider_uri)?;

        info!(provider_uri = %provider_uri, state = %state, "Redirecting to authentication request");
        self.browser.redirect_to(&auth_uri)
    }

    /// Validate the response in the current URI and set up the user.
    ///
    /// The fragment is stripped from the visible URL whatever the outcome.
    /// An unresolvable signing key resolves with `None`.
    pub async fn init_user_from_response(&self, client: &SharedClient) -> AuthResult<Option<String>> {
        let current = self.current_location().unwrap_or_default();

        match client.validate_response(&current, self.registry.store()).await {
            Ok(response) => {
                self.clear_auth_response_from_url()?;

                let web_id = extract_and_validate_web_id(&response.decoded)?;
                {
                    let mut session = self.lock_session();
                    session.web_id = Some(web_id.clone());
                    session.id_token = Some(response.id_token.clone());
                    session.access_token = response.access_token.clone();
                    session.last_response = Some(response);
                }
                info!(web_id = %web_id, "Authentication response validated");
                Ok(Some(web_id))
            }
            Err(e) => {
                if let Err(clear_err) = self.clear_auth_response_from_url() {
                    warn!(error = %clear_err, "Failed to clear auth response from URL");
                }
                match AuthError::from_validation(e) {
                    AuthError::StaleSigningKey => {
                        warn!(
                            "ID Token found, but could not validate. Provider likely has changed their public keys. Please retry login."
                        );
                        Ok(None)
                    }
                    other => Err(other),
                }
            }
        }
    }

    fn clear_auth_response_from_url(&self) -> AuthResult<()> {
        if let Some(cleared) = self.current_location_no_hash()? {
            self.browser.replace_current_url(&cleared)?;
        }
        Ok(())
    }

    /// Issue a proof-of-possession token for `resource_uri` from the last
    /// validated response.
    pub async fn issue_pop_token_for(&self, resource_uri: &str) -> AuthResult<String> {
        let response = self
            .lock_session()
            .last_response
            .clone()
            .ok_or(AuthError::NotLoggedIn)?;

        self.library
            .issue_pop_token(resource_uri, &response)
            .await
            .map_err(AuthError::RequestFailed)
    }
}

/// The web ID is the ID Token's `sub` claim. Nothing is committed to the
/// session unless it is present.
fn extract_and_validate_web_id(decoded: &DecodedIdToken) -> AuthResult<String> {
    decoded
        .payload
        .sub
        .as_deref()
        .filter(|sub| !sub.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AuthError::ResponseValidationFailed(RpLibraryError::Rejected(
                "ID Token has no subject".to_string(),
            ))
        })
}
