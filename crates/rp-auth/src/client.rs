//! RP client lifecycle: load a cached registration or register a new client.

use crate::rp::{AuthenticateDefaults, RegistrationMetadata, RegistrationOptions, SharedClient};
use crate::session::SessionController;
use crate::{AuthError, AuthResult};
use std::sync::PoisonError;
use tracing::{debug, info};

/// Overrides for [`SessionController::register_client`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterClientOptions {
    /// Defaults to the configured redirect URI, then the current location.
    pub redirect_uri: Option<String>,
    /// Defaults to the configured scope.
    pub scope: Option<String>,
}

impl SessionController {
    /// Return a client for `provider_uri`, registering one if nothing is
    /// cached.
    ///
    /// The in-memory client and its provider binding are dropped first so a
    /// client bound to another provider is never reused.
    pub async fn load_or_register_client(&self, provider_uri: &str) -> AuthResult<SharedClient> {
        if provider_uri.is_empty() {
            return Err(AuthError::MissingProviderUri);
        }

        {
            let mut session = self.lock_session();
            session.current_client = None;
            session.provider_uri = None;
        }

        match self.load_client(provider_uri).await? {
            Some(client) => {
                let mut session = self.lock_session();
                session.current_client = Some(client.clone());
                session.provider_uri = Some(provider_uri.to_string());
                Ok(client)
            }
            None => {
                self.register_client(provider_uri, RegisterClientOptions::default())
                    .await
            }
        }
    }

    /// Cached client for `provider_uri`, if any.
    ///
    /// An in-memory client bound to the same provider is returned without
    /// touching the store. Nothing is mutated on a miss.
    pub async fn load_client(&self, provider_uri: &str) -> AuthResult<Option<SharedClient>> {
        if provider_uri.is_empty() {
            return Err(AuthError::MissingProviderUri);
        }

        let cached = self
            .lock_session()
            .current_client
            .clone()
            .filter(|client| client.provider().url == provider_uri);
        if let Some(client) = cached {
            return Ok(Some(client));
        }

        let Some(serialized) = self.registry.stored_client(provider_uri)? else {
            return Ok(None);
        };

        debug!(provider_uri = %provider_uri, "Restoring stored client");
        let client = self
            .library
            .from_serialized(&serialized)
            .await
            .map_err(AuthError::ClientLoadFailed)?;
        Ok(Some(client))
    }

    /// Register a public implicit-flow client with `provider_uri` and cache it.
    pub async fn register_client(
        &self,
        provider_uri: &str,
        options: RegisterClientOptions,
    ) -> AuthResult<SharedClient> {
        if provider_uri.is_empty() {
            return Err(AuthError::MissingProviderUri);
        }

        info!(provider_uri = %provider_uri, "Registering public client");

        let redirect_uri = options
            .redirect_uri
            .filter(|uri| !uri.is_empty())
            .or_else(|| self.config.redirect_uri.clone())
            .or_else(|| self.current_location())
            .ok_or_else(|| {
                AuthError::Config("no redirect URI configured and no current location".to_string())
            })?;
        *self
            .redirect_uri
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(redirect_uri.clone());

        let registration = RegistrationMetadata {
            issuer: provider_uri.to_string(),
            grant_types: self.config.grant_types.clone(),
            redirect_uris: vec![redirect_uri.clone()],
            response_types: vec![self.config.response_type.clone()],
            scope: options.scope.unwrap_or_else(|| self.config.scope.clone()),
        };
        let rp_options = RegistrationOptions {
            authenticate: AuthenticateDefaults {
                redirect_uri,
                response_type: self.config.response_type.clone(),
            },
        };

        let client = self
            .library
            .register(provider_uri, &registration, &rp_options, self.registry.store())
            .await
            .map_err(AuthError::RegistrationFailed)?;

        self.store_client(&client, provider_uri)?;
        info!(provider_uri = %provider_uri, "Client registered");
        Ok(client)
    }

    /// Make `client` current and persist its registration for `provider_uri`.
    pub fn store_client(&self, client: &SharedClient, provider_uri: &str) -> AuthResult<()> {
        {
            let mut session = self.lock_session();
            session.current_client = Some(client.clone());
            session.provider_uri = Some(provider_uri.to_string());
        }

        let serialized = client.serialize().map_err(AuthError::RegistrationFailed)?;
        self.registry.store_client(provider_uri, &serialized)
    }
}
