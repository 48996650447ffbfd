//! Relying party configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default scope requested at registration time.
pub const DEFAULT_SCOPE: &str = "openid profile";

/// Response type for the implicit flow.
pub const DEFAULT_RESPONSE_TYPE: &str = "id_token token";

/// Grant type for the implicit flow.
pub const DEFAULT_GRANT_TYPE: &str = "implicit";

/// Window name used for the provider selection popup.
pub const DEFAULT_POPUP_WINDOW_NAME: &str = "selectProviderWindow";

/// Window features used for the provider selection popup.
pub const DEFAULT_POPUP_FEATURES: &str = "menubar=no,resizable=yes,width=300,height=300";

/// Provider selection popup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupConfig {
    /// Target name passed to `window.open`.
    #[serde(default = "default_popup_window_name")]
    pub window_name: String,
    /// Feature string passed to `window.open`.
    #[serde(default = "default_popup_features")]
    pub features: String,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            window_name: DEFAULT_POPUP_WINDOW_NAME.to_string(),
            features: DEFAULT_POPUP_FEATURES.to_string(),
        }
    }
}

/// Main relying party configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Scope sent with dynamic client registration.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Response type registered and requested.
    #[serde(default = "default_response_type")]
    pub response_type: String,
    /// Grant types sent with dynamic client registration.
    #[serde(default = "default_grant_types")]
    pub grant_types: Vec<String>,
    /// Redirect URI override. When unset the current page URI is used.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Provider selection popup settings.
    #[serde(default)]
    pub popup: PopupConfig,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_response_type() -> String {
    DEFAULT_RESPONSE_TYPE.to_string()
}

fn default_grant_types() -> Vec<String> {
    vec![DEFAULT_GRANT_TYPE.to_string()]
}

fn default_popup_window_name() -> String {
    DEFAULT_POPUP_WINDOW_NAME.to_string()
}

fn default_popup_features() -> String {
    DEFAULT_POPUP_FEATURES.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            scope: default_scope(),
            response_type: default_response_type(),
            grant_types: default_grant_types(),
            redirect_uri: None,
            popup: PopupConfig::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Some(log_level) = env_non_empty("OIDC_RP_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(scope) = env_non_empty("OIDC_RP_SCOPE") {
            self.scope = scope;
        }
    }

    /// Check the values that must hold before the config is used.
    pub fn validate(&self) -> CoreResult<()> {
        if self.scope.split_whitespace().all(|s| s != "openid") {
            return Err(CoreError::Config(format!(
                "scope must include 'openid', got '{}'",
                self.scope
            )));
        }
        if self.grant_types.is_empty() {
            return Err(CoreError::Config("grant_types must not be empty".into()));
        }
        if self.redirect_uri.is_some() {
            self.redirect_url()?;
        }
        Ok(())
    }

    /// Get the configured redirect URI as a parsed URL.
    pub fn redirect_url(&self) -> CoreResult<Option<Url>> {
        self.redirect_uri
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(CoreError::from)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
