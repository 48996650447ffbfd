//! Configuration, file system paths and logging setup for the OIDC relying party.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, PopupConfig, DEFAULT_GRANT_TYPE, DEFAULT_LOG_LEVEL, DEFAULT_POPUP_FEATURES,
    DEFAULT_POPUP_WINDOW_NAME, DEFAULT_RESPONSE_TYPE, DEFAULT_SCOPE,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level, LogFormat};
pub use paths::Paths;
