//! Contract with the hosting browser window.

use crate::popup::PopupMessageSender;
use crate::AuthResult;

/// Parameters for opening the provider selection popup.
#[derive(Debug, Clone, Copy)]
pub struct PopupRequest<'a> {
    /// Target window name. Opening the same name again reuses that window.
    pub window_name: &'a str,
    /// `window.open` feature string.
    pub features: &'a str,
    /// HTML written into the popup document.
    pub page_source: &'a str,
}

/// A popup window opened by the host.
pub trait PopupWindow: Send + Sync {
    fn focus(&self);
    fn close(&self);
}

/// The browser capabilities the session core uses.
///
/// Implementations forward `message` events from the popup into the
/// [`PopupMessageSender`] handed to [`Browser::open_popup`], and report the
/// popup being closed by the user with [`PopupMessageSender::notify_closed`].
pub trait Browser: Send + Sync {
    /// The current page URI (`window.location.href`), or `None` when the host
    /// exposes no location.
    fn current_location(&self) -> Option<String>;

    /// Navigate the window to `uri`.
    fn redirect_to(&self, uri: &str) -> AuthResult<()>;

    /// Replace the visible URL without navigating (`history.replaceState`).
    fn replace_current_url(&self, uri: &str) -> AuthResult<()>;

    /// Open (or reuse, by window name) a popup loaded with `request.page_source`.
    fn open_popup(
        &self,
        request: PopupRequest<'_>,
        messages: PopupMessageSender,
    ) -> AuthResult<Box<dyn PopupWindow>>;
}
