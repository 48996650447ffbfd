//! Interactive provider selection through a popup window.
//!
//! Each selection opens a fresh single-consumer channel. The host forwards
//! the popup's `postMessage` payloads into it, and the selection resolves on
//! the first `providerSelected` message. The popup closing, or every sender
//! being dropped, ends the selection with `SelectionCancelled`.

use crate::browser::{Browser, PopupRequest, PopupWindow};
use crate::{AuthError, AuthResult};
use rp_config::PopupConfig;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Message type posted by the selection page when the user picks a provider.
pub const PROVIDER_SELECTED: &str = "providerSelected";

/// Built-in provider selection page.
pub const DEFAULT_POPUP_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Select your provider</title></head>
<body style="font-family: system-ui; padding: 20px;">
<form id="select-provider">
<label for="provider-uri">Identity provider</label>
<input id="provider-uri" type="url" placeholder="https://provider.example/" required style="width: 100%; margin: 8px 0;">
<button type="submit">Log in</button>
</form>
<script>
document.getElementById('select-provider').addEventListener('submit', function (event) {
  event.preventDefault();
  var value = document.getElementById('provider-uri').value.trim();
  if (!value || !window.opener) { return; }
  window.opener.postMessage({ event_type: 'providerSelected', value: value }, '*');
});
</script>
</body>
</html>"#;

/// Events delivered from the popup to the waiting selection.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupEvent {
    /// `event.data` of a `message` event.
    Message(Value),
    /// The popup window was closed.
    Closed,
}

/// Producer side of a popup channel, held by the browser adapter.
#[derive(Debug, Clone)]
pub struct PopupMessageSender {
    tx: mpsc::UnboundedSender<PopupEvent>,
}

impl PopupMessageSender {
    /// Forward a message payload. Returns false once the selection is over.
    pub fn post_message(&self, data: Value) -> bool {
        self.tx.send(PopupEvent::Message(data)).is_ok()
    }

    /// Report that the user closed the popup.
    pub fn notify_closed(&self) -> bool {
        self.tx.send(PopupEvent::Closed).is_ok()
    }
}

/// Create a connected sender/receiver pair.
pub fn popup_channel() -> (PopupMessageSender, mpsc::UnboundedReceiver<PopupEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PopupMessageSender { tx }, rx)
}

#[derive(Debug, Deserialize)]
struct PopupMessage {
    event_type: String,
    #[serde(default)]
    value: Option<Value>,
}

/// Closes the popup when the selection ends, including when its future is
/// dropped.
struct OpenPopup(Box<dyn PopupWindow>);

impl Drop for OpenPopup {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Popup-based provider picker.
pub struct ProviderPopup {
    browser: Arc<dyn Browser>,
    config: PopupConfig,
    page_source: String,
}

impl ProviderPopup {
    /// Create a picker showing [`DEFAULT_POPUP_PAGE`].
    pub fn new(browser: Arc<dyn Browser>, config: PopupConfig) -> Self {
        Self {
            browser,
            config,
            page_source: DEFAULT_POPUP_PAGE.to_string(),
        }
    }

    /// Replace the page written into the popup.
    pub fn with_page_source(mut self, page_source: impl Into<String>) -> Self {
        self.page_source = page_source.into();
        self
    }

    pub fn page_source(&self) -> &str {
        &self.page_source
    }

    /// Open the popup and wait for the user to pick a provider.
    pub async fn select(&self) -> AuthResult<String> {
        info!("Getting provider from popup UI");

        let (sender, mut events) = popup_channel();
        let request = PopupRequest {
            window_name: &self.config.window_name,
            features: &self.config.features,
            page_source: &self.page_source,
        };
        let window = OpenPopup(self.browser.open_popup(request, sender)?);
        window.0.focus();

        loop {
            match events.recv().await {
                Some(PopupEvent::Message(data)) => {
                    if let Some(provider_uri) = provider_from_message(data) {
                        info!(provider_uri = %provider_uri, "Provider selected");
                        return Ok(provider_uri);
                    }
                }
                Some(PopupEvent::Closed) => {
                    debug!("Provider popup closed without a selection");
                    return Err(AuthError::SelectionCancelled);
                }
                None => {
                    debug!("Provider popup channel closed");
                    return Err(AuthError::SelectionCancelled);
                }
            }
        }
    }
}

/// The selected provider URI, or `None` for anything else (logged).
fn provider_from_message(data: Value) -> Option<String> {
    let message: PopupMessage = match serde_json::from_value(data.clone()) {
        Ok(message) => message,
        Err(_) => {
            warn!(data = %data, "Ignoring malformed popup message");
            return None;
        }
    };

    if message.event_type != PROVIDER_SELECTED {
        warn!(event_type = %message.event_type, "Unknown popup event type");
        return None;
    }

    match message.value {
        Some(Value::String(uri)) if !uri.is_empty() => Some(uri),
        other => {
            warn!(value = ?other, "providerSelected message without a provider URI");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_selected_message() {
        let uri = provider_from_message(json!({
            "event_type": "providerSelected",
            "value": "https://provider.example/"
        }));
        assert_eq!(uri.as_deref(), Some("https://provider.example/"));
    }

    #[test]
    fn test_unknown_event_type_ignored() {
        assert!(provider_from_message(json!({ "event_type": "resize", "value": 3 })).is_none());
    }

    #[test]
    fn test_malformed_messages_ignored() {
        assert!(provider_from_message(json!("providerSelected")).is_none());
        assert!(provider_from_message(json!({ "value": "https://x.example/" })).is_none());
        assert!(provider_from_message(json!({ "event_type": "providerSelected" })).is_none());
        assert!(
            provider_from_message(json!({ "event_type": "providerSelected", "value": "" }))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sender_reports_closed_receiver() {
        let (sender, events) = popup_channel();
        assert!(sender.post_message(json!({})));
        drop(events);
        assert!(!sender.post_message(json!({})));
        assert!(!sender.notify_closed());
    }

    #[test]
    fn test_default_page_posts_selection() {
        assert!(DEFAULT_POPUP_PAGE.contains("window.opener.postMessage"));
        assert!(DEFAULT_POPUP_PAGE.contains("event_type: 'providerSelected'"));
    }
}
