//! Login: provider resolution, registration and sending the auth request.

use super::harness::{
    ClientBehavior, StubSelector, TestHarness, APP, OTHER_PROVIDER, PROVIDER, STATE,
};
use crate::{AuthError, LoginState, RpLibraryError};
use std::sync::Arc;

#[tokio::test]
async fn explicit_provider_is_passed_to_selector() {
    let selector = Arc::new(StubSelector::echo());
    let h = TestHarness::at(Some(APP)).with_selector(selector.clone());

    h.controller.login(Some(PROVIDER)).await.unwrap();

    assert_eq!(selector.calls(), vec![Some(PROVIDER.to_string())]);
    assert!(h.browser.popups().is_empty());
}

#[tokio::test]
async fn explicit_provider_skips_popup_with_default_selector() {
    let h = TestHarness::at(Some(APP));

    h.controller.login(Some(PROVIDER)).await.unwrap();

    assert!(h.browser.popups().is_empty());
    assert_eq!(h.controller.provider_uri().as_deref(), Some(PROVIDER));
}

#[tokio::test]
async fn provider_resumed_from_redirect_state() {
    let h = TestHarness::at(Some("https://app.example/#state=abcd&id_token=t"));
    h.bind_state(STATE, PROVIDER);

    let web_id = h.controller.login(None).await.unwrap();

    assert!(h.browser.popups().is_empty());
    assert_eq!(h.controller.provider_uri().as_deref(), Some(PROVIDER));
    assert_eq!(web_id.as_deref(), Some(super::harness::ALICE));
}

#[tokio::test]
async fn fresh_login_registers_and_stores_client() {
    let h = TestHarness::at(Some(APP));
    let key = "oidc.rp.by-provider.https://provider.example/";
    assert!(h.stored(key).is_none());

    h.controller.login(Some(PROVIDER)).await.unwrap();

    let registrations = h.library.registrations();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].provider_uri, PROVIDER);

    let stored = h.stored(key).expect("client registration stored");
    assert!(stored.contains(PROVIDER));
}

#[tokio::test]
async fn stored_registration_is_reused() {
    let h = TestHarness::at(Some(APP));
    h.store_registration(PROVIDER);

    h.controller.login(Some(PROVIDER)).await.unwrap();

    assert!(h.library.registrations().is_empty());
    assert_eq!(h.library.restored.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fresh_visit_sends_auth_request() {
    let h = TestHarness::at(Some(APP));

    let result = h.controller.login(Some(PROVIDER)).await.unwrap();

    assert!(result.is_none());
    assert_eq!(
        h.browser.redirects(),
        vec!["https://provider.example/authorize?response_type=id_token+token&state=abcd"]
    );
    assert_eq!(
        h.controller.registry().provider_for_state(STATE).unwrap().as_deref(),
        Some(PROVIDER)
    );
    assert_eq!(h.controller.login_state(), LoginState::Idle);
    assert!(h.controller.web_id().is_none());
}

#[tokio::test]
async fn auth_request_without_state_fails() {
    let h = TestHarness::at(Some(APP));
    h.library.set_behavior(ClientBehavior {
        request_state: None,
        ..Default::default()
    });

    let result = h.controller.login(Some(PROVIDER)).await;

    assert!(matches!(result, Err(AuthError::InvalidAuthRequestUri)));
    assert!(h.browser.redirects().is_empty());
    assert_eq!(h.controller.login_state(), LoginState::Failed);
}

#[tokio::test]
async fn auth_request_library_failure() {
    let h = TestHarness::at(Some(APP));
    h.library.set_behavior(ClientBehavior {
        request_error: Some(RpLibraryError::Network("offline".into())),
        ..Default::default()
    });

    let result = h.controller.login(Some(PROVIDER)).await;
    assert!(matches!(result, Err(AuthError::RequestFailed(_))));
}

#[tokio::test]
async fn registration_failure_propagates() {
    let h = TestHarness::at(Some(APP));
    h.library
        .fail_registration(RpLibraryError::Rejected("invalid_redirect_uri".into()));

    let result = h.controller.login(Some(PROVIDER)).await;

    match result {
        Err(AuthError::RegistrationFailed(RpLibraryError::Rejected(msg))) => {
            assert_eq!(msg, "invalid_redirect_uri")
        }
        other => panic!("expected RegistrationFailed, got {:?}", other),
    }
    assert!(h.stored("oidc.rp.by-provider.https://provider.example/").is_none());
    assert_eq!(h.controller.login_state(), LoginState::Failed);
}

#[tokio::test]
async fn no_provider_selected_resolves_none() {
    let selector = Arc::new(StubSelector::answering(None));
    let h = TestHarness::at(Some(APP)).with_selector(selector);

    let result = h.controller.login(None).await.unwrap();

    assert!(result.is_none());
    assert!(h.library.registrations().is_empty());
    assert!(h.browser.redirects().is_empty());
    assert_eq!(h.controller.login_state(), LoginState::Idle);
}

#[tokio::test]
async fn login_after_failure_starts_over() {
    let h = TestHarness::at(Some(APP));
    h.library
        .fail_registration(RpLibraryError::Network("timeout".into()));
    assert!(h.controller.login(Some(PROVIDER)).await.is_err());

    h.store_registration(OTHER_PROVIDER);
    h.controller.login(Some(OTHER_PROVIDER)).await.unwrap();

    assert_eq!(h.controller.provider_uri().as_deref(), Some(OTHER_PROVIDER));
    assert_eq!(h.controller.login_state(), LoginState::Idle);
}

#[tokio::test]
async fn login_clears_previous_user() {
    let h = TestHarness::at(Some("https://app.example/#state=abcd"));
    h.bind_state(STATE, PROVIDER);
    h.controller.login(None).await.unwrap();
    assert!(h.controller.web_id().is_some());

    // Fragment was stripped, so this login sends a new request.
    h.controller.login(Some(PROVIDER)).await.unwrap();

    assert!(h.controller.web_id().is_none());
    assert!(h.controller.id_token().is_none());
    assert!(h.controller.access_token().is_none());
}
