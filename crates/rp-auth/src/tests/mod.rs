//! Scenario tests for the session controller.
//!
//! - `harness.rs`      - mock browser, RP library, counting store and selectors
//! - `login.rs`        - provider resolution, registration and the request redirect
//! - `response.rs`     - redirect-back validation and `current_user`
//! - `client_cache.rs` - client loading, registration metadata and caching
//! - `popup.rs`        - interactive provider selection
//! - `logout.rs`       - logout and clearing the current user
//! - `reentrancy.rs`   - overlapping and abandoned logins

mod login;
