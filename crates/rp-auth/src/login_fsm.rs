//! Login state machine using rust-fsm.
//!
//! Every `login()` walks this machine explicitly, so a second `login()` that
//! arrives while one is still running can be recognised and rejected.
//!
//! ## State Diagram
//!
//! ```text
//! Idle ──LoginRequested──► Selecting ──ProviderResolved──► Registering
//!                            │                               │      │
//!                            │ NoProvider     RequestNeeded  │      │ ResponseDetected
//!                            ▼                               ▼      ▼
//!                           Idle                     Requesting    Validating
//!                                                        │          │      │
//!                                         RedirectIssued │   NoUser │      │ UserVerified
//!                                                        ▼          ▼      ▼
//!                                                       Idle       Idle   Authenticated
//!
//! Selecting | Registering | Requesting | Validating ──Failure──► Failed
//! Authenticated | Failed ──LoginRequested──► Selecting
//! Idle | Authenticated | Failed ──LogoutRequested──► Idle
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub login_machine(Idle)

    Idle => {
        LoginRequested => Selecting,
        LogoutRequested => Idle
    },
    Selecting => {
        ProviderResolved => Registering,
        NoProvider => Idle,
        Failure => Failed
    },
    Registering => {
        ResponseDetected => Validating,
        RequestNeeded => Requesting,
        Failure => Failed
    },
    Requesting => {
        RedirectIssued => Idle,
        Failure => Failed
    },
    Validating => {
        UserVerified => Authenticated,
        NoUser => Idle,
        Failure => Failed
    },
    Authenticated => {
        LoginRequested => Selecting,
        LogoutRequested => Idle
    },
    Failed => {
        LoginRequested => Selecting,
        LogoutRequested => Idle
    }
}

pub use login_machine::Input as LoginMachineInput;
pub use login_machine::State as LoginMachineState;
pub use login_machine::StateMachine as LoginMachine;

/// Login state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    /// No login running and no user.
    Idle,
    /// Resolving which provider to use.
    Selecting,
    /// Loading or registering the RP client.
    Registering,
    /// Building the auth request and redirecting.
    Requesting,
    /// Validating an auth response from the current URI.
    Validating,
    /// A user was validated.
    Authenticated,
    /// The last login failed.
    Failed,
}

impl LoginState {
    /// Returns true if a user was validated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginState::Authenticated)
    }

    /// Returns true while a login call is still running.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LoginState::Selecting
                | LoginState::Registering
                | LoginState::Requesting
                | LoginState::Validating
        )
    }
}

impl From<&LoginMachineState> for LoginState {
    fn from(state: &LoginMachineState) -> Self {
        match state {
            LoginMachineState::Idle => LoginState::Idle,
            LoginMachineState::Selecting => LoginState::Selecting,
            LoginMachineState::Registering => LoginState::Registering,
            LoginMachineState::Requesting => LoginState::Requesting,
            LoginMachineState::Validating => LoginState::Validating,
            LoginMachineState::Authenticated => LoginState::Authenticated,
            LoginMachineState::Failed => LoginState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let machine = LoginMachine::new();
        assert_eq!(*machine.state(), LoginMachineState::Idle);
    }

    #[test]
    fn test_redirect_flow() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        machine.consume(&LoginMachineInput::ProviderResolved).unwrap();
        machine.consume(&LoginMachineInput::RequestNeeded).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Requesting);

        machine.consume(&LoginMachineInput::RedirectIssued).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Idle);
    }

    #[test]
    fn test_response_flow() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        machine.consume(&LoginMachineInput::ProviderResolved).unwrap();
        machine.consume(&LoginMachineInput::ResponseDetected).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Validating);

        machine.consume(&LoginMachineInput::UserVerified).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Authenticated);
    }

    #[test]
    fn test_stale_key_returns_to_idle() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        machine.consume(&LoginMachineInput::ProviderResolved).unwrap();
        machine.consume(&LoginMachineInput::ResponseDetected).unwrap();
        machine.consume(&LoginMachineInput::NoUser).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Idle);
    }

    #[test]
    fn test_second_login_rejected_while_selecting() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        assert!(machine.consume(&LoginMachineInput::LoginRequested).is_err());
        assert_eq!(*machine.state(), LoginMachineState::Selecting);
    }

    #[test]
    fn test_failure_then_retry() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        machine.consume(&LoginMachineInput::Failure).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Failed);

        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Selecting);
    }

    #[test]
    fn test_logout_only_from_settled_states() {
        let mut machine = LoginMachine::new();
        machine.consume(&LoginMachineInput::LogoutRequested).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Idle);

        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        assert!(machine.consume(&LoginMachineInput::LogoutRequested).is_err());
    }

    #[test]
    fn test_cannot_authenticate_without_validating() {
        let mut machine = LoginMachine::new();
        machine.consume(&LoginMachineInput::LoginRequested).unwrap();
        machine.consume(&LoginMachineInput::ProviderResolved).unwrap();
        assert!(machine.consume(&LoginMachineInput::UserVerified).is_err());
    }

    #[test]
    fn test_login_state_conversion() {
        assert_eq!(LoginState::from(&LoginMachineState::Idle), LoginState::Idle);
        assert_eq!(
            LoginState::from(&LoginMachineState::Validating),
            LoginState::Validating
        );
        assert_eq!(
            LoginState::from(&LoginMachineState::Authenticated),
            LoginState::Authenticated
        );
        assert_eq!(LoginState::from(&LoginMachineState::Failed), LoginState::Failed);
    }

    #[test]
    fn test_login_state_predicates() {
        assert!(LoginState::Authenticated.is_authenticated());
        assert!(!LoginState::Idle.is_authenticated());

        assert!(LoginState::Selecting.is_transient());
        assert!(LoginState::Registering.is_transient());
        assert!(LoginState::Requesting.is_transient());
        assert!(LoginState::Validating.is_transient());
        assert!(!LoginState::Idle.is_transient());
        assert!(!LoginState::Authenticated.is_transient());
        assert!(!LoginState::Failed.is_transient());
    }
}
