// SPDX-License-Identifier: MPL-2.0

use crate::config::PIN_LEN;
use crate::supabase::{ClientError, SupabaseClient, User};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("please enter a nickname")]
    EmptyNickname,
    #[error("the PIN must be exactly {PIN_LEN} digits")]
    PinLength,
    #[error("that PIN doesn't match")]
    PinMismatch,
    #[error("no pending login")]
    NoCandidate,
    #[error("that nickname was just taken")]
    NicknameTaken,
    #[error(transparent)]
    Backend(#[from] ClientError),
}

/// Login progresses `Nickname → Pin` for known users and
/// `Nickname → Register` for new ones; Esc walks back to `Nickname`.
/// Authentication is terminal for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Nickname,
    Pin,
    Register,
}

/// The user-table operations the login flow needs, behind a seam so tests
/// run against an in-memory directory.
pub trait UserDirectory {
    async fn find_user(&self, nickname: &str) -> Result<User, ClientError>;
    async fn create_user(
        &self,
        nickname: &str,
        avatar: &str,
        pin: &str,
    ) -> Result<User, ClientError>;
}

impl UserDirectory for SupabaseClient {
    async fn find_user(&self, nickname: &str) -> Result<User, ClientError> {
        SupabaseClient::find_user(self, nickname).await
    }

    async fn create_user(
        &self,
        nickname: &str,
        avatar: &str,
        pin: &str,
    ) -> Result<User, ClientError> {
        SupabaseClient::create_user(self, nickname, avatar, pin).await
    }
}

/// PIN comparison behind a capability so a hashed scheme can slot in without
/// touching the flow.
pub trait CredentialVerifier {
    fn verify(&self, entered: &str, stored: &str) -> bool;
}

/// Byte-for-byte comparison, matching how pins are stored today. The pin is
/// a low-friction re-entry secret, not a security boundary.
#[derive(Debug, Default)]
pub struct PlainPinVerifier;

impl CredentialVerifier for PlainPinVerifier {
    fn verify(&self, entered: &str, stored: &str) -> bool {
        entered == stored
    }
}

pub struct LoginFlow<V = PlainPinVerifier> {
    step: LoginStep,
    /// Nickname as typed, carried forward into registration.
    nickname: String,
    /// Stored row for a known nickname, awaiting its PIN.
    candidate: Option<User>,
    verifier: V,
}

impl LoginFlow {
    pub fn new() -> Self {
        Self::with_verifier(PlainPinVerifier)
    }
}

impl<V: CredentialVerifier> LoginFlow<V> {
    pub fn with_verifier(verifier: V) -> Self {
        Self {
            step: LoginStep::Nickname,
            nickname: String::new(),
            candidate: None,
            verifier,
        }
    }

    pub fn step(&self) -> LoginStep {
        self.step
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Check whether the nickname is known and route accordingly: found →
    /// `Pin`, not found → `Register`. Any other backend failure is surfaced
    /// and leaves the flow where it was.
    pub async fn submit_nickname(
        &mut self,
        directory: &impl UserDirectory,
        nickname: &str,
    ) -> Result<(), FlowError> {
        if nickname.trim().is_empty() {
            return Err(FlowError::EmptyNickname);
        }

        match directory.find_user(nickname).await {
            Ok(user) => {
                self.nickname = nickname.to_string();
                self.candidate = Some(user);
                self.step = LoginStep::Pin;
                Ok(())
            }
            Err(ClientError::NotFound) => {
                self.nickname = nickname.to_string();
                self.candidate = None;
                self.step = LoginStep::Register;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Compare the entered PIN against the candidate's stored one. Exact
    /// match authenticates; a mismatch leaves the flow in `Pin` and the
    /// caller clears the entered value.
    pub fn submit_pin(&mut self, pin: &str) -> Result<User, FlowError> {
        let candidate = self.candidate.as_ref().ok_or(FlowError::NoCandidate)?;

        if self.verifier.verify(pin, &candidate.pin) {
            Ok(candidate.clone())
        } else {
            Err(FlowError::PinMismatch)
        }
    }

    /// Register the carried-forward nickname with the chosen avatar and PIN.
    /// A malformed PIN is rejected before any backend call; a concurrently
    /// taken nickname leaves the flow in `Register`.
    pub async fn submit_registration(
        &mut self,
        directory: &impl UserDirectory,
        avatar: &str,
        pin: &str,
    ) -> Result<User, FlowError> {
        if pin.chars().count() != PIN_LEN {
            return Err(FlowError::PinLength);
        }

        match directory.create_user(&self.nickname, avatar, pin).await {
            Ok(user) => Ok(user),
            Err(ClientError::Conflict(_)) => Err(FlowError::NicknameTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Back out of the PIN or registration step.
    pub fn back(&mut self) {
        self.step = LoginStep::Nickname;
        self.candidate = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    struct MockDirectory {
        users: RefCell<HashMap<String, User>>,
        unreachable: bool,
        calls: Cell<usize>,
    }

    impl MockDirectory {
        fn empty() -> Self {
            Self {
                users: RefCell::new(HashMap::new()),
                unreachable: false,
                calls: Cell::new(0),
            }
        }

        fn with_user(user: User) -> Self {
            let dir = Self::empty();
            dir.users
                .borrow_mut()
                .insert(user.nickname.clone(), user);
            dir
        }

        fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::empty()
            }
        }
    }

    impl UserDirectory for MockDirectory {
        async fn find_user(&self, nickname: &str) -> Result<User, ClientError> {
            self.calls.set(self.calls.get() + 1);
            if self.unreachable {
                return Err(ClientError::Network("connection refused".into()));
            }
            self.users
                .borrow()
                .get(nickname)
                .cloned()
                .ok_or(ClientError::NotFound)
        }

        async fn create_user(
            &self,
            nickname: &str,
            avatar: &str,
            pin: &str,
        ) -> Result<User, ClientError> {
            self.calls.set(self.calls.get() + 1);
            if self.unreachable {
                return Err(ClientError::Network("connection refused".into()));
            }
            let mut users = self.users.borrow_mut();
            if users.contains_key(nickname) {
                return Err(ClientError::Conflict("duplicate key value".into()));
            }
            let user = User {
                nickname: nickname.to_string(),
                pin: pin.to_string(),
                avatar: avatar.to_string(),
                status_message: String::new(),
            };
            users.insert(nickname.to_string(), user.clone());
            Ok(user)
        }
    }

    fn aria() -> User {
        User {
            nickname: "Aria".into(),
            pin: "4821".into(),
            avatar: "🦊".into(),
            status_message: "exploring caves".into(),
        }
    }

    #[tokio::test]
    async fn unknown_nickname_routes_to_register() {
        let dir = MockDirectory::empty();
        let mut flow = LoginFlow::new();

        flow.submit_nickname(&dir, "Aria").await.unwrap();

        assert_eq!(flow.step(), LoginStep::Register);
        assert_eq!(flow.nickname(), "Aria");
    }

    #[tokio::test]
    async fn known_nickname_routes_to_pin() {
        let dir = MockDirectory::with_user(aria());
        let mut flow = LoginFlow::new();

        flow.submit_nickname(&dir, "Aria").await.unwrap();

        assert_eq!(flow.step(), LoginStep::Pin);
    }

    #[tokio::test]
    async fn blank_nickname_issues_no_lookup() {
        let dir = MockDirectory::empty();
        let mut flow = LoginFlow::new();

        let err = flow.submit_nickname(&dir, "   ").await.unwrap_err();

        assert!(matches!(err, FlowError::EmptyNickname));
        assert_eq!(flow.step(), LoginStep::Nickname);
        assert_eq!(dir.calls.get(), 0);
    }

    #[tokio::test]
    async fn backend_failure_stays_on_nickname_entry() {
        let dir = MockDirectory::unreachable();
        let mut flow = LoginFlow::new();

        let err = flow.submit_nickname(&dir, "Aria").await.unwrap_err();

        assert!(matches!(err, FlowError::Backend(_)));
        assert_eq!(flow.step(), LoginStep::Nickname);
    }

    #[tokio::test]
    async fn exact_pin_match_authenticates() {
        let dir = MockDirectory::with_user(aria());
        let mut flow = LoginFlow::new();
        flow.submit_nickname(&dir, "Aria").await.unwrap();

        let user = flow.submit_pin("4821").unwrap();

        assert_eq!(user, aria());
    }

    #[tokio::test]
    async fn wrong_pin_is_rejected_and_flow_stays_put() {
        let dir = MockDirectory::with_user(aria());
        let mut flow = LoginFlow::new();
        flow.submit_nickname(&dir, "Aria").await.unwrap();

        let err = flow.submit_pin("0000").unwrap_err();

        assert!(matches!(err, FlowError::PinMismatch));
        assert_eq!(flow.step(), LoginStep::Pin);
        // The candidate is kept; the user may try again.
        assert!(flow.submit_pin("4821").is_ok());
    }

    #[tokio::test]
    async fn pin_comparison_has_no_normalization() {
        let mut stored = aria();
        stored.pin = "12a4".into();
        let dir = MockDirectory::with_user(stored);
        let mut flow = LoginFlow::new();
        flow.submit_nickname(&dir, "Aria").await.unwrap();

        assert!(flow.submit_pin("12A4").is_err());
        assert!(flow.submit_pin("12a4").is_ok());
    }

    #[tokio::test]
    async fn malformed_pins_are_rejected_before_any_call() {
        let dir = MockDirectory::empty();
        let mut flow = LoginFlow::new();
        flow.submit_nickname(&dir, "Aria").await.unwrap();
        let calls_after_lookup = dir.calls.get();

        for pin in ["123", "12345", ""] {
            let err = flow
                .submit_registration(&dir, "🦊", pin)
                .await
                .unwrap_err();
            assert!(matches!(err, FlowError::PinLength));
        }

        assert_eq!(dir.calls.get(), calls_after_lookup);
        assert_eq!(flow.step(), LoginStep::Register);
    }

    #[tokio::test]
    async fn registration_returns_the_created_row() {
        let dir = MockDirectory::empty();
        let mut flow = LoginFlow::new();
        flow.submit_nickname(&dir, "Aria").await.unwrap();

        let user = flow.submit_registration(&dir, "🦊", "4821").await.unwrap();

        assert_eq!(user.nickname, "Aria");
        assert_eq!(user.avatar, "🦊");
        assert_eq!(user.pin, "4821");
        assert_eq!(user.status_message, "");
    }

    #[tokio::test]
    async fn concurrent_registration_stays_in_register() {
        let dir = MockDirectory::empty();
        let mut flow = LoginFlow::new();
        flow.submit_nickname(&dir, "Aria").await.unwrap();

        // Someone else grabs the nickname between lookup and insert.
        dir.users.borrow_mut().insert("Aria".into(), aria());

        let err = flow
            .submit_registration(&dir, "🐸", "0000")
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::NicknameTaken));
        assert_eq!(flow.step(), LoginStep::Register);
    }

    #[tokio::test]
    async fn back_returns_to_nickname_entry() {
        let dir = MockDirectory::with_user(aria());
        let mut flow = LoginFlow::new();
        flow.submit_nickname(&dir, "Aria").await.unwrap();

        flow.back();

        assert_eq!(flow.step(), LoginStep::Nickname);
        assert!(matches!(
            flow.submit_pin("4821").unwrap_err(),
            FlowError::NoCandidate
        ));
    }
}
