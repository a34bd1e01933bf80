//! Driven port for the external identity provider.
//!
//! The credential gateway talks to signup/signin/signout primitives through
//! this trait so tests can substitute a mock or the in-memory fixture
//! instead of reaching the hosted provider.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use super::define_port_error;
use crate::domain::classify::ProviderErrorCode;
use crate::domain::identity::{DisplayName, Identity, IdentityId};

define_port_error! {
    /// Failure reported by the identity provider.
    pub enum IdentityProviderError {
        /// The provider processed the request and refused it.
        Rejected { code: ProviderErrorCode } => "identity provider rejected the operation: {code}",
        /// The provider could not be reached or answered out of protocol.
        Unavailable { message: String } => "identity provider unreachable: {message}",
    }
}

impl IdentityProviderError {
    /// Provider error code, when the provider rejected the operation.
    pub fn code(&self) -> Option<&ProviderErrorCode> {
        match self {
            Self::Rejected { code } => Some(code),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Target-link settings embedded in a verification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLinkConfig {
    /// Landing URL the emailed link points at.
    pub url: String,
    /// Whether the client application completes the verification itself.
    pub handle_code_in_app: bool,
    /// Continue URL appended after verification, when different from `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_url: Option<String>,
}

/// Single notification from the provider's auth-state observer.
pub type AuthStateEvent = Result<Option<Identity>, IdentityProviderError>;

/// Driven port wrapping the identity provider's primitives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new identity and sign it in.
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityProviderError>;

    /// Authenticate an existing identity and make it current.
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityProviderError>;

    /// Terminate the current session.
    async fn deauthenticate(&self) -> Result<(), IdentityProviderError>;

    /// Set the display name on an identity's profile.
    async fn update_display_name(
        &self,
        id: &IdentityId,
        display_name: &DisplayName,
    ) -> Result<(), IdentityProviderError>;

    /// Dispatch a verification email, with provider defaults when `link` is
    /// `None`.
    async fn send_verification_email(
        &self,
        id: &IdentityId,
        link: Option<VerificationLinkConfig>,
    ) -> Result<(), IdentityProviderError>;

    /// Observe authentication state.
    ///
    /// The stream MUST yield the current state immediately as its first item
    /// (including `None` when no identity is signed in) and then an item per
    /// change. Dropping the stream unsubscribes the observer.
    fn auth_state_changes(&self) -> BoxStream<'static, AuthStateEvent>;
}

/// Build an auth-state stream from a `watch` receiver.
///
/// Yields the receiver's current value first, then one item per change, and
/// ends when the sender is dropped.
pub(crate) fn watch_auth_stream(
    rx: watch::Receiver<Option<Identity>>,
) -> BoxStream<'static, AuthStateEvent> {
    Box::pin(futures_util::stream::unfold(
        (rx, true),
        |(mut rx, first)| async move {
            if first {
                let current = rx.borrow_and_update().clone();
                return Some((Ok(current), (rx, false)));
            }
            match rx.changed().await {
                Ok(()) => {
                    let current = rx.borrow_and_update().clone();
                    Some((Ok(current), (rx, false)))
                }
                Err(_) => None,
            }
        },
    ))
}

struct FixtureUser {
    password: String,
    identity: Identity,
}

/// In-memory identity provider for tests and local development.
///
/// Behaves like the hosted provider where the gateway can observe it:
/// signup and sign-in both make the identity current, duplicate emails are
/// refused, and sign-out is idempotent.
pub struct FixtureIdentityProvider {
    users: Mutex<HashMap<String, FixtureUser>>,
    sent_verifications: Mutex<Vec<(IdentityId, Option<VerificationLinkConfig>)>>,
    state: watch::Sender<Option<Identity>>,
}

impl Default for FixtureIdentityProvider {
    fn default() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            users: Mutex::new(HashMap::new()),
            sent_verifications: Mutex::new(Vec::new()),
            state,
        }
    }
}

impl FixtureIdentityProvider {
    /// Create an empty fixture provider with nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities the fixture currently holds.
    pub fn identity_count(&self) -> usize {
        self.lock_users().len()
    }

    /// Verification emails dispatched so far, in order.
    pub fn verification_emails_sent(&self) -> Vec<(IdentityId, Option<VerificationLinkConfig>)> {
        self.sent_verifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn lock_users(&self) -> std::sync::MutexGuard<'_, HashMap<String, FixtureUser>> {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn fresh_identity(email: &str) -> Identity {
        let id = IdentityId::new(Uuid::new_v4().simple().to_string())
            .unwrap_or_else(|err| panic!("generated identity id must be valid: {err}"));
        Identity::new(id, email)
    }
}

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityProviderError> {
        if !email.contains('@') {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::InvalidEmail,
            ));
        }
        if password.is_empty() {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::MissingPassword,
            ));
        }
        if password.chars().count() < 6 {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::WeakPassword,
            ));
        }

        let mut users = self.lock_users();
        if users.contains_key(email) {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::EmailAlreadyInUse,
            ));
        }

        let identity = Self::fresh_identity(email);
        users.insert(
            email.to_owned(),
            FixtureUser {
                password: password.to_owned(),
                identity: identity.clone(),
            },
        );
        drop(users);

        // Signup signs the new identity in, mirroring the hosted provider.
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityProviderError> {
        let users = self.lock_users();
        let Some(user) = users.get(email) else {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::UserNotFound,
            ));
        };
        if user.password != password {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::InvalidCredential,
            ));
        }
        let identity = user.identity.clone();
        drop(users);

        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn deauthenticate(&self) -> Result<(), IdentityProviderError> {
        self.state.send_replace(None);
        Ok(())
    }

    async fn update_display_name(
        &self,
        id: &IdentityId,
        display_name: &DisplayName,
    ) -> Result<(), IdentityProviderError> {
        let mut users = self.lock_users();
        let Some(user) = users.values_mut().find(|user| user.identity.id == *id) else {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::UserNotFound,
            ));
        };
        user.identity.display_name = Some(display_name.clone());
        let updated = user.identity.clone();
        drop(users);

        self.state.send_if_modified(|current| match current {
            Some(identity) if identity.id == updated.id => {
                *identity = updated.clone();
                true
            }
            _ => false,
        });
        Ok(())
    }

    async fn send_verification_email(
        &self,
        id: &IdentityId,
        link: Option<VerificationLinkConfig>,
    ) -> Result<(), IdentityProviderError> {
        if !self.lock_users().values().any(|user| user.identity.id == *id) {
            return Err(IdentityProviderError::rejected(
                ProviderErrorCode::UserNotFound,
            ));
        }
        self.sent_verifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((id.clone(), link));
        Ok(())
    }

    fn auth_state_changes(&self) -> BoxStream<'static, AuthStateEvent> {
        watch_auth_stream(self.state.subscribe())
    }
}
