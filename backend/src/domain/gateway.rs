//! Credential gateway wrapping the identity provider's primitives.
//!
//! Every operation recovers provider failures into a user-facing message
//! from the classification table; raw errors are logged, never propagated to
//! the routing layer. Sign-out is fire-and-forget: the caller always
//! observes success.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{error, warn};

use crate::domain::auth::Credentials;
use crate::domain::classify::{OperationKind, UNKNOWN_ERROR_MESSAGE, classify};
use crate::domain::error::Error;
use crate::domain::identity::{DisplayName, Identity};
use crate::domain::ports::{IdentityProvider, IdentityProviderError, VerificationLinkConfig};

/// Wraps provider signup/signin/signout and error classification.
pub struct CredentialGateway {
    provider: Arc<dyn IdentityProvider>,
}

impl CredentialGateway {
    /// Build a gateway over the given provider handle.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Create an identity, attach its display name, and send a verification
    /// email.
    ///
    /// Returns `None` on success; on any failure at any step, a classified
    /// user-facing message. The steps run strictly in sequence, so a profile
    /// or email failure surfaces even though the identity was created.
    pub async fn sign_up(
        &self,
        credentials: &Credentials,
        display_name: &DisplayName,
        link: Option<&VerificationLinkConfig>,
    ) -> Option<String> {
        match self.try_sign_up(credentials, display_name, link).await {
            Ok(()) => None,
            Err(err) => {
                error!(error = %err, "error signing up user");
                Some(recover_message(OperationKind::SignUp, &err))
            }
        }
    }

    async fn try_sign_up(
        &self,
        credentials: &Credentials,
        display_name: &DisplayName,
        link: Option<&VerificationLinkConfig>,
    ) -> Result<(), IdentityProviderError> {
        let identity = self
            .provider
            .create_identity(credentials.email(), credentials.password())
            .await?;
        self.provider
            .update_display_name(&identity.id, display_name)
            .await?;
        self.provider
            .send_verification_email(&identity.id, link.cloned())
            .await?;
        Ok(())
    }

    /// Authenticate an existing identity.
    ///
    /// Returns `None` on success; callers fetch the now-current identity via
    /// [`CredentialGateway::current_identity`]. On failure, a classified
    /// message.
    pub async fn sign_in(&self, credentials: &Credentials) -> Option<String> {
        match self
            .provider
            .authenticate(credentials.email(), credentials.password())
            .await
        {
            Ok(_) => None,
            Err(err) => {
                error!(error = %err, "error signing in user");
                Some(recover_message(OperationKind::Login, &err))
            }
        }
    }

    /// Terminate the current session, best-effort.
    ///
    /// Failures are logged and classified but never surfaced; from the
    /// caller's perspective sign-out always succeeds.
    pub async fn sign_out(&self) {
        if let Err(err) = self.provider.deauthenticate().await {
            let message = recover_message(OperationKind::Logout, &err);
            error!(error = %err, message, "error signing out user");
        }
    }

    /// Resolve the provider's current authentication state exactly once.
    ///
    /// The first auth-state notification (including "no identity") fulfils
    /// the result and the subscription is dropped. A stream that errors or
    /// ends before firing is a failure, distinct from `Ok(None)`.
    pub async fn current_identity(&self) -> Result<Option<Identity>, Error> {
        let mut changes = self.provider.auth_state_changes();
        match changes.next().await {
            Some(Ok(state)) => Ok(state),
            Some(Err(err)) => {
                error!(error = %err, "auth state observer failed");
                Err(Error::service_unavailable(
                    "could not determine authentication state",
                ))
            }
            None => Err(Error::internal(
                "auth state observer ended before reporting",
            )),
        }
    }
}

/// Recover a provider failure into the user-facing message for `kind`.
///
/// Transport failures have no provider code and classify to the generic
/// unknown-error message.
fn recover_message(kind: OperationKind, err: &IdentityProviderError) -> String {
    match err.code() {
        Some(code) => classify(kind, code).to_owned(),
        None => {
            warn!(operation = %kind, "provider unreachable during credential operation");
            UNKNOWN_ERROR_MESSAGE.to_owned()
        }
    }
}
