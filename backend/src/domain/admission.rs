//! Session admission policy evaluated once per login attempt.
//!
//! Given a freshly authenticated identity, the policy reads the account
//! record and either admits the session (to the application or the billing
//! flow) or rejects it. Every rejection signs the identity back out before
//! returning, so no partially-admitted session survives the decision.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use crate::domain::account::Platform;
use crate::domain::error::Error;
use crate::domain::gateway::CredentialGateway;
use crate::domain::identity::Identity;
use crate::domain::ports::AccountStore;

/// Reason an authenticated identity was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionRejection {
    /// No account record exists for the identity.
    AccountNotFound,
    /// The account is suspended.
    AccountSuspended,
    /// The account belongs to a different client surface.
    PlatformRestricted,
}

impl AdmissionRejection {
    /// User-facing text for the rejection.
    pub fn message(self) -> &'static str {
        match self {
            Self::AccountNotFound => "Account not found",
            Self::AccountSuspended => {
                "Your account has been suspended due to an unpaid invoice for more than 7 days. \
                 Please check your inbox/junk for emails off us with more information."
            }
            Self::PlatformRestricted => "Access to web app restricted",
        }
    }
}

/// Outcome of an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Paid or in-trial: admit to the main application.
    Application,
    /// Trial lapsed and unpaid: admit only to the billing/upgrade flow.
    Billing,
    /// Refused; the session has already been signed out.
    Rejected(AdmissionRejection),
}

/// Decides whether a signed-in identity may proceed.
pub struct AdmissionPolicy {
    gateway: Arc<CredentialGateway>,
    store: Arc<dyn AccountStore>,
    platform: Platform,
    clock: Arc<dyn Clock>,
}

impl AdmissionPolicy {
    /// Build a policy serving the given client surface.
    pub fn new(
        gateway: Arc<CredentialGateway>,
        store: Arc<dyn AccountStore>,
        platform: Platform,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            store,
            platform,
            clock,
        }
    }

    /// Evaluate the admission checks for `identity`, strictly in order.
    ///
    /// The decision is taken from a single snapshot of the account record;
    /// concurrent mutations by billing flows land on the next login. Store
    /// transport failures propagate as errors without touching the session.
    ///
    /// # Errors
    ///
    /// Returns an error when the account store cannot be read.
    pub async fn admit(&self, identity: &Identity) -> Result<AdmissionDecision, Error> {
        let record = self
            .store
            .fetch_account(&identity.id)
            .await
            .map_err(|err| {
                warn!(error = %err, identity = %identity.id, "account record read failed");
                Error::internal("could not read account record")
            })?;

        let Some(record) = record else {
            info!(identity = %identity.id, "no account record for signed-in identity");
            return self.reject(AdmissionRejection::AccountNotFound).await;
        };

        if record.closed {
            info!(identity = %identity.id, "login refused: account suspended");
            return self.reject(AdmissionRejection::AccountSuspended).await;
        }

        if record.platform != self.platform {
            info!(identity = %identity.id, "login refused: platform mismatch");
            return self.reject(AdmissionRejection::PlatformRestricted).await;
        }

        if record.paid || !record.trial_expired(self.clock.utc()) {
            Ok(AdmissionDecision::Application)
        } else {
            Ok(AdmissionDecision::Billing)
        }
    }

    /// Compensating sign-out: runs to completion before the rejection is
    /// visible to the caller.
    async fn reject(&self, rejection: AdmissionRejection) -> Result<AdmissionDecision, Error> {
        self.gateway.sign_out().await;
        Ok(AdmissionDecision::Rejected(rejection))
    }
}
