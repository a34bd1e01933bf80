//! Shared application state handed to HTTP handlers.

use std::sync::Arc;

use mockable::Clock;
use url::Url;

use crate::domain::ports::{AccountStore, IdentityProvider};
use crate::domain::{AdmissionPolicy, CredentialGateway, Platform};

/// Handler-facing bundle of the domain services and their dependencies.
///
/// Construction wires the gateway and the admission policy over the same
/// provider handle so a policy-forced sign-out invalidates exactly the
/// session the login created.
pub struct AppState {
    /// Credential gateway shared by signup/login/logout handlers.
    pub gateway: Arc<CredentialGateway>,
    /// Admission policy consulted by the login handler.
    pub policy: Arc<AdmissionPolicy>,
    /// Raw provider handle for verification-email resends.
    pub provider: Arc<dyn IdentityProvider>,
    /// Account store for signup writes and token refreshes.
    pub store: Arc<dyn AccountStore>,
    /// Injected clock so trial arithmetic is testable.
    pub clock: Arc<dyn Clock>,
    /// Client surface this deployment serves; stamped onto new records.
    pub platform: Platform,
    /// Public base URL used to build verification links.
    pub public_url: Url,
}

impl AppState {
    /// Wire the domain services for the given serving surface.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn AccountStore>,
        platform: Platform,
        clock: Arc<dyn Clock>,
        public_url: Url,
    ) -> Self {
        let gateway = Arc::new(CredentialGateway::new(provider.clone()));
        let policy = Arc::new(AdmissionPolicy::new(
            gateway.clone(),
            store.clone(),
            platform,
            clock.clone(),
        ));
        Self {
            gateway,
            policy,
            provider,
            store,
            clock,
            platform,
            public_url,
        }
    }
}
