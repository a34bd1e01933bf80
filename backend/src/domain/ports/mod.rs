//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account_store;
mod identity_provider;

pub use account_store::{AccountStore, AccountStoreError, FixtureAccountStore};
#[cfg(test)]
pub use account_store::MockAccountStore;
pub use identity_provider::{
    AuthStateEvent, FixtureIdentityProvider, IdentityProvider, IdentityProviderError,
    VerificationLinkConfig,
};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub(crate) use identity_provider::watch_auth_stream;
