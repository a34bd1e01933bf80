//! Domain types, services, and ports.
//!
//! Purpose: hold the credential gateway, the session admission policy, and
//! the strongly typed entities they share, free of HTTP and transport
//! concerns. Inbound adapters map these types onto the wire; outbound
//! adapters implement the ports.

pub mod account;
pub mod admission;
pub mod auth;
pub mod classify;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod ports;

pub use self::account::{AccountRecord, Platform, TRIAL_DAYS, VERIFICATION_TOKEN_DAYS};
pub use self::admission::{AdmissionDecision, AdmissionPolicy, AdmissionRejection};
pub use self::auth::{CredentialValidationError, Credentials};
pub use self::classify::{OperationKind, ProviderErrorCode, UNKNOWN_ERROR_MESSAGE, classify};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::gateway::CredentialGateway;
pub use self::identity::{DisplayName, Identity, IdentityId, IdentityValidationError};

/// Convenient API result alias.
pub type ApiResult<T> = Result<T, Error>;
